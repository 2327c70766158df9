use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reviewlens::collector::GooglePlaySource;
use reviewlens::config::Config;
use reviewlens::keywords::KeywordOrder;
use reviewlens::language::WhatlangDetector;
use reviewlens::pipeline;
use reviewlens::sentiment::SentimentModel;

#[derive(Parser)]
#[command(name = "reviewlens")]
#[command(about = "reviewlens - banking app review analysis\nCollect, clean and classify Google Play reviews")]
#[command(version)]
struct Cli {
  /// Configuration file (defaults to reviewlens.json in the working directory)
  #[arg(long, global = true, env = "REVIEWLENS_CONFIG")]
  config: Option<PathBuf>,

  /// Show debug output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch reviews for every configured app
  Collect {
    /// Reviews to request per app
    #[arg(long)]
    count: Option<usize>,
    /// Raw review file to write
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Drop incomplete, non-English and gibberish reviews
  Clean {
    /// Raw review file to read
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Cleaned review file to write
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Tag cleaned reviews with sentiment and themes
  Classify {
    /// Cleaned review file to read
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Annotated review file to write
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also write per-bank keywords as JSON
    #[arg(long)]
    keywords: Option<PathBuf>,
  },
  /// Print per-bank TF-IDF keywords of a cleaned file
  Keywords {
    /// Cleaned review file to read
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Rank by mean TF-IDF weight instead of alphabetically
    #[arg(long)]
    by_weight: bool,
  },
  /// Run collect, clean and classify in order
  Run,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::init_tracing("reviewlens", cli.verbose);

  let mut config = Config::resolve(cli.config.as_deref()).context("failed to load configuration")?;

  match cli.command {
    Commands::Collect { count, output } => {
      if let Some(count) = count {
        config.collector.count = count;
      }
      let output = output.unwrap_or_else(|| config.paths.raw.clone());
      let source = GooglePlaySource::new(config.collector.base_url.clone())?;
      pipeline::run_collect(&config, &source, &output).await.context("collect failed")?;
    }
    Commands::Clean { input, output } => {
      let input = input.unwrap_or_else(|| config.paths.raw.clone());
      let output = output.unwrap_or_else(|| config.paths.cleaned.clone());
      pipeline::run_clean(&config, &WhatlangDetector, &input, &output)
        .with_context(|| format!("failed to clean {}", input.display()))?;
    }
    Commands::Classify { input, output, keywords } => {
      let input = input.unwrap_or_else(|| config.paths.cleaned.clone());
      let output = output.unwrap_or_else(|| config.paths.annotated.clone());
      let keywords = keywords.or_else(|| config.paths.keywords.clone());
      let mut model = load_model(&config).await?;
      pipeline::run_classify(&config, model.as_mut(), &input, &output, keywords.as_deref())
        .with_context(|| format!("failed to classify {}", input.display()))?;
    }
    Commands::Keywords { input, by_weight } => {
      let input = input.unwrap_or_else(|| config.paths.cleaned.clone());
      let order = by_weight.then_some(KeywordOrder::Weight);
      let keywords = pipeline::run_keywords(&config, &input, order)
        .with_context(|| format!("failed to read {}", input.display()))?;
      pipeline::print_keywords(&keywords);
    }
    Commands::Run => {
      let source = GooglePlaySource::new(config.collector.base_url.clone())?;
      let mut model = load_model(&config).await?;
      pipeline::run_all(&config, &source, &WhatlangDetector, model.as_mut()).await.context("pipeline failed")?;
    }
  }

  Ok(())
}

#[cfg(feature = "neural")]
async fn load_model(config: &Config) -> Result<Box<dyn SentimentModel>> {
  let model = reviewlens::sentiment::OnnxSentimentModel::load(&config.sentiment)
    .await
    .context("failed to load sentiment model")?;
  Ok(Box::new(model))
}

#[cfg(not(feature = "neural"))]
async fn load_model(_config: &Config) -> Result<Box<dyn SentimentModel>> {
  Err(reviewlens::PipelineError::model_load("reviewlens was built without the `neural` feature").into())
}
