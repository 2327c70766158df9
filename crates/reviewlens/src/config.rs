//! Configuration management for reviewlens
//!
//! Loaded from `reviewlens.json` or `.reviewlens.json` in the working
//! directory, or from an explicit path. Every field has a default, so an
//! empty `{}` file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collector::SortOrder;
use crate::error::{PipelineError, Result};
use crate::keywords::KeywordOrder;
use crate::themes::ThemeRule;

pub const CONFIG_FILE_NAMES: &[&str] = &["reviewlens.json", ".reviewlens.json"];

/// One application to scrape: display name and store package identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTarget {
  pub name: String,
  pub package: String,
}

impl AppTarget {
  pub fn new(name: &str, package: &str) -> Self {
    Self { name: name.to_string(), package: package.to_string() }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub paths: PathsConfig,
  pub collector: CollectorConfig,
  pub cleaner: CleanerConfig,
  pub sentiment: SentimentConfig,
  pub keywords: KeywordsConfig,
  /// Theme table. Empty means the built-in table.
  pub themes: Vec<ThemeRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
  pub raw: PathBuf,
  pub cleaned: PathBuf,
  pub annotated: PathBuf,
  /// Where per-bank keywords are written as JSON, if anywhere
  pub keywords: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
  /// Apps in scrape order
  pub apps: Vec<AppTarget>,
  /// Reviews requested per app
  pub count: usize,
  pub lang: String,
  pub country: String,
  pub sort: SortOrder,
  pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
  /// ISO 639-1 code a review must be detected as to survive
  pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
  pub model_repo: String,
  /// Files fetched from `model_repo`, relative to the repo root
  pub tokenizer_file: String,
  pub config_file: String,
  pub model_file: String,
  /// Characters of review text passed to the model
  pub max_chars: usize,
  pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
  pub max_features: usize,
  pub top_n: usize,
  pub order: KeywordOrder,
}

impl Default for PathsConfig {
  fn default() -> Self {
    Self {
      raw: PathBuf::from("mobile_bank_reviews.csv"),
      cleaned: PathBuf::from("cleaned_reviews.csv"),
      annotated: PathBuf::from("task2_sentiment_themes.csv"),
      keywords: None,
    }
  }
}

impl Default for CollectorConfig {
  fn default() -> Self {
    Self {
      apps: vec![
        AppTarget::new("CBE", "com.combanketh.mobilebanking"),
        AppTarget::new("BOA", "com.boa.boaMobileBanking"),
        AppTarget::new("Dashen", "com.dashen.dashensuperapp"),
      ],
      count: 1000,
      lang: "en".to_string(),
      country: "et".to_string(),
      sort: SortOrder::Newest,
      base_url: crate::collector::google_play::DEFAULT_BASE_URL.to_string(),
    }
  }
}

impl Default for CleanerConfig {
  fn default() -> Self {
    Self { target_language: "en".to_string() }
  }
}

impl Default for SentimentConfig {
  fn default() -> Self {
    Self {
      model_repo: "distilbert/distilbert-base-uncased-finetuned-sst-2-english".to_string(),
      tokenizer_file: "tokenizer.json".to_string(),
      config_file: "config.json".to_string(),
      model_file: "onnx/model.onnx".to_string(),
      max_chars: 512,
      batch_size: 16,
    }
  }
}

impl Default for KeywordsConfig {
  fn default() -> Self {
    Self { max_features: 100, top_n: 15, order: KeywordOrder::Alphabetical }
  }
}

impl Config {
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load from the working directory, falling back to defaults
  pub fn load() -> Result<Self> {
    for path in CONFIG_FILE_NAMES {
      if Path::new(path).exists() {
        return Self::load_from_file(path);
      }
    }

    Ok(Config::default())
  }

  /// Explicit path when given, otherwise the working-directory lookup
  pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
    match explicit {
      Some(path) => Self::load_from_file(path),
      None => Self::load(),
    }
  }

  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn validate(&self) -> Result<()> {
    if self.sentiment.max_chars == 0 {
      return Err(PipelineError::config("sentiment.max_chars must be at least 1"));
    }
    let sentiment = &self.sentiment;
    for (field, value) in [
      ("tokenizer_file", &sentiment.tokenizer_file),
      ("config_file", &sentiment.config_file),
      ("model_file", &sentiment.model_file),
    ] {
      if value.trim().is_empty() {
        return Err(PipelineError::config(format!("sentiment.{field} must not be empty")));
      }
    }
    if self.sentiment.batch_size == 0 {
      return Err(PipelineError::config("sentiment.batch_size must be at least 1"));
    }
    if self.keywords.max_features == 0 {
      return Err(PipelineError::config("keywords.max_features must be at least 1"));
    }
    if let Some(app) = self.collector.apps.iter().find(|a| a.name.trim().is_empty()) {
      return Err(PipelineError::config(format!("app '{}' has an empty display name", app.package)));
    }
    if let Some(rule) = self.themes.iter().find(|r| r.triggers.is_empty()) {
      return Err(PipelineError::config(format!("theme '{}' has no triggers", rule.name)));
    }
    Ok(())
  }
}
