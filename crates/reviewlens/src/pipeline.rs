//! Stage drivers: read a stage's input file, run it, write its output file.

use std::path::Path;

use crate::classifier;
use crate::cleaner::{self, CleanReport};
use crate::collector::{self, ReviewSource};
use crate::config::Config;
use crate::error::Result;
use crate::keywords::{extract_keywords, BankKeywords, KeywordOrder};
use crate::language::LanguageDetector;
use crate::record::{read_records, write_records, AnnotatedReview, RawReview, Review};
use crate::sentiment::SentimentModel;
use crate::themes::ThemeRules;

pub async fn run_collect(config: &Config, source: &dyn ReviewSource, output: &Path) -> Result<Vec<RawReview>> {
  bentley::announce("Collecting reviews");
  let records = collector::collect(&config.collector, source).await?;
  write_records(output, &records)?;
  bentley::success(&format!("Saved {} reviews to {}", records.len(), output.display()));
  Ok(records)
}

pub fn run_clean(config: &Config, detector: &dyn LanguageDetector, input: &Path, output: &Path) -> Result<CleanReport> {
  bentley::announce("Cleaning reviews");
  let raw: Vec<RawReview> = read_records(input)?;
  let cleaned = cleaner::clean(raw, detector, &config.cleaner.target_language);

  let report = &cleaned.report;
  bentley::tally("missing text or rating", report.input, report.input - report.missing_fields);
  bentley::tally("blank text", report.input - report.missing_fields, report.input - report.missing_fields - report.blank_text);
  bentley::tally(
    "language",
    report.kept + report.gibberish + report.wrong_language,
    report.kept + report.gibberish,
  );
  bentley::tally("gibberish", report.kept + report.gibberish, report.kept);
  if report.unparsed_dates > 0 {
    bentley::warn(&format!("{} kept reviews had unparseable dates, left empty", report.unparsed_dates));
  }

  write_records(output, &cleaned.reviews)?;
  bentley::success(&format!("Saved {} cleaned reviews to {}", report.kept, output.display()));
  Ok(cleaned.report)
}

/// Annotate the cleaned file. Nothing is written if inference fails.
pub fn run_classify(
  config: &Config,
  model: &mut dyn SentimentModel,
  input: &Path,
  output: &Path,
  keywords_output: Option<&Path>,
) -> Result<Vec<AnnotatedReview>> {
  bentley::announce("Classifying reviews");
  let reviews: Vec<Review> = read_records(input)?;

  let keywords = extract_keywords(&reviews, &config.keywords);
  print_keywords(&keywords);

  let themes = ThemeRules::from_config(&config.themes);
  let annotated = classifier::classify(
    reviews,
    model,
    &themes,
    config.sentiment.max_chars,
    config.sentiment.batch_size,
  )?;

  write_records(output, &annotated)?;
  if let Some(path) = keywords_output {
    write_keywords(path, &keywords)?;
  }
  bentley::success(&format!("Saved {} annotated reviews to {}", annotated.len(), output.display()));
  Ok(annotated)
}

/// Per-bank keywords of a cleaned file, without running the model
pub fn run_keywords(config: &Config, input: &Path, order: Option<KeywordOrder>) -> Result<Vec<BankKeywords>> {
  let reviews: Vec<Review> = read_records(input)?;
  let mut settings = config.keywords.clone();
  if let Some(order) = order {
    settings.order = order;
  }
  Ok(extract_keywords(&reviews, &settings))
}

pub fn print_keywords(keywords: &[BankKeywords]) {
  for group in keywords {
    println!("{}: {}", group.bank, group.keywords.join(", "));
  }
}

pub fn write_keywords(path: &Path, keywords: &[BankKeywords]) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)?;
    }
  }
  std::fs::write(path, serde_json::to_string_pretty(keywords)?)?;
  Ok(())
}

/// Collect, clean and classify using the configured file locations
pub async fn run_all(
  config: &Config,
  source: &dyn ReviewSource,
  detector: &dyn LanguageDetector,
  model: &mut dyn SentimentModel,
) -> Result<Vec<AnnotatedReview>> {
  let paths = &config.paths;
  run_collect(config, source, &paths.raw).await?;
  run_clean(config, detector, &paths.raw, &paths.cleaned)?;
  run_classify(config, model, &paths.cleaned, &paths.annotated, paths.keywords.as_deref())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::language::FixedDetector;
  use crate::sentiment::MockSentimentModel;
  use tempfile::TempDir;

  #[test]
  fn test_clean_then_classify_files() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw.csv");
    let cleaned = temp_dir.path().join("cleaned.csv");
    let annotated = temp_dir.path().join("out/annotated.csv");
    let keywords = temp_dir.path().join("keywords.json");
    std::fs::write(
      &raw,
      "App,ReviewText,Rating,ReviewDate,Source\n\
       CBE,Transfer failed twice,1,2024-04-01 10:00:00,Google Play\n\
       CBE,gr8 app!!!!!,5,2024-04-01,Google Play\n\
       BOA,,4,2024-04-02,Google Play\n",
    )
    .unwrap();
    let config = Config::default();

    let report = run_clean(&config, &FixedDetector::always("en"), &raw, &cleaned).unwrap();
    assert_eq!(report.kept, 1);

    let mut model = MockSentimentModel::new();
    let rows = run_classify(&config, &mut model, &cleaned, &annotated, Some(&keywords)).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].themes, "Transaction Performance");
    assert!(annotated.exists());
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&keywords).unwrap()).unwrap();
    assert_eq!(written[0]["bank"], "CBE");
    assert!(written[0]["keywords"].as_array().unwrap().iter().any(|k| k == "transfer"));
  }

  #[test]
  fn test_failed_inference_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let cleaned = temp_dir.path().join("cleaned.csv");
    let annotated = temp_dir.path().join("annotated.csv");
    std::fs::write(&cleaned, "review,rating,date,bank,source\nboom,3,,CBE,Google Play\n").unwrap();

    let mut model = MockSentimentModel { fail_on_texts: vec!["boom".to_string()], ..MockSentimentModel::default() };
    let result = run_classify(&Config::default(), &mut model, &cleaned, &annotated, None);

    assert!(result.is_err());
    assert!(!annotated.exists());
  }

  #[test]
  fn test_keywords_order_override() {
    let temp_dir = TempDir::new().unwrap();
    let cleaned = temp_dir.path().join("cleaned.csv");
    std::fs::write(&cleaned, "review,rating,date,bank,source\nslow app,2,,CBE,Google Play\nslow,2,,CBE,Google Play\n").unwrap();

    let by_weight = run_keywords(&Config::default(), &cleaned, Some(KeywordOrder::Weight)).unwrap();

    assert_eq!(by_weight[0].keywords, vec!["slow", "app", "slow app"]);
  }
}
