//! Review records as they move between stages, and the CSV files that carry
//! them from one stage to the next.
//!
//! Files are UTF-8 with a leading BOM, comma-delimited, with a header row.
//! Readers accept files with or without the BOM.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};

pub const SOURCE_GOOGLE_PLAY: &str = "Google Play";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column layout of a record file, written even when there are no rows
pub trait Columns {
  const HEADERS: &'static [&'static str];
}

/// Stage 1 row. Every field may be missing; the cleaner decides what survives.
///
/// The aliases let the cleaner read its own output (stage 2 headers) as well
/// as collector output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
  #[serde(rename = "App", alias = "bank", default)]
  pub app: Option<String>,
  #[serde(rename = "ReviewText", alias = "review", default)]
  pub review_text: Option<String>,
  #[serde(rename = "Rating", alias = "rating", default, deserialize_with = "lenient_rating")]
  pub rating: Option<u8>,
  #[serde(rename = "ReviewDate", alias = "date", default)]
  pub review_date: Option<String>,
  #[serde(rename = "Source", alias = "source", default)]
  pub source: Option<String>,
}

impl Columns for RawReview {
  const HEADERS: &'static [&'static str] = &["App", "ReviewText", "Rating", "ReviewDate", "Source"];
}

/// Stage 2 row: text and rating are guaranteed present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub review: String,
  #[serde(deserialize_with = "strict_rating")]
  pub rating: u8,
  pub date: Option<NaiveDate>,
  pub bank: String,
  pub source: String,
}

impl Columns for Review {
  const HEADERS: &'static [&'static str] = &["review", "rating", "date", "bank", "source"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
  Positive,
  Negative,
}

impl SentimentLabel {
  /// Map a model label onto the stored enum. Matching ignores case, so
  /// `POSITIVE`, `positive` and `Positive` are all accepted.
  pub fn from_model_label(label: &str) -> Result<Self> {
    match label.trim().to_lowercase().as_str() {
      "positive" => Ok(Self::Positive),
      "negative" => Ok(Self::Negative),
      _ => Err(PipelineError::unknown_label(label)),
    }
  }
}

impl fmt::Display for SentimentLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SentimentLabel::Positive => write!(f, "Positive"),
      SentimentLabel::Negative => write!(f, "Negative"),
    }
  }
}

/// Stage 3 row, the pipeline's terminal output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedReview {
  pub review: String,
  #[serde(deserialize_with = "strict_rating")]
  pub rating: u8,
  pub date: Option<NaiveDate>,
  pub bank: String,
  pub source: String,
  pub sentiment_label: SentimentLabel,
  pub sentiment_score: f64,
  pub themes: String,
}

impl AnnotatedReview {
  pub fn new(review: Review, sentiment_label: SentimentLabel, sentiment_score: f64, themes: String) -> Self {
    Self {
      review: review.review,
      rating: review.rating,
      date: review.date,
      bank: review.bank,
      source: review.source,
      sentiment_label,
      sentiment_score,
      themes,
    }
  }
}

impl Columns for AnnotatedReview {
  const HEADERS: &'static [&'static str] = &[
    "review",
    "rating",
    "date",
    "bank",
    "source",
    "sentiment_label",
    "sentiment_score",
    "themes",
  ];
}

/// Ratings arrive as `5`, `5.0` or empty. Anything outside 1..=5 or not a
/// number counts as missing.
fn lenient_rating<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  Ok(raw.as_deref().and_then(parse_rating))
}

/// Same forms as `lenient_rating`, but a row past the cleaner must carry one
fn strict_rating<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  parse_rating(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid rating '{raw}'")))
}

pub fn parse_rating(raw: &str) -> Option<u8> {
  let value: f64 = raw.trim().parse().ok()?;
  if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
    return None;
  }
  Some(value as u8)
}

pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let file = fs::File::open(path)?;
  from_reader(file)
}

pub fn from_reader<T: DeserializeOwned, R: Read>(mut reader: R) -> Result<Vec<T>> {
  let mut bytes = Vec::new();
  reader.read_to_end(&mut bytes)?;
  let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

  let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);
  let mut records = Vec::new();
  for row in csv_reader.deserialize() {
    records.push(row?);
  }
  Ok(records)
}

pub fn write_records<T: Serialize + Columns>(path: &Path, records: &[T]) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }
  let file = fs::File::create(path)?;
  to_writer(file, records)
}

pub fn to_writer<T: Serialize + Columns, W: Write>(mut writer: W, records: &[T]) -> Result<()> {
  writer.write_all(UTF8_BOM)?;

  let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
  csv_writer.write_record(T::HEADERS)?;
  for record in records {
    csv_writer.serialize(record)?;
  }
  csv_writer.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn review(text: &str) -> Review {
    Review {
      review: text.to_string(),
      rating: 4,
      date: NaiveDate::from_ymd_opt(2024, 3, 9),
      bank: "CBE".to_string(),
      source: SOURCE_GOOGLE_PLAY.to_string(),
    }
  }

  #[test]
  fn test_parse_rating_variants() {
    assert_eq!(parse_rating("5"), Some(5));
    assert_eq!(parse_rating("3.0"), Some(3));
    assert_eq!(parse_rating(" 1 "), Some(1));
    assert_eq!(parse_rating("0"), None);
    assert_eq!(parse_rating("6"), None);
    assert_eq!(parse_rating("4.5"), None);
    assert_eq!(parse_rating("great"), None);
  }

  #[test]
  fn test_sentiment_label_capitalizes_model_output() {
    assert_eq!(SentimentLabel::from_model_label("POSITIVE").unwrap(), SentimentLabel::Positive);
    assert_eq!(SentimentLabel::from_model_label("negative").unwrap(), SentimentLabel::Negative);
    assert_eq!(SentimentLabel::Positive.to_string(), "Positive");
    assert!(SentimentLabel::from_model_label("LABEL_1").is_err());
  }

  #[test]
  fn test_written_file_starts_with_bom_and_header() {
    let mut buffer = Vec::new();
    to_writer(&mut buffer, &[review("Works well")]).unwrap();

    assert!(buffer.starts_with(UTF8_BOM));
    let text = String::from_utf8(buffer[UTF8_BOM.len()..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("review,rating,date,bank,source"));
    assert_eq!(lines.next(), Some("Works well,4,2024-03-09,CBE,Google Play"));
  }

  #[test]
  fn test_empty_record_set_still_writes_header() {
    let mut buffer = Vec::new();
    to_writer::<AnnotatedReview, _>(&mut buffer, &[]).unwrap();

    let text = String::from_utf8(buffer[UTF8_BOM.len()..].to_vec()).unwrap();
    assert_eq!(
      text.trim_end(),
      "review,rating,date,bank,source,sentiment_label,sentiment_score,themes"
    );
  }

  #[test]
  fn test_raw_reader_accepts_missing_fields_and_float_ratings() {
    let csv = "App,ReviewText,Rating,ReviewDate,Source\n\
               CBE,Great app,5.0,2024-01-02,Google Play\n\
               BOA,,3,,Google Play\n\
               Dashen,No rating,,2024-01-03,Google Play\n";

    let rows: Vec<RawReview> = from_reader(csv.as_bytes()).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].rating, Some(5));
    assert_eq!(rows[1].review_text, None);
    assert_eq!(rows[1].review_date, None);
    assert_eq!(rows[2].rating, None);
  }

  #[test]
  fn test_cleaned_reader_accepts_float_rating() {
    let csv = "review,rating,date,bank,source\nSlow transfer,5.0,2024-01-02,CBE,Google Play\n";

    let rows: Vec<Review> = from_reader(csv.as_bytes()).unwrap();

    assert_eq!(rows[0].rating, 5);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 2));
  }

  #[test]
  fn test_cleaned_reader_rejects_out_of_range_rating() {
    for rating in ["4.5", "7", ""] {
      let csv = format!("review,rating,date,bank,source\nSlow transfer,{rating},,CBE,Google Play\n");
      let err = from_reader::<Review, _>(csv.as_bytes()).unwrap_err();
      assert!(err.to_string().contains("invalid rating"), "{rating}: {err}");
    }
  }

  #[test]
  fn test_raw_reader_accepts_cleaned_headers() {
    let mut buffer = Vec::new();
    to_writer(&mut buffer, &[review("Fast transfers")]).unwrap();

    let rows: Vec<RawReview> = from_reader(buffer.as_slice()).unwrap();

    assert_eq!(rows[0].app.as_deref(), Some("CBE"));
    assert_eq!(rows[0].review_text.as_deref(), Some("Fast transfers"));
    assert_eq!(rows[0].rating, Some(4));
    assert_eq!(rows[0].review_date.as_deref(), Some("2024-03-09"));
  }
}
