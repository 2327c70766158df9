//! Stage 2: turn collector output into a clean, English-only review set.
//!
//! Steps run in a fixed order:
//! 1. drop rows missing review text or rating
//! 2. normalize dates to `YYYY-MM-DD` (unparseable dates become empty, the row stays)
//! 3. drop rows whose text is blank
//! 4. keep only rows detected as the target language
//! 5. drop gibberish
//!
//! Running `clean` over its own output drops nothing further.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::gibberish::is_gibberish;
use crate::language::LanguageDetector;
use crate::record::{RawReview, Review};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Row accounting for one cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
  pub input: usize,
  pub missing_fields: usize,
  /// Kept rows whose non-empty date could not be parsed
  pub unparsed_dates: usize,
  pub blank_text: usize,
  pub wrong_language: usize,
  pub gibberish: usize,
  pub kept: usize,
}

impl CleanReport {
  pub fn dropped(&self) -> usize {
    self.missing_fields + self.blank_text + self.wrong_language + self.gibberish
  }
}

#[derive(Debug, Clone)]
pub struct Cleaned {
  pub reviews: Vec<Review>,
  pub report: CleanReport,
}

pub fn clean(raw: Vec<RawReview>, detector: &dyn LanguageDetector, target_language: &str) -> Cleaned {
  let mut report = CleanReport { input: raw.len(), ..CleanReport::default() };

  // Each row carries whether its date failed to parse, so only kept rows are counted
  let complete: Vec<(Review, bool)> = raw.into_iter().filter_map(into_review).collect();
  report.missing_fields = report.input - complete.len();

  let non_blank: Vec<(Review, bool)> = complete.into_iter().filter(|(r, _)| !r.review.trim().is_empty()).collect();
  report.blank_text = report.input - report.missing_fields - non_blank.len();

  let before_language = non_blank.len();
  let bar = bentley::progress(before_language, "language");
  let in_language: Vec<(Review, bool)> = non_blank
    .into_iter()
    .filter(|(review, _)| {
      bar.inc(1);
      let detected = detector.detect_or_unknown(&review.review);
      if detected != target_language {
        debug!(language = %detected, "dropping review outside target language");
        return false;
      }
      true
    })
    .collect();
  bar.finish_and_clear();
  report.wrong_language = before_language - in_language.len();

  let before_gibberish = in_language.len();
  let survivors: Vec<(Review, bool)> = in_language.into_iter().filter(|(r, _)| !is_gibberish(&r.review)).collect();
  report.gibberish = before_gibberish - survivors.len();
  report.kept = survivors.len();
  report.unparsed_dates = survivors.iter().filter(|(_, unparsed)| *unparsed).count();

  let reviews = survivors.into_iter().map(|(review, _)| review).collect();
  Cleaned { reviews, report }
}

/// Rename stage 1 fields to stage 2 and normalize the date. `None` when
/// text or rating is missing; the flag is set when a non-empty date could
/// not be parsed.
fn into_review(row: RawReview) -> Option<(Review, bool)> {
  let review = row.review_text?;
  let rating = row.rating?;

  let raw_date = row.review_date.as_deref().unwrap_or_default();
  let date = normalize_date(raw_date);
  let unparsed = date.is_none() && !raw_date.trim().is_empty();

  Some((
    Review {
      review,
      rating,
      date,
      bank: row.app.unwrap_or_default(),
      source: row.source.unwrap_or_default(),
    },
    unparsed,
  ))
}

/// Parse the date formats seen in review exports. Time-of-day and offsets
/// are discarded; the calendar date in the value's own offset is kept.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive());
  }

  for format in DATETIME_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
      return Some(dt.date());
    }
  }

  for format in DATE_FORMATS {
    if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
      return Some(date);
    }
  }

  DateTime::parse_from_rfc2822(raw).ok().map(|dt| dt.date_naive())
}
