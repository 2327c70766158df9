//! Stage 1: fetch reviews for each configured app and flatten them into raw
//! records.
//!
//! A failing app is reported and skipped. The stage only fails when no app
//! could be fetched at all.

pub mod google_play;

use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::config::CollectorConfig;
use crate::error::{PipelineError, Result};
use crate::record::{RawReview, SOURCE_GOOGLE_PLAY};

pub use google_play::GooglePlaySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
  MostRelevant,
  Newest,
  Rating,
}

impl SortOrder {
  /// Numeric code used on the wire
  pub fn code(self) -> u8 {
    match self {
      SortOrder::MostRelevant => 1,
      SortOrder::Newest => 2,
      SortOrder::Rating => 3,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
  pub app_id: String,
  pub lang: String,
  pub country: String,
  pub sort: SortOrder,
  pub count: usize,
}

/// One review as the store returns it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedReview {
  pub review_id: Option<String>,
  pub user_name: Option<String>,
  pub content: Option<String>,
  pub score: Option<u8>,
  /// Seconds since the Unix epoch
  pub timestamp: Option<i64>,
  pub thumbs_up: Option<u64>,
  pub app_version: Option<String>,
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
  async fn fetch_reviews(&self, request: &FetchRequest) -> Result<Vec<FetchedReview>>;
}

/// Fetch every configured app in order and return their reviews as one set
pub async fn collect(config: &CollectorConfig, source: &dyn ReviewSource) -> Result<Vec<RawReview>> {
  let mut records = Vec::new();
  let mut failures: Vec<String> = Vec::new();

  for app in &config.apps {
    bentley::info(&format!("Fetching reviews for {} ({})", app.name, app.package));
    let request = FetchRequest {
      app_id: app.package.clone(),
      lang: config.lang.clone(),
      country: config.country.clone(),
      sort: config.sort,
      count: config.count,
    };

    match source.fetch_reviews(&request).await {
      Ok(reviews) => {
        bentley::verbose(&format!("{}: {} reviews", app.name, reviews.len()));
        records.extend(reviews.into_iter().map(|review| to_raw(&app.name, review)));
      }
      Err(e) => {
        bentley::warn(&format!("Skipping {}: {e}", app.name));
        failures.push(format!("{}: {e}", app.name));
      }
    }
  }

  if !config.apps.is_empty() && failures.len() == config.apps.len() {
    return Err(PipelineError::nothing_collected(failures.join("; ")));
  }

  Ok(records)
}

fn to_raw(app_name: &str, review: FetchedReview) -> RawReview {
  let review_date = review
    .timestamp
    .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
    .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string());

  RawReview {
    app: Some(app_name.to_string()),
    review_text: Some(review.content.unwrap_or_default()),
    rating: review.score,
    review_date,
    source: Some(SOURCE_GOOGLE_PLAY.to_string()),
  }
}
