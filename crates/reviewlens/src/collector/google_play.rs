//! Google Play review source, speaking the store web client's batch RPC.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{FetchRequest, FetchedReview, ReviewSource, SortOrder};
use crate::error::{PipelineError, Result};

pub const DEFAULT_BASE_URL: &str = "https://play.google.com";

/// Largest page the store serves in one call
pub const MAX_PAGE_SIZE: usize = 200;

const RPC_ID: &str = "UsvDTd";
const RESPONSE_GUARD: &str = ")]}'";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GooglePlaySource {
  client: reqwest::Client,
  base_url: String,
}

impl GooglePlaySource {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("reviewlens/", env!("CARGO_PKG_VERSION")))
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn endpoint(&self) -> String {
    format!("{}/_/PlayStoreUi/data/batchexecute", self.base_url.trim_end_matches('/'))
  }

  async fn fetch_page(&self, request: &FetchRequest, page_size: usize, token: Option<&str>) -> Result<String> {
    let payload = build_payload(&request.app_id, request.sort, page_size, token);

    let response = self
      .client
      .post(self.endpoint())
      .query(&[("hl", request.lang.as_str()), ("gl", request.country.as_str())])
      .form(&[("f.req", payload)])
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(PipelineError::source_rejected(&request.app_id, response.status().as_u16()));
    }

    Ok(response.text().await?)
  }
}

#[async_trait]
impl ReviewSource for GooglePlaySource {
  async fn fetch_reviews(&self, request: &FetchRequest) -> Result<Vec<FetchedReview>> {
    let mut collected: Vec<FetchedReview> = Vec::new();
    let mut token: Option<String> = None;

    while collected.len() < request.count {
      let page_size = (request.count - collected.len()).min(MAX_PAGE_SIZE);
      let body = self.fetch_page(request, page_size, token.as_deref()).await?;
      let (reviews, next) = parse_page(&body)?;
      debug!(app = %request.app_id, page = reviews.len(), "fetched review page");

      if reviews.is_empty() {
        break;
      }
      collected.extend(reviews);

      match next {
        Some(next) => token = Some(next),
        None => break,
      }
    }

    collected.truncate(request.count);
    Ok(collected)
  }
}

/// `f.req` form value for one page
pub fn build_payload(app_id: &str, sort: SortOrder, page_size: usize, token: Option<&str>) -> String {
  let inner = json!([
    null,
    null,
    [2, sort.code(), [page_size, null, token], null, [null, null]],
    [app_id, 7]
  ]);
  json!([[[RPC_ID, inner.to_string(), null, "generic"]]]).to_string()
}

/// Reviews on one page and the continuation token, if there is a next page
pub fn parse_page(body: &str) -> Result<(Vec<FetchedReview>, Option<String>)> {
  let trimmed = body.trim_start();
  let json_text = trimmed.strip_prefix(RESPONSE_GUARD).unwrap_or(trimmed);

  let envelope: Value = serde_json::from_str(json_text)?;
  let inner_text = match envelope.get(0).and_then(|entry| entry.get(2)) {
    Some(Value::String(text)) => text,
    Some(Value::Null) => return Ok((Vec::new(), None)),
    _ => return Err(PipelineError::malformed_response("missing RPC payload at [0][2]")),
  };

  let inner: Value = serde_json::from_str(inner_text)?;
  let Some(parts) = inner.as_array() else {
    return Err(PipelineError::malformed_response("RPC payload is not an array"));
  };

  let reviews = parts
    .first()
    .and_then(Value::as_array)
    .map(|items| items.iter().map(parse_review).collect())
    .unwrap_or_default();

  let token = parts
    .len()
    .checked_sub(2)
    .and_then(|i| parts[i].as_array())
    .and_then(|tail| tail.last())
    .and_then(Value::as_str)
    .map(str::to_string);

  Ok((reviews, token))
}

fn parse_review(item: &Value) -> FetchedReview {
  let text = |index: usize| item.get(index).and_then(Value::as_str).map(str::to_string);

  FetchedReview {
    review_id: text(0),
    user_name: item.get(1).and_then(|user| user.get(0)).and_then(Value::as_str).map(str::to_string),
    content: text(4),
    score: item.get(2).and_then(Value::as_u64).and_then(|s| u8::try_from(s).ok()),
    timestamp: item.get(5).and_then(|ts| ts.get(0)).and_then(Value::as_i64),
    thumbs_up: item.get(6).and_then(Value::as_u64),
    app_version: text(10),
  }
}
