//! Binary sentiment classification of review text.

use crate::error::{PipelineError, Result};
use crate::record::SentimentLabel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentPrediction {
  pub label: SentimentLabel,
  /// Probability of `label`, in [0, 1]
  pub score: f64,
}

pub trait SentimentModel {
  /// One prediction per text, in input order
  fn classify(&mut self, texts: &[String]) -> Result<Vec<SentimentPrediction>>;
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
  match text.char_indices().nth(max_chars) {
    Some((byte_index, _)) => &text[..byte_index],
    None => text,
  }
}

pub fn round3(value: f64) -> f64 {
  (value * 1000.0).round() / 1000.0
}

const NEGATIVE_CUES: &[&str] = &["bad", "slow", "fail", "crash", "worst", "terrible", "not"];

/// Keyword-driven stand-in for the neural model
#[derive(Debug, Default)]
pub struct MockSentimentModel {
  pub fail_on_texts: Vec<String>,
  /// Every text handed to `classify`, in call order
  pub received: Vec<String>,
}

impl MockSentimentModel {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SentimentModel for MockSentimentModel {
  fn classify(&mut self, texts: &[String]) -> Result<Vec<SentimentPrediction>> {
    for text in texts {
      if self.fail_on_texts.contains(text) {
        return Err(PipelineError::inference(0, format!("mock failure for text: {text}")));
      }
    }
    self.received.extend(texts.iter().cloned());

    Ok(
      texts
        .iter()
        .map(|text| {
          let lower = text.to_lowercase();
          let label = if NEGATIVE_CUES.iter().any(|cue| lower.contains(cue)) {
            SentimentLabel::Negative
          } else {
            SentimentLabel::Positive
          };
          let score = 0.5 + (text.chars().count() % 50) as f64 / 100.0 + 0.000_42;
          SentimentPrediction { label, score }
        })
        .collect(),
    )
  }
}

#[cfg(feature = "neural")]
pub use onnx::OnnxSentimentModel;

#[cfg(feature = "neural")]
mod onnx {
  use hf_hub::api::tokio::{Api, ApiRepo};
  use ndarray::{Array2, ShapeError};
  use ort::session::{builder::GraphOptimizationLevel, Session};
  use ort::value::Tensor;
  use serde::Deserialize;
  use std::collections::BTreeMap;
  use std::path::PathBuf;
  use tokenizers::{Tokenizer, TruncationParams};

  use super::{SentimentModel, SentimentPrediction};
  use crate::config::SentimentConfig;
  use crate::error::{PipelineError, Result};
  use crate::record::SentimentLabel;

  /// Token limit of the model's position embeddings
  const MAX_TOKENS: usize = 512;

  #[derive(Debug, Deserialize)]
  struct ModelConfig {
    id2label: BTreeMap<String, String>,
  }

  pub struct OnnxSentimentModel {
    session: Session,
    tokenizer: Tokenizer,
    labels: Vec<SentimentLabel>,
  }

  impl OnnxSentimentModel {
    /// Download (or reuse the cached copy of) the model and load it
    pub async fn load(config: &SentimentConfig) -> Result<Self> {
      let api = Api::new().map_err(|e| PipelineError::model_load(format!("hub client: {e}")))?;
      let repo = api.model(config.model_repo.clone());

      bentley::info(&format!("Fetching sentiment model {}", config.model_repo));
      let tokenizer_path = fetch_file(&repo, &config.tokenizer_file).await?;
      let config_path = fetch_file(&repo, &config.config_file).await?;
      let model_path = fetch_file(&repo, &config.model_file).await?;

      let mut tokenizer =
        Tokenizer::from_file(&tokenizer_path).map_err(|e| PipelineError::model_load(format!("tokenizer: {e}")))?;
      tokenizer
        .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..TruncationParams::default() }))
        .map_err(|e| PipelineError::model_load(format!("tokenizer truncation: {e}")))?;

      let model_config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
      let labels = labels_by_index(&model_config.id2label)?;

      let session = Session::builder()
        .map_err(session_failure)?
        .with_optimization_level(GraphOptimizationLevel::Level1)
        .map_err(session_failure)?
        .commit_from_file(&model_path)
        .map_err(session_failure)?;

      bentley::success("Sentiment model loaded");
      Ok(Self { session, tokenizer, labels })
    }

    fn run_batch(&mut self, texts: &[String]) -> Result<Vec<SentimentPrediction>> {
      let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
      let encodings = self.tokenizer.encode_batch(text_refs, true).map_err(|e| failure(format!("tokenize: {e}")))?;
      let (ids, mask) = batch_tokens(&encodings).map_err(failure)?;
      let batch = ids.nrows();

      let ids = Tensor::from_array(ids).map_err(failure)?;
      let mask = Tensor::from_array(mask).map_err(failure)?;

      let outputs = self
        .session
        .run(ort::inputs!["input_ids" => ids, "attention_mask" => mask])
        .map_err(failure)?;
      let logits = outputs.get("logits").ok_or_else(|| failure("model has no logits output"))?;
      let (shape, data) = logits.try_extract_tensor::<f32>().map_err(failure)?;

      let classes = shape.get(1).copied().unwrap_or(0) as usize;
      if classes == 0 || data.len() != batch * classes {
        return Err(failure(format!("unexpected logits shape {:?}", shape.iter().collect::<Vec<_>>())));
      }

      data
        .chunks(classes)
        .map(|row| {
          let probabilities = softmax(row);
          let (best, score) = argmax(&probabilities);
          let label = self.labels.get(best).copied().ok_or_else(|| failure(format!("no label for class {best}")))?;
          Ok(SentimentPrediction { label, score: f64::from(score) })
        })
        .collect()
    }
  }

  impl SentimentModel for OnnxSentimentModel {
    fn classify(&mut self, texts: &[String]) -> Result<Vec<SentimentPrediction>> {
      if texts.is_empty() {
        return Ok(Vec::new());
      }
      self.run_batch(texts)
    }
  }

  async fn fetch_file(repo: &ApiRepo, name: &str) -> Result<PathBuf> {
    repo.get(name).await.map_err(|e| PipelineError::model_load(format!("{name}: {e}")))
  }

  fn session_failure(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::model_load(format!("onnx session: {e}"))
  }

  fn failure(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::inference(0, e.to_string())
  }

  fn labels_by_index(id2label: &BTreeMap<String, String>) -> Result<Vec<SentimentLabel>> {
    let mut indexed: Vec<(usize, SentimentLabel)> = Vec::new();
    for (id, label) in id2label {
      let index: usize = id.parse().map_err(|_| PipelineError::model_load(format!("bad label id '{id}'")))?;
      indexed.push((index, SentimentLabel::from_model_label(label)?));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
  }

  /// Right-pad every encoding to the longest in the batch
  fn batch_tokens(encodings: &[tokenizers::Encoding]) -> std::result::Result<(Array2<i64>, Array2<i64>), ShapeError> {
    let batch = encodings.len();
    let length = encodings.iter().map(|e| e.len()).max().unwrap_or(0);

    let mut ids = Vec::with_capacity(batch * length);
    let mut mask = Vec::with_capacity(batch * length);
    for encoding in encodings {
      let encoding_ids = encoding.get_ids();
      let encoding_mask = encoding.get_attention_mask();
      for i in 0..length {
        ids.push(encoding_ids.get(i).map_or(0, |&id| i64::from(id)));
        mask.push(encoding_mask.get(i).map_or(0, |&m| i64::from(m)));
      }
    }

    Ok((Array2::from_shape_vec((batch, length), ids)?, Array2::from_shape_vec((batch, length), mask)?))
  }

  fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
  }

  fn argmax(values: &[f32]) -> (usize, f32) {
    values
      .iter()
      .copied()
      .enumerate()
      .fold((0, f32::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
  }

}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_counts_characters_not_bytes() {
    let text = "ጥሩ".repeat(300);
    let truncated = truncate_chars(&text, 512);
    assert_eq!(truncated.chars().count(), 512);
    assert_eq!(truncate_chars("short", 512), "short");
  }

  #[test]
  fn test_round3() {
    assert_eq!(round3(0.98765), 0.988);
    assert_eq!(round3(1.0), 1.0);
    assert_eq!(round3(0.0004), 0.0);
  }

  #[test]
  fn test_mock_model_labels_and_records_input() {
    let mut model = MockSentimentModel::new();
    let texts = vec!["Great app".to_string(), "Very slow transfers".to_string()];

    let predictions = model.classify(&texts).unwrap();

    assert_eq!(predictions[0].label, SentimentLabel::Positive);
    assert_eq!(predictions[1].label, SentimentLabel::Negative);
    assert_eq!(model.received, texts);
  }

  #[test]
  fn test_mock_model_failure() {
    let mut model = MockSentimentModel { fail_on_texts: vec!["boom".to_string()], ..MockSentimentModel::default() };
    assert!(model.classify(&["boom".to_string()]).is_err());
  }
}
