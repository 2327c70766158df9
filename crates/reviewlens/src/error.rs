use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Review source rejected request for '{app_id}': HTTP {status}")]
  SourceRejected { app_id: String, status: u16 },

  #[error("Malformed review source response: {message}")]
  MalformedResponse { message: String },

  #[error("No reviews collected: every app failed ({failed})")]
  NothingCollected { failed: String },

  #[error("Failed to load sentiment model: {message}")]
  ModelLoad { message: String },

  #[error("Sentiment inference failed for batch starting at row {row}: {message}")]
  Inference { row: usize, message: String },

  #[error("Unknown sentiment label '{label}'")]
  UnknownLabel { label: String },

  #[error("Invalid configuration: {message}")]
  Config { message: String },
}

impl PipelineError {
  pub fn source_rejected(app_id: impl Into<String>, status: u16) -> Self {
    Self::SourceRejected { app_id: app_id.into(), status }
  }

  pub fn malformed_response(message: impl Into<String>) -> Self {
    Self::MalformedResponse { message: message.into() }
  }

  pub fn nothing_collected(failed: impl Into<String>) -> Self {
    Self::NothingCollected { failed: failed.into() }
  }

  pub fn model_load(message: impl Into<String>) -> Self {
    Self::ModelLoad { message: message.into() }
  }

  pub fn inference(row: usize, message: impl Into<String>) -> Self {
    Self::Inference { row, message: message.into() }
  }

  pub fn unknown_label(label: impl Into<String>) -> Self {
    Self::UnknownLabel { label: label.into() }
  }

  pub fn config(message: impl Into<String>) -> Self {
    Self::Config { message: message.into() }
  }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
