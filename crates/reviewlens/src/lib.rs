//! reviewlens - app store review analysis
//!
//! Three batch stages joined by CSV files: collect Google Play reviews for a
//! set of banking apps, clean them down to readable English text, then tag
//! each review with a sentiment label and the themes it touches. Per-bank
//! TF-IDF keywords are reported alongside classification.

pub mod classifier;
pub mod cleaner;
pub mod collector;
pub mod config;
pub mod error;
pub mod gibberish;
pub mod keywords;
pub mod language;
pub mod pipeline;
pub mod record;
pub mod sentiment;
pub mod themes;

pub use error::{PipelineError, Result};
