//! Stage 3: attach sentiment and themes to every cleaned review.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{AnnotatedReview, Review};
use crate::sentiment::{round3, truncate_chars, SentimentModel};
use crate::themes::ThemeRules;

/// Annotate reviews in input order. Any model failure aborts the whole
/// stage, naming the first row of the failing batch.
pub fn classify(
  reviews: Vec<Review>,
  model: &mut dyn SentimentModel,
  themes: &ThemeRules,
  max_chars: usize,
  batch_size: usize,
) -> Result<Vec<AnnotatedReview>> {
  let batch_size = batch_size.max(1);
  let bar = bentley::progress(reviews.len(), "sentiment");
  let mut annotated = Vec::with_capacity(reviews.len());
  let mut rows = reviews.into_iter().peekable();
  let mut start = 0;

  while rows.peek().is_some() {
    let batch: Vec<Review> = rows.by_ref().take(batch_size).collect();
    let texts: Vec<String> = batch.iter().map(|r| truncate_chars(&r.review, max_chars).to_string()).collect();

    let predictions = model.classify(&texts).map_err(|e| at_row(start, e))?;
    if predictions.len() != batch.len() {
      return Err(PipelineError::inference(
        start,
        format!("model returned {} predictions for {} texts", predictions.len(), batch.len()),
      ));
    }
    debug!(start, size = batch.len(), "classified batch");

    for (review, prediction) in batch.into_iter().zip(predictions) {
      let theme = themes.assign(&review.review);
      let score = round3(prediction.score.clamp(0.0, 1.0));
      annotated.push(AnnotatedReview::new(review, prediction.label, score, theme));
    }

    start += texts.len();
    bar.set_position(start as u64);
  }

  bar.finish_and_clear();
  Ok(annotated)
}

fn at_row(row: usize, error: PipelineError) -> PipelineError {
  match error {
    PipelineError::Inference { message, .. } => PipelineError::inference(row, message),
    other => PipelineError::inference(row, other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::SentimentLabel;
  use crate::sentiment::MockSentimentModel;

  fn review(text: &str) -> Review {
    Review {
      review: text.to_string(),
      rating: 2,
      date: None,
      bank: "CBE".to_string(),
      source: "Google Play".to_string(),
    }
  }

  #[test]
  fn test_order_preserved_across_batches() {
    let reviews: Vec<Review> = (0..7).map(|i| review(&format!("review number {i}"))).collect();
    let mut model = MockSentimentModel::new();

    let annotated = classify(reviews, &mut model, &ThemeRules::default(), 512, 3).unwrap();

    let texts: Vec<&str> = annotated.iter().map(|a| a.review.as_str()).collect();
    let expected: Vec<String> = (0..7).map(|i| format!("review number {i}")).collect();
    assert_eq!(texts, expected);
  }

  #[test]
  fn test_scores_rounded_and_themes_assigned() {
    let mut model = MockSentimentModel::new();

    let annotated = classify(
      vec![review("Login keeps failing and the app crashes on transfer")],
      &mut model,
      &ThemeRules::default(),
      512,
      16,
    )
    .unwrap();

    let row = &annotated[0];
    assert_eq!(row.sentiment_label, SentimentLabel::Negative);
    assert_eq!(row.sentiment_score, round3(row.sentiment_score));
    assert!((0.0..=1.0).contains(&row.sentiment_score));
    assert_eq!(row.themes, "Account Access Issues, Transaction Performance");
  }

  #[test]
  fn test_failure_names_batch_start() {
    let reviews: Vec<Review> = ["a good one", "another good", "explode", "fine"].iter().map(|t| review(t)).collect();
    let mut model = MockSentimentModel { fail_on_texts: vec!["explode".to_string()], ..MockSentimentModel::default() };

    let err = classify(reviews, &mut model, &ThemeRules::default(), 512, 2).unwrap_err();

    match err {
      PipelineError::Inference { row, .. } => assert_eq!(row, 2),
      other => panic!("Expected Inference, got: {other:?}"),
    }
  }

  #[test]
  fn test_empty_input() {
    let mut model = MockSentimentModel::new();
    let annotated = classify(Vec::new(), &mut model, &ThemeRules::default(), 512, 16).unwrap();
    assert!(annotated.is_empty());
  }
}
