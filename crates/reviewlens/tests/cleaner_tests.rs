use reviewlens::cleaner::clean;
use reviewlens::language::{FixedDetector, WhatlangDetector};
use reviewlens::record::{from_reader, to_writer, RawReview, Review};
use tempfile::TempDir;

fn raw(app: &str, text: Option<&str>, rating: Option<u8>, date: Option<&str>) -> RawReview {
  RawReview {
    app: Some(app.to_string()),
    review_text: text.map(str::to_string),
    rating,
    review_date: date.map(str::to_string),
    source: Some("Google Play".to_string()),
  }
}

fn sample() -> Vec<RawReview> {
  vec![
    raw("CBE", Some("Sending money to family is fast and the app never crashes on me"), Some(5), Some("2024-06-01T08:00:00Z")),
    raw("CBE", Some("gr8 app!!!!!"), Some(5), Some("2024-06-01")),
    raw("BOA", Some("   "), Some(2), None),
    raw("BOA", None, Some(1), Some("2024-06-02")),
    raw("BOA", Some("The balance screen is confusing and support takes days to reply"), Some(2), Some("not a date")),
    raw("Dashen", Some("ok"), Some(4), None),
  ]
}

#[test]
fn test_clean_is_idempotent_through_csv() {
  let temp_dir = TempDir::new().unwrap();
  let path = temp_dir.path().join("cleaned.csv");
  let detector = FixedDetector::always("en");

  let first = clean(sample(), &detector, "en");
  reviewlens::record::write_records(&path, &first.reviews).unwrap();

  let reread: Vec<RawReview> = reviewlens::record::read_records(&path).unwrap();
  let second = clean(reread, &detector, "en");

  assert_eq!(second.reviews, first.reviews);
  assert_eq!(second.report.dropped(), 0);
  assert_eq!(second.report.unparsed_dates, 0);
}

#[test]
fn test_clean_with_real_detector_keeps_english() {
  let cleaned = clean(sample(), &WhatlangDetector, "en");

  let banks: Vec<&str> = cleaned.reviews.iter().map(|r| r.bank.as_str()).collect();
  assert_eq!(banks, vec!["CBE", "BOA"]);
  assert_eq!(cleaned.reviews[0].date.map(|d| d.to_string()).as_deref(), Some("2024-06-01"));
  assert_eq!(cleaned.reviews[1].date, None);
}

#[test]
fn test_non_english_review_dropped() {
  let rows = vec![
    raw("CBE", Some("ይህ መተግበሪያ በጣም ጥሩ ነው እና በየቀኑ እጠቀምበታለሁ"), Some(5), None),
    raw("CBE", Some("This application is really helpful for paying my bills on time"), Some(5), None),
  ];

  let cleaned = clean(rows, &WhatlangDetector, "en");

  assert_eq!(cleaned.reviews.len(), 1);
  assert_eq!(cleaned.report.wrong_language, 1);
}

#[test]
fn test_cleaned_file_round_trips_as_reviews() {
  let cleaned = clean(sample(), &FixedDetector::always("en"), "en");

  let mut buffer = Vec::new();
  to_writer(&mut buffer, &cleaned.reviews).unwrap();
  let reviews: Vec<Review> = from_reader(buffer.as_slice()).unwrap();

  assert_eq!(reviews, cleaned.reviews);
}
