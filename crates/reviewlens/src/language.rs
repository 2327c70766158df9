//! Language identification for review text.
//!
//! The production detector wraps `whatlang`, which is a pure function of its
//! input, so repeated runs over the same file keep the same rows.

use whatlang::Lang;

/// Recorded when a detector cannot make a call. Never equal to a target
/// language, so such rows are filtered out.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

pub trait LanguageDetector {
  /// ISO 639-1 code where one exists, `None` when detection fails
  fn detect(&self, text: &str) -> Option<String>;

  fn detect_or_unknown(&self, text: &str) -> String {
    self.detect(text).unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
  fn detect(&self, text: &str) -> Option<String> {
    whatlang::detect_lang(text).map(|lang| iso639_1(lang).to_string())
  }
}

/// Two-letter code for the languages likely to show up in app-store reviews;
/// anything else keeps whatlang's three-letter code.
fn iso639_1(lang: Lang) -> &'static str {
  match lang {
    Lang::Eng => "en",
    Lang::Amh => "am",
    Lang::Ara => "ar",
    Lang::Fra => "fr",
    Lang::Deu => "de",
    Lang::Spa => "es",
    Lang::Por => "pt",
    Lang::Ita => "it",
    Lang::Nld => "nl",
    Lang::Rus => "ru",
    Lang::Tur => "tr",
    Lang::Hin => "hi",
    Lang::Cmn => "zh",
    Lang::Jpn => "ja",
    Lang::Kor => "ko",
    Lang::Swe => "sv",
    Lang::Dan => "da",
    Lang::Pol => "pl",
    Lang::Ind => "id",
    Lang::Afr => "af",
    other => other.code(),
  }
}

/// Detector that answers from a fixed table, for tests
#[derive(Debug, Default, Clone)]
pub struct FixedDetector {
  pub answers: Vec<(String, Option<String>)>,
  pub fallback: Option<String>,
}

impl FixedDetector {
  /// Every text detects as `code`
  pub fn always(code: &str) -> Self {
    Self { answers: Vec::new(), fallback: Some(code.to_string()) }
  }

  pub fn with_answer(mut self, text: &str, code: Option<&str>) -> Self {
    self.answers.push((text.to_string(), code.map(str::to_string)));
    self
  }
}

impl LanguageDetector for FixedDetector {
  fn detect(&self, text: &str) -> Option<String> {
    self
      .answers
      .iter()
      .find(|(known, _)| known == text)
      .map(|(_, code)| code.clone())
      .unwrap_or_else(|| self.fallback.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_detects_english() {
    let detector = WhatlangDetector;
    let code = detector.detect("This banking application is very good and I use it every day to send money");
    assert_eq!(code.as_deref(), Some("en"));
  }

  #[test]
  fn test_detects_amharic_script() {
    let detector = WhatlangDetector;
    let code = detector.detect("ይህ መተግበሪያ በጣም ጥሩ ነው እና በየቀኑ እጠቀምበታለሁ");
    assert_eq!(code.as_deref(), Some("am"));
  }

  #[test]
  fn test_undetectable_text_is_unknown() {
    let detector = WhatlangDetector;
    assert_eq!(detector.detect_or_unknown("12345 !!!"), UNKNOWN_LANGUAGE);
  }

  #[test]
  fn test_detection_is_repeatable() {
    let detector = WhatlangDetector;
    let text = "Good app but slow";
    assert_eq!(detector.detect(text), detector.detect(text));
  }

  #[test]
  fn test_fixed_detector_answers() {
    let detector = FixedDetector::always("en").with_answer("bonjour", Some("fr")).with_answer("???", None);
    assert_eq!(detector.detect_or_unknown("hello"), "en");
    assert_eq!(detector.detect_or_unknown("bonjour"), "fr");
    assert_eq!(detector.detect_or_unknown("???"), UNKNOWN_LANGUAGE);
  }
}
