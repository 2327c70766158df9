//! Rule-based theme tagging.
//!
//! A theme matches a review when any of its trigger phrases occurs as a
//! literal substring of the lower-cased review text. All matching themes are
//! reported, in table order.

use serde::{Deserialize, Serialize};

pub const NO_THEME: &str = "Other";
pub const THEME_SEPARATOR: &str = ", ";

const DEFAULT_RULES: &[(&str, &[&str])] = &[
  ("Account Access Issues", &["login", "sign in", "password", "authentication"]),
  ("Transaction Performance", &["slow", "transfer", "payment", "crash", "delay", "failed"]),
  ("User Interface & Experience", &["interface", "design", "easy", "navigation", "dark mode"]),
  ("Customer Support", &["support", "help", "customer", "response", "contact"]),
  ("Feature Requests", &["fingerprint", "notification", "biometric", "alert", "balance"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRule {
  pub name: String,
  pub triggers: Vec<String>,
}

impl ThemeRule {
  pub fn new(name: &str, triggers: &[&str]) -> Self {
    Self {
      name: name.to_string(),
      triggers: triggers.iter().map(|t| t.to_lowercase()).collect(),
    }
  }

  /// `text_lower` must already be lower-cased
  fn matches(&self, text_lower: &str) -> bool {
    self.triggers.iter().any(|trigger| text_lower.contains(trigger.as_str()))
  }
}

/// Ordered theme table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRules {
  rules: Vec<ThemeRule>,
}

impl Default for ThemeRules {
  fn default() -> Self {
    Self {
      rules: DEFAULT_RULES.iter().map(|(name, triggers)| ThemeRule::new(name, triggers)).collect(),
    }
  }
}

impl ThemeRules {
  /// Build a table from configured rules. Triggers are lower-cased so that
  /// matching stays case-insensitive whatever the config file says.
  pub fn new(rules: Vec<ThemeRule>) -> Self {
    let rules = rules
      .into_iter()
      .map(|rule| ThemeRule {
        name: rule.name,
        triggers: rule.triggers.into_iter().map(|t| t.to_lowercase()).collect(),
      })
      .collect();
    Self { rules }
  }

  /// Configured rules, or the built-in table when none are configured
  pub fn from_config(rules: &[ThemeRule]) -> Self {
    if rules.is_empty() {
      Self::default()
    } else {
      Self::new(rules.to_vec())
    }
  }

  pub fn rules(&self) -> &[ThemeRule] {
    &self.rules
  }

  /// Names of every matching theme, in table order
  pub fn matching(&self, text: &str) -> Vec<&str> {
    let text_lower = text.to_lowercase();
    self
      .rules
      .iter()
      .filter(|rule| rule.matches(&text_lower))
      .map(|rule| rule.name.as_str())
      .collect()
  }

  /// Comma-joined matching themes, or `Other` when nothing matches
  pub fn assign(&self, text: &str) -> String {
    let matches = self.matching(text);
    if matches.is_empty() {
      NO_THEME.to_string()
    } else {
      matches.join(THEME_SEPARATOR)
    }
  }
}
