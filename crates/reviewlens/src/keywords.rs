//! Per-bank keyword extraction with TF-IDF.
//!
//! The vectorizer follows the conventions of the common Python text tooling
//! so rankings line up with notebooks built on it: lower-cased input, tokens
//! of two or more word characters, English stop words removed before
//! building unigrams and bigrams, a frequency-capped vocabulary, smooth idf
//! and L2-normalized rows.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::config::KeywordsConfig;
use crate::record::Review;

const TOKEN_PATTERN: &str = r"\b\w\w+\b";

static TOKEN_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"));

const ENGLISH_STOP_WORDS: &[&str] = &[
  "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
  "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "amoungst",
  "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere",
  "are", "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
  "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
  "beyond", "bill", "both", "bottom", "but", "by", "call", "can", "cannot", "cant", "co", "con",
  "could", "couldnt", "cry", "de", "describe", "detail", "do", "done", "down", "due", "during",
  "each", "eg", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even",
  "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen", "fifty",
  "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four",
  "from", "front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have", "he",
  "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him",
  "himself", "his", "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed",
  "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least",
  "less", "ltd", "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more",
  "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely",
  "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor",
  "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
  "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
  "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed", "seeming",
  "seems", "serious", "several", "she", "should", "show", "side", "since", "sincere", "six",
  "sixty", "so", "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere",
  "still", "such", "system", "take", "ten", "than", "that", "the", "their", "them", "themselves",
  "then", "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon",
  "these", "they", "thick", "thin", "third", "this", "those", "though", "three", "through",
  "throughout", "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve",
  "twenty", "two", "un", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well",
  "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
  "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
  "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet",
  "you", "your", "yours", "yourself", "yourselves",
];

/// How the reported keywords of a group are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordOrder {
  /// First `top_n` feature names in alphabetical order
  Alphabetical,
  /// Highest mean TF-IDF weight first, ties alphabetical
  Weight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankKeywords {
  pub bank: String,
  pub keywords: Vec<String>,
}

pub fn is_stop_word(token: &str) -> bool {
  ENGLISH_STOP_WORDS.contains(&token)
}

/// Unigrams then bigrams of one document, stop words already removed
pub fn analyze(text: &str) -> Vec<String> {
  let lowered = text.to_lowercase();
  let tokens: Vec<&str> = TOKEN_REGEX
    .find_iter(&lowered)
    .map(|m| m.as_str())
    .filter(|token| !is_stop_word(token))
    .collect();

  let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
  terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
  terms
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
  max_features: usize,
}

/// Result of fitting a corpus: sorted feature names, their idf, and one
/// sparse normalized row per document
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
  pub features: Vec<String>,
  pub idf: Vec<f64>,
  pub rows: Vec<Vec<(usize, f64)>>,
}

impl TfidfVectorizer {
  pub fn new(max_features: usize) -> Self {
    Self { max_features }
  }

  pub fn fit_transform(&self, documents: &[&str]) -> TfidfMatrix {
    let analyzed: Vec<Vec<String>> = documents.iter().map(|doc| analyze(doc)).collect();

    let mut term_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for terms in &analyzed {
      let mut seen: Vec<&str> = Vec::new();
      for term in terms {
        *term_frequency.entry(term.as_str()).or_insert(0) += 1;
        if !seen.contains(&term.as_str()) {
          seen.push(term.as_str());
        }
      }
      for term in seen {
        *document_frequency.entry(term).or_insert(0) += 1;
      }
    }

    // BTreeMap iteration is alphabetical and the sort is stable, so equal
    // frequencies stay alphabetical.
    let mut ranked: Vec<(&str, usize)> = term_frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let mut features: Vec<String> =
      ranked.into_iter().take(self.max_features).map(|(term, _)| term.to_string()).collect();
    features.sort();

    let n_documents = documents.len() as f64;
    let idf: Vec<f64> = features
      .iter()
      .map(|term| {
        let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
        ((1.0 + n_documents) / (1.0 + df)).ln() + 1.0
      })
      .collect();

    let index: HashMap<&str, usize> =
      features.iter().enumerate().map(|(i, term)| (term.as_str(), i)).collect();
    let rows = analyzed.iter().map(|terms| weigh_row(terms, &index, &idf)).collect();

    TfidfMatrix { features, idf, rows }
  }
}

fn weigh_row(terms: &[String], index: &HashMap<&str, usize>, idf: &[f64]) -> Vec<(usize, f64)> {
  let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
  for term in terms {
    if let Some(&column) = index.get(term.as_str()) {
      *counts.entry(column).or_insert(0) += 1;
    }
  }

  let mut row: Vec<(usize, f64)> =
    counts.into_iter().map(|(column, count)| (column, count as f64 * idf[column])).collect();
  let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
  if norm > 0.0 {
    for (_, weight) in row.iter_mut() {
      *weight /= norm;
    }
  }
  row
}

impl TfidfMatrix {
  /// Mean weight of each feature over all documents
  pub fn mean_weights(&self) -> Vec<f64> {
    let mut sums = vec![0.0; self.features.len()];
    for row in &self.rows {
      for &(column, weight) in row {
        sums[column] += weight;
      }
    }
    let n = self.rows.len().max(1) as f64;
    sums.into_iter().map(|sum| sum / n).collect()
  }

  pub fn top_terms(&self, top_n: usize, order: KeywordOrder) -> Vec<String> {
    match order {
      KeywordOrder::Alphabetical => self.features.iter().take(top_n).cloned().collect(),
      KeywordOrder::Weight => {
        let weights = self.mean_weights();
        let mut columns: Vec<usize> = (0..self.features.len()).collect();
        columns.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        columns.into_iter().take(top_n).map(|c| self.features[c].clone()).collect()
      }
    }
  }
}

/// Keywords for every bank, banks in order of first appearance
pub fn extract_keywords(reviews: &[Review], config: &KeywordsConfig) -> Vec<BankKeywords> {
  let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
  for review in reviews {
    match groups.iter_mut().find(|(bank, _)| *bank == review.bank) {
      Some((_, texts)) => texts.push(&review.review),
      None => groups.push((&review.bank, vec![&review.review])),
    }
  }

  let vectorizer = TfidfVectorizer::new(config.max_features);
  groups
    .into_iter()
    .map(|(bank, texts)| {
      let matrix = vectorizer.fit_transform(&texts);
      if matrix.features.is_empty() {
        bentley::warn(&format!("no keywords for {bank}: every review is stop words"));
      }
      BankKeywords { bank: bank.to_string(), keywords: matrix.top_terms(config.top_n, config.order) }
    })
    .collect()
}
