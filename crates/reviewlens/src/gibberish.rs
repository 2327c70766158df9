/// Consecutive repeats of one character that mark text as noise
pub const MAX_CHAR_RUN: usize = 5;

/// Fewer ASCII letters than this marks text as noise
pub const MIN_ALPHA_CHARS: usize = 3;

/// A review is gibberish when any character (line breaks aside) repeats
/// `MAX_CHAR_RUN` or more times in a row, or when it holds fewer than
/// `MIN_ALPHA_CHARS` ASCII letters.
pub fn is_gibberish(text: &str) -> bool {
  has_char_run(text, MAX_CHAR_RUN) || count_ascii_letters(text) < MIN_ALPHA_CHARS
}

pub fn has_char_run(text: &str, run: usize) -> bool {
  let mut previous: Option<char> = None;
  let mut length = 0;

  for c in text.chars() {
    if c == '\n' {
      previous = None;
      length = 0;
      continue;
    }

    if Some(c) == previous {
      length += 1;
    } else {
      previous = Some(c);
      length = 1;
    }

    if length >= run {
      return true;
    }
  }

  false
}

pub fn count_ascii_letters(text: &str) -> usize {
  text.chars().filter(|c| c.is_ascii_alphabetic()).count()
}
