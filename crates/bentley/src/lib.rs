//! Console reporting for the review pipeline.
//!
//! Everything written here goes to stderr so that stdout stays free for
//! results (keyword listings, file paths) that callers may want to pipe.
//!
//! - Prefixed log lines: `info()`, `warn()`, `error()`, `success()`, `verbose()`
//! - Stage banners: `announce()`
//! - Row accounting: `tally()`
//! - Per-row progress: `progress()`
//! - `tracing` subscriber setup: `init_tracing()`

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Install the `tracing` subscriber used by the binaries.
///
/// `RUST_LOG` wins when set; otherwise the crate named by `target` logs at
/// info (debug when `verbose`) and everything else at warn.
pub fn init_tracing(target: &str, verbose: bool) {
  VERBOSE.store(verbose, Ordering::Relaxed);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new(format!("{target}=debug,info"))
    } else {
      EnvFilter::new(format!("{target}=info,warn"))
    }
  });

  // A second init (tests, repeated pipeline runs) is not an error.
  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .try_init();
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Core output function, one stderr line per message line
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Only shown with `--verbose`
pub fn verbose(message: &str) {
  if is_verbose() {
    log_prefixed(Color::Cyan, "verb", message);
  }
}

pub fn info(message: &str) {
  log_prefixed(Color::Blue, "info", message);
}

pub fn warn(message: &str) {
  log_prefixed(Color::Yellow, "warn", message);
}

pub fn error(message: &str) {
  log_prefixed(Color::Red, "error", message);
}

pub fn success(message: &str) {
  log_prefixed(Color::Green, "sccs", message);
}

pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Stage header, e.g. `announce("stage 2: clean")`
pub fn announce(message: &str) {
  let banner = banner_line(50, '-');
  log(&banner.blue().bold().to_string());
  log(&message.blue().bold().to_string());
  log(&banner.blue().bold().to_string());
}

/// Render a row-accounting line: `clean: 812 in, 640 kept, 172 dropped`
pub fn format_tally(stage: &str, seen: usize, kept: usize) -> String {
  let dropped = seen.saturating_sub(kept);
  format!("{stage}: {seen} in, {kept} kept, {dropped} dropped")
}

/// Print the tally line and record it as a `tracing` event for `RUST_LOG=bentley=debug`
pub fn tally(stage: &str, seen: usize, kept: usize) {
  tracing::debug!(stage = %stage, seen, kept, dropped = seen.saturating_sub(kept), "tally");
  info(&format_tally(stage, seen, kept));
}

/// Progress bar for a per-row pass. Hidden when stderr is not a terminal.
pub fn progress(len: usize, label: &str) -> ProgressBar {
  let bar = ProgressBar::new(len as u64);
  let style = ProgressStyle::with_template("{prefix:>12} [{bar:30}] {pos}/{len} {elapsed}")
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
  bar.set_style(style);
  bar.set_prefix(label.to_string());
  bar
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  #[test]
  fn test_format_tally_counts_dropped_rows() {
    assert_eq!(format_tally("clean", 10, 7), "clean: 10 in, 7 kept, 3 dropped");
  }

  #[test]
  fn test_format_tally_never_underflows() {
    assert_eq!(format_tally("collect", 0, 4), "collect: 0 in, 4 kept, 0 dropped");
  }

  #[derive(Clone, Default)]
  struct Captured(Arc<Mutex<Vec<u8>>>);

  impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_tally_emits_tracing_event() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_ansi(false)
      .with_writer(move || writer.clone())
      .finish();

    tracing::subscriber::with_default(subscriber, || tally("gibberish", 12, 9));

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("tally"), "{output}");
    assert!(output.contains("stage=gibberish"), "{output}");
    assert!(output.contains("seen=12"), "{output}");
    assert!(output.contains("dropped=3"), "{output}");
  }

  #[test]
  fn test_banner_line_length() {
    assert_eq!(banner_line(5, '-'), "-----");
    assert!(banner_line(0, '=').is_empty());
  }

  #[test]
  fn test_progress_bar_length() {
    let bar = progress(42, "sentiment");
    assert_eq!(bar.length(), Some(42));
    bar.finish_and_clear();
  }
}
