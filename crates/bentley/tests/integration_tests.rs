use bentley::*;

#[test]
fn test_basic_logging_functions() {
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  success("Test success message");
  verbose("Hidden unless verbose");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  error(multiline_msg);
  success(multiline_msg);
}

#[test]
fn test_stage_reporting() {
  announce("stage 2: clean");
  tally("clean", 12, 9);
}

#[test]
fn test_init_tracing_twice_is_harmless() {
  init_tracing("reviewlens", false);
  init_tracing("reviewlens", true);
  assert!(is_verbose());
}
