//! Tracing subscriber setup: stdout plus a daily rolling file.

mod logger;

pub use logger::{init_logger, DEFAULT_FILTER};
