use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out strictly increasing ISO-8601 timestamps (microsecond precision).
///
/// Fixed width and UTC, so lexicographic order equals chronological order.
#[derive(Debug, Default)]
pub struct TimestampClock {
    last_micros: AtomicI64,
}

impl TimestampClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Acquire);

        loop {
            let candidate = now.max(prev + 1);
            match self.last_micros.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return format_micros(candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

fn format_micros(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}
