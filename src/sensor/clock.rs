use chrono::Utc;

/// Source of wall-clock timestamps for readings.
///
/// The simulator only ever asks for "now" as fractional seconds since the
/// Unix epoch, so tests can swap in a clock that advances by a fixed step.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// System wall clock with microsecond resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

#[cfg(test)]
pub use test_clock::SteppingClock;
