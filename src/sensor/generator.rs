use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::clock::Clock;
use super::reading::Reading;

/// Closed interval temperatures are drawn from, in degrees Celsius.
///
/// Both bounds must sit on the two-decimal grid so that rounding a draw can
/// never push it outside the interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingRange {
    pub min: f64,
    pub max: f64,
}

impl Default for SamplingRange {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 35.0,
        }
    }
}

impl SamplingRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Rounds to two decimal places, half away from zero.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Returns true if `value` has at most two decimal digits.
pub fn is_on_hundredths_grid(value: f64) -> bool {
    ((value * 100.0) - (value * 100.0).round()).abs() < 1e-6
}

/// Produces readings for a single simulated device.
///
/// Owns its random source and keeps the last emitted timestamp so that
/// successive readings never go back in time, even when the wall clock is
/// stepped backwards.
pub struct ReadingGenerator {
    device_id: String,
    range: SamplingRange,
    rng: StdRng,
    clock: Arc<dyn Clock>,
    last_timestamp: Option<f64>,
}

impl ReadingGenerator {
    /// Creates a generator seeded from OS entropy.
    pub fn new(device_id: impl Into<String>, range: SamplingRange, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(device_id, range, clock, StdRng::from_entropy())
    }

    pub fn with_rng(
        device_id: impl Into<String>,
        range: SamplingRange,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            range,
            rng,
            clock,
            last_timestamp: None,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Draws a temperature uniformly from the range, rounded to hundredths.
    pub fn sample_temperature(&mut self) -> f64 {
        let SamplingRange { min, max } = self.range;
        let raw = if min < max {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        round_to_hundredths(raw).clamp(min, max)
    }

    pub fn next_reading(&mut self) -> Reading {
        let temperature = self.sample_temperature();

        let mut timestamp = self.clock.now();
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                debug!(
                    "Clock went backwards ({} < {}), reusing previous timestamp",
                    timestamp, last
                );
                timestamp = last;
            }
        }
        self.last_timestamp = Some(timestamp);

        Reading {
            device_id: self.device_id.clone(),
            temperature,
            timestamp,
        }
    }
}
