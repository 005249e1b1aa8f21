use serde::{Deserialize, Serialize};
use std::fmt;

/// One synthetic sensor sample.
///
/// Created fresh for every loop iteration and dropped once it has been
/// published and logged. The serialized form is the wire payload: a flat JSON
/// object with exactly the three fields below and no envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Identifier of the simulated source, constant for the process lifetime
    pub device_id: String,
    /// Temperature in degrees Celsius, rounded to two decimals
    pub temperature: f64,
    /// Seconds since the Unix epoch, fractional
    pub timestamp: f64,
}

impl Reading {
    /// Serializes the reading into the UTF-8 JSON bytes sent to the topic.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "device_id={} temperature={:.2} timestamp={:.6}",
            self.device_id, self.temperature, self.timestamp
        )
    }
}
