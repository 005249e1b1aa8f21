//! Synthetic sensor subsystem
//!
//! Produces the readings the simulator publishes:
//!
//! 1. [`reading`] - The `Reading` record and its JSON wire payload
//! 2. [`generator`] - Uniform temperature sampling within a configured range
//! 3. [`clock`] - Wall-clock source, replaceable in tests
//!
//! # Data Flow
//!
//! ```text
//! Clock ──┐
//!         ├──► ReadingGenerator ──► Reading ──► JSON payload
//! Rng ────┘
//! ```

pub mod clock;
pub mod generator;
pub mod reading;

pub use clock::{Clock, SystemClock};
pub use generator::{ReadingGenerator, SamplingRange};
pub use reading::Reading;
