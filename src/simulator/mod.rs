//! Simulator core
//!
//! - [`runner`] - the reading generator and publisher loop, plus `launch`
//! - [`policy`] - what the loop does with each publish outcome
//! - [`stats`] - publish counters shared with detached observers
//! - [`error`] - setup and runtime error types

pub mod error;
pub mod policy;
pub mod runner;
pub mod stats;

pub use error::{SetupError, SimulatorError};
pub use policy::PublishPolicy;
pub use runner::{launch, RunSummary, Simulator};
pub use stats::{PublishStats, PublishStatsTracker};
