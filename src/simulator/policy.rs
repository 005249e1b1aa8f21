use serde::{Deserialize, Serialize};
use std::fmt;

/// How the loop treats the outcome of each publish.
///
/// The publish call itself never blocks; this only decides whether the loop
/// waits for the handle and what a failure means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Don't wait. A detached task logs failures; the cadence never stalls
    /// and lost readings are tolerated.
    #[default]
    FireAndForget,
    /// Wait for each outcome, log and count failures, keep going.
    AwaitAndLog,
    /// Wait for each outcome and stop the loop on the first failure.
    AwaitAndAbort,
}

impl fmt::Display for PublishPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PublishPolicy::FireAndForget => "fire_and_forget",
            PublishPolicy::AwaitAndLog => "await_and_log",
            PublishPolicy::AwaitAndAbort => "await_and_abort",
        };
        f.write_str(name)
    }
}
