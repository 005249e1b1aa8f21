//! Reading generator and publisher loop
//!
//! Owns the whole runtime behavior of the simulator: draw a reading,
//! serialize it, publish it, log it, wait, repeat. Configuration, the
//! publisher, the clock and the cancellation token are all injected, so the
//! loop carries no global state.
//!
//! # Iteration
//!
//! ```text
//! ReadingGenerator ──► Reading ──► JSON ──► Publisher::publish ──► PublishHandle
//!                                                                       │
//!                          PublishPolicy decides: detach or await ◄─────┘
//!                                                                       │
//!                               log "Published: ..." ──► sleep(interval)
//! ```
//!
//! # Shutdown
//!
//! However the loop ends, it waits up to `shutdown_timeout` for detached
//! publishes to settle and for the publisher to close, so the last readings
//! of a bounded run still reach the broker.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{SetupError, SimulatorError};
use super::policy::PublishPolicy;
use super::stats::{PublishStats, PublishStatsTracker};
use crate::config::{ConfigError, DestinationConfig, SimulatorConfig};
use crate::pubsub::{Credentials, PublishError, PublishHandle, Publisher, TopicPath};
use crate::sensor::{Clock, Reading, ReadingGenerator, SystemClock};

/// Result of a loop that terminated cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Readings generated and submitted
    pub iterations: u64,
    /// Outcomes settled before shutdown. Publishes still unsettled when the
    /// shutdown timeout expires are in neither count.
    pub stats: PublishStats,
}

enum StepOutcome {
    Settled,
    Cancelled,
}

/// Long-lived context of the simulator loop.
pub struct Simulator<P: Publisher> {
    generator: ReadingGenerator,
    publisher: P,
    topic: TopicPath,
    policy: PublishPolicy,
    interval: Duration,
    max_iterations: Option<u64>,
    shutdown_timeout: Duration,
    stats: PublishStatsTracker,
    // fire-and-forget outcome observers
    observers: JoinSet<()>,
    token: CancellationToken,
}

impl<P: Publisher> Simulator<P> {
    pub fn new(
        config: &SimulatorConfig,
        topic: TopicPath,
        publisher: P,
        clock: Arc<dyn Clock>,
        token: CancellationToken,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            generator: ReadingGenerator::new(
                config.device_id.clone(),
                config.sampling_range,
                clock,
            ),
            publisher,
            topic,
            policy: config.publish_policy,
            interval: config.interval()?,
            max_iterations: config.max_iterations,
            shutdown_timeout: config.shutdown_timeout()?,
            stats: PublishStatsTracker::new(),
            observers: JoinSet::new(),
            token,
        })
    }

    /// Replaces the reading generator, e.g. with a seeded one.
    pub fn with_generator(mut self, generator: ReadingGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Shared view of the publish counters
    pub fn stats(&self) -> PublishStatsTracker {
        self.stats.clone()
    }

    /// Runs until cancelled, until `max_iterations` readings were produced,
    /// or until a publish fails under [`PublishPolicy::AwaitAndAbort`].
    pub async fn run(mut self) -> Result<RunSummary, SimulatorError> {
        info!(
            "Publishing {} readings to {} every {:?} ({})",
            self.generator.device_id(),
            self.topic,
            self.interval,
            self.policy
        );

        let result = self.publish_loop().await;
        self.shutdown().await;
        let iterations = result?;

        info!("Simulator stopped after {} readings", iterations);
        Ok(RunSummary {
            iterations,
            stats: self.stats.snapshot(),
        })
    }

    async fn publish_loop(&mut self) -> Result<u64, SimulatorError> {
        let mut iterations: u64 = 0;
        loop {
            if self.token.is_cancelled() {
                break;
            }

            let outcome = self.step().await?;
            iterations += 1;
            if matches!(outcome, StepOutcome::Cancelled) {
                break;
            }

            if self.max_iterations.is_some_and(|max| iterations >= max) {
                debug!("Reached {} iterations, stopping", iterations);
                break;
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        Ok(iterations)
    }

    /// Lets detached publishes settle, then closes the publisher, all within
    /// `shutdown_timeout`.
    async fn shutdown(&mut self) {
        let observers = &mut self.observers;
        let publisher = &self.publisher;
        let settle = async {
            while observers.join_next().await.is_some() {}
            if let Err(e) = publisher.close().wait().await {
                warn!("Publisher did not close cleanly: {}", e);
            }
        };

        let settled = tokio::time::timeout(self.shutdown_timeout, settle).await;
        if settled.is_err() {
            warn!(
                "Gave up on {} unsettled publishes after {:?}",
                self.observers.len(),
                self.shutdown_timeout
            );
            self.observers.abort_all();
        }
    }

    /// One iteration: generate, serialize, publish, log.
    async fn step(&mut self) -> Result<StepOutcome, SimulatorError> {
        let reading = self.generator.next_reading();
        let payload = reading.to_payload()?;
        let bytes = payload.len();

        let handle = self.publisher.publish(&self.topic, payload);

        match self.policy {
            PublishPolicy::FireAndForget => {
                while self.observers.try_join_next().is_some() {}

                let stats = self.stats.clone();
                let device_id = reading.device_id.clone();
                self.observers.spawn(async move {
                    match handle.wait().await {
                        Ok(()) => stats.record_published(bytes),
                        Err(e) => {
                            stats.record_failed();
                            warn!("Publish from {} failed and was dropped: {}", device_id, e);
                        }
                    }
                });
                info!("Published: {}", reading);
            }
            PublishPolicy::AwaitAndLog => {
                match Self::await_outcome(&self.token, handle, &reading).await {
                    None => return Ok(StepOutcome::Cancelled),
                    Some(Ok(())) => {
                        self.stats.record_published(bytes);
                        info!("Published: {}", reading);
                    }
                    Some(Err(e)) => {
                        self.stats.record_failed();
                        error!("Failed to publish {}: {}", reading, e);
                    }
                }
            }
            PublishPolicy::AwaitAndAbort => {
                match Self::await_outcome(&self.token, handle, &reading).await {
                    None => return Ok(StepOutcome::Cancelled),
                    Some(Ok(())) => {
                        self.stats.record_published(bytes);
                        info!("Published: {}", reading);
                    }
                    Some(Err(source)) => {
                        self.stats.record_failed();
                        error!("Failed to publish {}: {}", reading, source);
                        return Err(SimulatorError::Publish { reading, source });
                    }
                }
            }
        }

        Ok(StepOutcome::Settled)
    }

    /// Waits for `handle` unless the loop is cancelled first.
    async fn await_outcome(
        token: &CancellationToken,
        handle: PublishHandle,
        reading: &Reading,
    ) -> Option<Result<(), PublishError>> {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled before the outcome of {} was known", reading);
                None
            }
            outcome = handle.wait() => Some(outcome),
        }
    }
}

/// Validates the configuration, resolves the topic, loads credentials,
/// builds the publisher through `connect` and runs the loop.
///
/// Every setup fault is returned before `connect` has a chance to publish
/// anything.
pub async fn launch<P, F>(
    config: SimulatorConfig,
    token: CancellationToken,
    connect: F,
) -> Result<RunSummary, SimulatorError>
where
    P: Publisher,
    F: FnOnce(&DestinationConfig, &Credentials) -> Result<P, SetupError>,
{
    config.validate().map_err(SetupError::from)?;

    let destination = &config.destination;
    let topic = TopicPath::new(&destination.project_id, &destination.topic_id)
        .map_err(SetupError::from)?;
    let credentials = Credentials::load(&destination.credentials_path)
        .await
        .map_err(SetupError::from)?;
    let publisher = connect(destination, &credentials)?;

    info!("Simulated IoT device started...");

    let simulator = Simulator::new(&config, topic, publisher, Arc::new(SystemClock), token)
        .map_err(SetupError::from)?;
    simulator.run().await
}
