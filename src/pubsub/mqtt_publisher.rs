use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ack_tracker::AckTracker;
use super::credentials::Credentials;
use super::handle::{PublishError, PublishHandle};
use super::publisher::Publisher;
use super::topic::TopicPath;
use crate::config::DestinationConfig;
use crate::simulator::error::SetupError;

// Buffered requests between the client and its event loop
const REQUEST_CAPACITY: usize = 100;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Maps an MQTT QoS level (0, 1, 2) to the client's enum.
pub fn qos_from_level(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// [`Publisher`] backed by an MQTT broker.
///
/// Owns a `rumqttc` client and a background task that drives its event loop.
/// Publishing only enqueues the request; the driver task settles the returned
/// handle when the broker acknowledges it or the connection fails.
///
/// # Connection Lifecycle
///
/// ```text
/// connect() ──► spawn driver ──► poll ──► ConnAck ──► Publish/PubAck ...
///                                 │
///                                 └─ error ──► fail pending ──► back off 1s ──► poll
/// ```
///
/// [`Publisher::close`] queues a DISCONNECT behind the pending requests and
/// the driver exits once it has been written. Dropping the publisher without
/// closing stops the driver at once and fails anything still pending.
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    tracker: Arc<AckTracker>,
    shutdown: CancellationToken,
}

impl MqttPublisher {
    /// Builds the client and starts its event loop.
    ///
    /// Must be called from within a Tokio runtime. No network traffic happens
    /// here; the first connection attempt is made by the driver task.
    ///
    /// # Errors
    ///
    /// * [`SetupError::Client`] - invalid QoS, keep-alive or client id, or no runtime
    pub fn connect(
        destination: &DestinationConfig,
        credentials: &Credentials,
    ) -> Result<Self, SetupError> {
        let qos = qos_from_level(destination.qos)
            .ok_or_else(|| SetupError::Client(format!("invalid QoS level {}", destination.qos)))?;

        let client_id = credentials
            .client_id
            .clone()
            .unwrap_or_else(|| destination.client_id.clone());
        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(SetupError::Client(format!(
                "invalid client id {:?}",
                client_id
            )));
        }
        if destination.keep_alive_secs == 0 {
            return Err(SetupError::Client("keep-alive must be at least 1s".into()));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SetupError::Client(format!("no async runtime: {}", e)))?;

        let mut mqtt_options = MqttOptions::new(
            client_id.clone(),
            destination.broker_host.clone(),
            destination.broker_port,
        );
        mqtt_options
            .set_credentials(credentials.username.clone(), credentials.password.clone())
            .set_keep_alive(Duration::from_secs(destination.keep_alive_secs));

        let (client, eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

        let tracker = Arc::new(AckTracker::new(qos != QoS::AtMostOnce));
        let shutdown = CancellationToken::new();
        runtime.spawn(drive_event_loop(
            eventloop,
            tracker.clone(),
            shutdown.clone(),
        ));

        info!(
            "MQTT publisher {} targeting {}:{} as {} (QoS {:?})",
            client_id,
            destination.broker_host,
            destination.broker_port,
            credentials.username,
            qos
        );

        Ok(Self {
            client,
            qos,
            tracker,
            shutdown,
        })
    }

    /// Number of publishes still waiting for an outcome
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &TopicPath, payload: Vec<u8>) -> PublishHandle {
        let client = &self.client;
        let qos = self.qos;
        self.tracker
            .submit(|| client.try_publish(topic.as_str(), qos, false, payload))
    }

    fn close(&self) -> PublishHandle {
        let client = &self.client;
        self.tracker.submit_disconnect(|| client.try_disconnect())
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    tracker: Arc<AckTracker>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let failed = tracker.fail_all(PublishError::Connection("publisher shut down".into()));
                if failed > 0 {
                    warn!("MQTT publisher shut down with {} unsettled publishes", failed);
                }
                debug!("MQTT event loop stopped");
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Outgoing(Outgoing::Publish(pkid))) => tracker.on_sent(pkid),
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracker.on_disconnect_sent();
                    let failed = tracker.fail_all(PublishError::Connection("publisher closed".into()));
                    if failed > 0 {
                        warn!("MQTT publisher closed with {} unsettled publishes", failed);
                    }
                    info!("Disconnected from MQTT broker");
                    break;
                }
                Ok(Event::Incoming(Incoming::PubAck(ack))) => tracker.on_ack(ack.pkid),
                Ok(Event::Incoming(Incoming::PubComp(comp))) => tracker.on_ack(comp.pkid),
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    info!("Connected to MQTT broker: {:?}", ack.code);
                }
                Ok(other) => debug!("MQTT event: {:?}", other),
                Err(e) => {
                    let failed = tracker.fail_all(PublishError::Connection(e.to_string()));
                    error!("MQTT connection error ({} publishes failed): {}", failed, e);
                    if tracker.is_closing() {
                        break;
                    }
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                    }
                }
            }
        }
    }
}
