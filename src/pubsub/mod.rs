//! # Publish/Subscribe Transport Module
//!
//! Everything the simulator needs to hand a serialized reading to the
//! messaging service, and nothing more. The loop only sees the [`Publisher`]
//! trait; the MQTT implementation behind it is constructed once at startup.
//!
//! ## Module Architecture
//!
//! ```text
//! pubsub/
//! ├── topic.rs           - TopicPath built from project and topic ids
//! ├── credentials.rs     - Credential file loading
//! ├── handle.rs          - PublishHandle and PublishError
//! ├── publisher.rs       - Publisher trait (the transport seam)
//! ├── ack_tracker.rs     - Request/acknowledgement correlation
//! └── mqtt_publisher.rs  - rumqttc-backed Publisher with its event loop driver
//! ```
//!
//! ## Delivery Semantics
//!
//! Delivery guarantees, reconnects and ordering on the wire belong to the
//! broker and the `rumqttc` client. This module only reports, per publish,
//! whether the broker acknowledged it or the connection failed first.

pub mod ack_tracker;
pub mod credentials;
pub mod handle;
pub mod mqtt_publisher;
pub mod publisher;
pub mod topic;

#[cfg(test)]
pub mod test_broker;

pub use credentials::{Credentials, CredentialsError};
pub use handle::{PublishError, PublishHandle};
pub use mqtt_publisher::MqttPublisher;
pub use publisher::Publisher;
pub use topic::{TopicError, TopicPath};
