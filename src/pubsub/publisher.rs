use super::handle::PublishHandle;
use super::topic::TopicPath;

/// Seam between the simulator loop and the messaging transport.
///
/// `publish` must not block: it hands the payload to the transport and
/// returns a [`PublishHandle`] that settles once the outcome is known.
/// Implementations are constructed once and shared read-only by the loop.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, topic: &TopicPath, payload: Vec<u8>) -> PublishHandle;

    /// Flushes what was already handed over and disconnects.
    ///
    /// The handle settles once the transport has let go of the connection.
    /// Transports without a connection settle immediately.
    fn close(&self) -> PublishHandle {
        PublishHandle::ready(Ok(()))
    }
}
