use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::handle::{publish_channel, PublishCompleter, PublishError, PublishHandle};

#[derive(Debug, Default)]
struct TrackerState {
    // submitted to the client, not yet written to the socket
    queued: VecDeque<PublishCompleter>,
    // written, waiting for the broker's acknowledgement
    inflight: HashMap<u16, PublishCompleter>,
    // in flight when the connection failed; the client retransmits these
    stale_pkids: HashSet<u16>,
    // still queued when the connection failed; the client sends these
    // before anything submitted afterwards
    stale_unsent: usize,
    disconnect: Option<PublishCompleter>,
    closing: bool,
}

/// Correlates publish requests with broker acknowledgements.
///
/// The MQTT client writes requests in the order they were submitted, so the
/// n-th `Outgoing::Publish` belongs to the n-th queued completer. From there
/// the packet id links it to its `PubAck`/`PubComp`. With QoS 0 there is no
/// acknowledgement and a publish counts as done once it is written.
///
/// A connection error fails every outstanding completer, but the client
/// still retransmits what was in flight and still sends what was queued.
/// Those writes are skipped so they cannot settle newer requests.
#[derive(Debug)]
pub struct AckTracker {
    awaits_ack: bool,
    state: Mutex<TrackerState>,
}

impl AckTracker {
    pub fn new(awaits_ack: bool) -> Self {
        Self {
            awaits_ack,
            state: Mutex::new(TrackerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `send` and queues a completer for it if the client accepted it.
    ///
    /// The lock is held across `send` so queue order matches request order.
    pub fn submit<E, F>(&self, send: F) -> PublishHandle
    where
        E: Display,
        F: FnOnce() -> Result<(), E>,
    {
        let mut state = self.state();
        match send() {
            Ok(()) => {
                let (completer, handle) = publish_channel();
                state.queued.push_back(completer);
                handle
            }
            Err(e) => PublishHandle::ready(Err(PublishError::Rejected(e.to_string()))),
        }
    }

    /// Runs `send` for a disconnect request. The handle settles once the
    /// DISCONNECT packet has been written.
    pub fn submit_disconnect<E, F>(&self, send: F) -> PublishHandle
    where
        E: Display,
        F: FnOnce() -> Result<(), E>,
    {
        let mut state = self.state();
        if state.closing {
            return PublishHandle::ready(Err(PublishError::Rejected(
                "publisher is already closing".into(),
            )));
        }
        match send() {
            Ok(()) => {
                let (completer, handle) = publish_channel();
                state.disconnect = Some(completer);
                state.closing = true;
                handle
            }
            Err(e) => PublishHandle::ready(Err(PublishError::Rejected(e.to_string()))),
        }
    }

    /// A publish packet with `pkid` has been written to the broker.
    pub fn on_sent(&self, pkid: u16) {
        let mut state = self.state();
        if state.stale_pkids.remove(&pkid) {
            debug!("Retransmitted publish {} belongs to a failed handle", pkid);
            return;
        }
        if state.stale_unsent > 0 {
            state.stale_unsent -= 1;
            debug!("Backlogged publish {} belongs to a failed handle", pkid);
            return;
        }
        let Some(completer) = state.queued.pop_front() else {
            debug!("Untracked outgoing publish {}", pkid);
            return;
        };
        if self.awaits_ack {
            if let Some(stale) = state.inflight.insert(pkid, completer) {
                warn!("Packet id {} reused while still in flight", pkid);
                stale.complete(Err(PublishError::Dropped));
            }
        } else {
            completer.complete(Ok(()));
        }
    }

    /// The broker acknowledged `pkid`.
    pub fn on_ack(&self, pkid: u16) {
        match self.state().inflight.remove(&pkid) {
            Some(completer) => completer.complete(Ok(())),
            None => debug!("Acknowledgement for untracked packet id {}", pkid),
        }
    }

    /// The DISCONNECT packet has been written.
    pub fn on_disconnect_sent(&self) {
        if let Some(completer) = self.state().disconnect.take() {
            completer.complete(Ok(()));
        }
    }

    pub fn is_closing(&self) -> bool {
        self.state().closing
    }

    /// Fails every outstanding publish, e.g. after the connection dropped.
    ///
    /// Returns the number of publishes failed. A pending disconnect is
    /// settled with the same error.
    pub fn fail_all(&self, error: PublishError) -> usize {
        let mut state = self.state();
        let queued = std::mem::take(&mut state.queued);
        let inflight = std::mem::take(&mut state.inflight);
        let count = queued.len() + inflight.len();

        state.stale_unsent += queued.len();
        state.stale_pkids.extend(inflight.keys().copied());

        for completer in queued.into_iter().chain(inflight.into_values()) {
            completer.complete(Err(error.clone()));
        }
        if let Some(disconnect) = state.disconnect.take() {
            disconnect.complete(Err(error));
        }
        count
    }

    pub fn pending(&self) -> usize {
        let state = self.state();
        state.queued.len() + state.inflight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept() -> Result<(), String> {
        Ok(())
    }

    #[tokio::test]
    async fn qos0_completes_when_written() {
        let tracker = AckTracker::new(false);
        let handle = tracker.submit(accept);
        assert_eq!(tracker.pending(), 1);

        tracker.on_sent(0);
        assert_eq!(tracker.pending(), 0);
        assert_eq!(handle.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn qos1_completes_on_matching_ack() {
        let tracker = AckTracker::new(true);
        let first = tracker.submit(accept);
        let second = tracker.submit(accept);

        tracker.on_sent(1);
        tracker.on_sent(2);
        assert_eq!(tracker.pending(), 2);

        tracker.on_ack(2);
        assert_eq!(second.wait().await, Ok(()));
        assert_eq!(tracker.pending(), 1);

        tracker.on_ack(1);
        assert_eq!(first.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn rejected_submit_settles_immediately() {
        let tracker = AckTracker::new(true);
        let handle = tracker.submit(|| Err("request channel full"));

        assert_eq!(tracker.pending(), 0);
        assert_eq!(
            handle.wait().await,
            Err(PublishError::Rejected("request channel full".into()))
        );
    }

    #[tokio::test]
    async fn fail_all_settles_queued_and_inflight() {
        let tracker = AckTracker::new(true);
        let sent = tracker.submit(accept);
        let queued = tracker.submit(accept);
        tracker.on_sent(7);

        let error = PublishError::Connection("refused".into());
        assert_eq!(tracker.fail_all(error.clone()), 2);
        assert_eq!(sent.wait().await, Err(error.clone()));
        assert_eq!(queued.wait().await, Err(error));
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn retransmission_after_reconnect_does_not_settle_newer_publish() {
        let tracker = AckTracker::new(true);
        let first = tracker.submit(accept);
        tracker.on_sent(1);
        tracker.fail_all(PublishError::Connection("reset".into()));
        assert!(first.wait().await.is_err());

        let second = tracker.submit(accept);
        // the client replays packet 1 after reconnecting
        tracker.on_sent(1);
        tracker.on_ack(1);
        assert_eq!(tracker.pending(), 1);

        tracker.on_sent(2);
        assert_eq!(tracker.pending(), 1);
        tracker.on_ack(2);
        assert_eq!(second.wait().await, Ok(()));
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn backlog_sent_after_reconnect_is_skipped() {
        let tracker = AckTracker::new(false);
        let unsent = tracker.submit(accept);
        tracker.fail_all(PublishError::Connection("refused".into()));
        tracker.fail_all(PublishError::Connection("refused".into()));
        assert!(unsent.wait().await.is_err());

        let next = tracker.submit(accept);
        // the backlogged request goes out first
        tracker.on_sent(0);
        assert_eq!(tracker.pending(), 1);

        tracker.on_sent(0);
        assert_eq!(next.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn disconnect_settles_when_written() {
        let tracker = AckTracker::new(true);
        let closing = tracker.submit_disconnect(accept);
        assert!(tracker.is_closing());

        let again = tracker.submit_disconnect(accept);
        assert!(matches!(again.wait().await, Err(PublishError::Rejected(_))));

        tracker.on_disconnect_sent();
        assert_eq!(closing.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn connection_error_fails_pending_disconnect() {
        let tracker = AckTracker::new(true);
        let closing = tracker.submit_disconnect(accept);

        tracker.fail_all(PublishError::Connection("reset".into()));
        assert_eq!(
            closing.wait().await,
            Err(PublishError::Connection("reset".into()))
        );
    }

    #[test]
    fn untracked_events_are_ignored() {
        let tracker = AckTracker::new(true);
        tracker.on_sent(3);
        tracker.on_ack(3);
        tracker.on_disconnect_sent();
        assert_eq!(tracker.pending(), 0);
    }
}
