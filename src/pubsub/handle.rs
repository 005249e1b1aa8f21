use tokio::sync::oneshot;

/// Errors reported through a [`PublishHandle`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Publish request rejected by client: {0}")]
    Rejected(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Publish outcome dropped before completion")]
    Dropped,
}

/// Outcome of a single publish, available once the transport has settled it.
///
/// `Publisher::publish` returns immediately with one of these. Callers choose
/// whether to await it or hand it off and move on.
#[derive(Debug)]
pub struct PublishHandle {
    rx: oneshot::Receiver<Result<(), PublishError>>,
}

/// Sending half of a [`PublishHandle`], held by the transport
#[derive(Debug)]
pub struct PublishCompleter {
    tx: oneshot::Sender<Result<(), PublishError>>,
}

/// Creates a linked completer/handle pair.
pub fn publish_channel() -> (PublishCompleter, PublishHandle) {
    let (tx, rx) = oneshot::channel();
    (PublishCompleter { tx }, PublishHandle { rx })
}

impl PublishHandle {
    /// Handle that is already settled with `result`.
    pub fn ready(result: Result<(), PublishError>) -> Self {
        let (completer, handle) = publish_channel();
        completer.complete(result);
        handle
    }

    pub async fn wait(self) -> Result<(), PublishError> {
        self.rx.await.unwrap_or(Err(PublishError::Dropped))
    }
}

impl PublishCompleter {
    pub fn complete(self, result: Result<(), PublishError>) {
        // receiver gone means nobody is watching this publish
        let _ = self.tx.send(result);
    }
}
