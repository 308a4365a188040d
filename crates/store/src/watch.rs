//! Change notifications for stored objects.

use solver_api::Resource;
use thiserror::Error;
use tokio::sync::broadcast;

/// A change to a stored object, carrying the object as of that change.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    /// The object as it was right before removal.
    Deleted(K),
}

impl<K: Resource> WatchEvent<K> {
    /// The object this event is about.
    pub const fn object(&self) -> &K {
        match self {
            Self::Added(o) | Self::Modified(o) | Self::Deleted(o) => o,
        }
    }

    /// Short name of the event type, for logging.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Failure to receive the next watch event.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum WatchError {
    /// The subscriber fell behind and `n` events were dropped; relist to catch up.
    #[error("watch lagged behind by {0} events")]
    Lagged(u64),
    /// The store was dropped.
    #[error("watch channel closed")]
    Closed,
}

/// Subscription handle for receiving change events.
pub struct WatchStream<K> {
    receiver: broadcast::Receiver<WatchEvent<K>>,
}

impl<K: Resource> WatchStream<K> {
    pub(crate) const fn new(receiver: broadcast::Receiver<WatchEvent<K>>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Lagged`] when events were dropped and
    /// [`WatchError::Closed`] once the store is gone.
    pub async fn recv(&mut self) -> Result<WatchEvent<K>, WatchError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(n) => WatchError::Lagged(n),
            broadcast::error::RecvError::Closed => WatchError::Closed,
        })
    }
}
