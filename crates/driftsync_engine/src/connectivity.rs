//! Connectivity tracking.

use tokio::sync::watch;
use tracing::info;

/// Tracks online/offline state and broadcasts transitions.
///
/// The platform integration drives [`set_online`](Self::set_online); the
/// scheduler subscribes and reacts to transitions (settle-then-sync on
/// reconnect, status reset on disconnect). The monitor itself never starts
/// a pass.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Returns the current reachability state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records a reachability change. Setting the current state again is a
    /// no-op and does not notify subscribers.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(
                "connectivity transition: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Subscribes to transition events.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
