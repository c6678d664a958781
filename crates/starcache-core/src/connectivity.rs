//! Connectivity port and the shared network monitor.
//!
//! The core never probes the network itself. The embedding application owns
//! the platform signal (browser online/offline events, OS interface
//! notifications, a heartbeat) and feeds transitions into a
//! [`NetworkMonitor`]; everything else queries the monitor through the
//! [`Connectivity`] trait at decision time.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::info;

/// Capacity of the transition event channel. Transitions are rare and
/// consumers react immediately; a small buffer only has to absorb bursts
/// from flapping links.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Point-in-time connectivity query.
///
/// Always queried fresh, never cached by callers: connectivity can change
/// between two calls within the same logical operation.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Shared connectivity state plus a transition feed.
///
/// Defaults to online: in an environment with no reachability signal the
/// system degrades to "assume online" rather than refusing remote calls.
pub struct NetworkMonitor {
    online: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            online: AtomicBool::new(true),
            events,
        }
    }

    /// Record the current reachability and emit an event if it changed.
    /// Repeated reports of the same state are absorbed silently.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was == online {
            return;
        }
        let event = if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        };
        info!(online, "Connectivity changed");
        // No receivers is fine - nobody is watching yet
        let _ = self.events.send(event);
    }

    /// Subscribe to transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for NetworkMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_online() {
        let monitor = NetworkMonitor::new();
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_transition_emits_event() {
        let monitor = NetworkMonitor::new();
        let mut rx = monitor.subscribe();

        monitor.set_online(false);
        assert!(!monitor.is_online());
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Offline);

        monitor.set_online(true);
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Online);
    }

    #[tokio::test]
    async fn test_repeated_state_is_absorbed() {
        let monitor = NetworkMonitor::new();
        let mut rx = monitor.subscribe();

        monitor.set_online(true); // already online
        monitor.set_online(false);
        monitor.set_online(false);

        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Offline);
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }
}
