//! Network reachability tracking.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Connectivity snapshot. Online means connected with the internet
/// actually reachable, not just an interface being up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachabilityState {
  pub connected: bool,
  pub internet_reachable: bool,
}

impl ReachabilityState {
  pub fn online() -> Self {
    Self {
      connected: true,
      internet_reachable: true,
    }
  }

  pub fn offline() -> Self {
    Self {
      connected: false,
      internet_reachable: false,
    }
  }

  pub fn is_online(&self) -> bool {
    self.connected && self.internet_reachable
  }
}

/// Publishes connectivity changes to any number of subscribers.
///
/// Backed by a watch channel: rapid flaps coalesce, and each observed
/// value means "the state is now X", not an edge count. Clones share the
/// same channel.
#[derive(Clone)]
pub struct ReachabilityMonitor {
  tx: Arc<watch::Sender<ReachabilityState>>,
}

impl ReachabilityMonitor {
  pub fn new(initial: ReachabilityState) -> Self {
    let (tx, _rx) = watch::channel(initial);
    Self { tx: Arc::new(tx) }
  }

  /// Latest known state.
  pub fn current(&self) -> ReachabilityState {
    *self.tx.borrow()
  }

  pub fn is_online(&self) -> bool {
    self.current().is_online()
  }

  /// Record a new state. Subscribers are only woken when the state
  /// actually changed.
  pub fn update(&self, state: ReachabilityState) {
    self.tx.send_if_modified(|current| {
      if *current == state {
        false
      } else {
        *current = state;
        true
      }
    });
  }

  /// Subscribe to state changes. The receiver always exposes the latest
  /// value; intermediate flaps may be coalesced away.
  pub fn subscribe(&self) -> watch::Receiver<ReachabilityState> {
    self.tx.subscribe()
  }
}

/// Spawn a background task probing `url` every `interval` and feeding the
/// monitor. Any response, even an error status, proves the network path
/// works; only transport failures count as offline. Abort the returned
/// handle to stop probing.
pub fn spawn_http_probe(
  monitor: ReachabilityMonitor,
  client: reqwest::Client,
  url: String,
  interval: Duration,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;

      let state = match client.get(&url).send().await {
        Ok(_) => ReachabilityState::online(),
        Err(e) => {
          debug!(error = %e, "reachability probe failed");
          ReachabilityState::offline()
        }
      };

      monitor.update(state);
    }
  })
}
