//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for the sync engine.
///
/// Caller identity and storage namespace are explicit configuration, never
/// read from ambient global state.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identity of the syncing caller. The entry guard refuses to run a
    /// pass while this is unset.
    pub caller_id: Option<String>,
    /// Prefix for durable store keys.
    pub namespace: String,
    /// Whether the engine assumes connectivity at startup.
    pub initially_online: bool,
    /// Quiet window after an enqueue before a pass is requested.
    pub debounce: Duration,
    /// Wait after a reconnect before a pass is requested, so flapping
    /// links settle first.
    pub settle_delay: Duration,
    /// Interval of the periodic trigger while online with a non-empty
    /// queue.
    pub periodic_interval: Duration,
    /// Fixed delay between operations within a pass. This bounds the call
    /// rate against the remote service and is deliberate backpressure,
    /// not an incidental detail.
    pub inter_op_delay: Duration,
    /// Maximum consecutive automatic retries after degraded passes.
    pub max_retries: u32,
    /// Base delay of the retry schedule; the n-th retry waits `base × n`.
    pub retry_base_delay: Duration,
}

impl SyncConfig {
    /// Creates a configuration with default timings.
    pub fn new() -> Self {
        Self {
            caller_id: None,
            namespace: "driftsync".into(),
            initially_online: false,
            debounce: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
            periodic_interval: Duration::from_secs(30),
            inter_op_delay: Duration::from_millis(100),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(5),
        }
    }

    /// Sets the caller identity.
    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// Sets the store key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the initial connectivity assumption.
    pub fn with_initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    /// Sets the enqueue debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the reconnect settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the periodic trigger interval.
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Sets the inter-operation delay.
    pub fn with_inter_op_delay(mut self, delay: Duration) -> Self {
        self.inter_op_delay = delay;
        self
    }

    /// Sets the maximum automatic retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the retry base delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Delay before the given retry (1-indexed): linear in the retry
    /// count, so the defaults give 5s, 10s, 15s.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        self.retry_base_delay.saturating_mul(retry_count.max(1))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
