use serde::{Deserialize, Serialize};

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Runtime options for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Emit a debug event for every processed action (default: true).
    #[serde(default = "default_trace_actions")]
    pub trace_actions: bool,
    /// Actions one `send` may drain before a warning is logged
    /// (default: 10000).
    #[serde(default = "default_drain_warning_threshold")]
    pub drain_warning_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            trace_actions: default_trace_actions(),
            drain_warning_threshold: default_drain_warning_threshold(),
        }
    }
}

fn default_trace_actions() -> bool {
    true
}

fn default_drain_warning_threshold() -> usize {
    10_000
}
