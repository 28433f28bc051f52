use serde::{Deserialize, Serialize};

/// Lifecycle of a supervised instance.
///
/// `Stopped` is not terminal: a later start moves the instance back to
/// `Starting`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Unprovisioned,
    Provisioned,
    Initialized,
    Starting,
    Ready,
    Stopping,
    Stopped,
}
