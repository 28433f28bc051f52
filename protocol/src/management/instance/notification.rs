use serde::{Deserialize, Serialize};

use super::status::InstanceState;

/// Pushed to the fleet layer when a supervised process changes state.
///
/// Emitted on the transition into `Ready` (readiness announcement seen in
/// the server's output) and into `Stopped` (process exit, with the exit
/// code when the platform reports one).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceNotification {
    pub id: u32,
    pub state: InstanceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl InstanceNotification {
    pub fn ready(id: u32) -> Self {
        Self {
            id,
            state: InstanceState::Ready,
            exit_code: None,
        }
    }

    pub fn stopped(id: u32, exit_code: Option<i32>) -> Self {
        Self {
            id,
            state: InstanceState::Stopped,
            exit_code,
        }
    }
}
