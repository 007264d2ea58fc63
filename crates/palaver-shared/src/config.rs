use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable windows for the rules layer.
///
/// The defaults are the canonical values; embedders override them mostly in
/// tests or when the host platform imposes its own ring timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    /// Seconds after the last keystroke during which a user counts as typing.
    pub typing_staleness_secs: i64,
    /// Hours for which group-leave records remain visible in group info.
    pub leave_retention_hours: i64,
    /// Seconds a call may stay in `ringing` before the sweep marks it missed.
    pub ring_timeout_secs: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_staleness_secs: constants::TYPING_STALENESS_SECS,
            leave_retention_hours: constants::GROUP_LEAVE_RETENTION_HOURS,
            ring_timeout_secs: constants::RING_TIMEOUT_SECS,
        }
    }
}
