/// Application name
pub const APP_NAME: &str = "Palaver";

/// How long a typing flag stays fresh after the last keystroke, in seconds.
/// A `true` flag older than this window is never reported as typing.
pub const TYPING_STALENESS_SECS: i64 = 5;

/// Rolling window for which group-leave records are surfaced, in hours.
pub const GROUP_LEAVE_RETENTION_HOURS: i64 = 24;

/// How long a call may ring before the missed-call sweep expires it,
/// in seconds.
pub const RING_TIMEOUT_SECS: i64 = 30;

/// Preview text used for image/file/audio messages in conversation lists.
pub const NON_TEXT_PREVIEW: &str = "[Non-text]";

/// Capacity of the change-event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
