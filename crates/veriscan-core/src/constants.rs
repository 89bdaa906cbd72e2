//! Shared constants.

/// Hard ceiling for a streaming status session, in seconds.
pub const MAX_STREAM_DURATION_SECS: u64 = 600;

/// Safety margin subtracted from the negotiated stream duration so the server
/// closes the session before any upstream proxy or host limit does.
pub const STREAM_SAFETY_MARGIN_SECS: u64 = 5;

/// Interval between status snapshots on a streaming session, in seconds.
pub const STREAM_TICK_SECS: u64 = 10;

/// Floor for the "exclude small matches" similarity setting. Values below the
/// floor are silently raised, never rejected.
pub const SMALL_MATCH_FLOOR: i32 = 8;

/// External-id prefix marking submissions created by the callback simulator.
/// The simulator only fabricates acceptance callbacks for ids carrying this
/// prefix, so a dev database pointed at a real remote never gets synthetic
/// acceptances for real submissions.
pub const SIMULATED_SUBMISSION_PREFIX: &str = "sim-";

/// Timeout for the webhook reachability probe (HEAD, then GET), in seconds.
pub const REACHABILITY_TIMEOUT_SECS: u64 = 10;
