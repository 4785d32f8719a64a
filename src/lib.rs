pub mod archive;
pub mod config;
pub mod flatten;
pub mod output;
pub mod twitter;
pub mod window;

/// Page size requested from the search endpoint.
pub const MAX_RESULTS: u32 = 500;

/// Records fetched per window before pagination stops.
pub const MAX_PER_WINDOW: usize = 100;

/// Pause after every page, in seconds.
pub const DEFAULT_WAIT_SECS: u64 = 2;

/// The archive lags real time; never ask for anything newer than this.
pub const SAFETY_MARGIN_HOURS: i64 = 1;

/// Placeholder for reply columns on tweets that aren't replies.
pub const NOT_APPLICABLE: &str = "NA";
