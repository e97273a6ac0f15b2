/// Rows kept from a result set before the rest is summarized as truncated.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 100;

/// Sample rows appended to each table in the schema description.
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

/// Seconds to wait for a database to accept a connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
