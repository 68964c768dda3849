//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (empty source, malformed documents)
pub const DATAERR: i32 = 65;

/// Source file does not exist
pub const NOINPUT: i32 = 66;

/// Parser service unavailable or returned an error
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure (timeout, cancelled, busy)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
