//! exit codes for rulebatch commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// invalid command-line arguments or unreadable input files
pub const INVALID_ARGS: i32 = 2;

/// configuration file error
pub const CONFIG_ERROR: i32 = 3;

/// rule table produced no rules or was rejected
pub const COMPILE_ERROR: i32 = 4;

/// at least one rule matched nothing (only with --fail-on-unmatched)
pub const NO_MATCH: i32 = 5;

/// at least one attribute write was not applied (only with --fail-on-issues)
pub const WRITE_ISSUES: i32 = 6;
