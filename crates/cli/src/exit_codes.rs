//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                           |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error (unspecified)                           |
//! | 2    | CLI usage error (bad args)                            |
//! | 3    | I/O error (unreadable input, unwritable output)       |
//! | 4    | Schema error (missing field, arity, name collision)   |
//! | 5    | Invalid config, threshold or join mode                |
//! | 6    | `--strict`: required-source filter dropped rows       |

use rosterlink_io::IoError;
use rosterlink_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Table shapes do not fit the requested operation.
pub const EXIT_SCHEMA: u8 = 4;

/// Pipeline config failed to parse or validate, or a parameter is out of range.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Rows were dropped for missing a required source and `--strict` was given.
pub const EXIT_REQUIRED_DROPPED: u8 = 6;

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema(_) => EXIT_SCHEMA,
        ReconError::Configuration(_) | ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
            EXIT_INVALID_CONFIG
        }
        ReconError::MissingSource(_) => EXIT_ERROR,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::File { .. } | IoError::Csv(_) => EXIT_IO,
        IoError::Schema(_) | IoError::MissingHeader => EXIT_SCHEMA,
    }
}
