//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args; emitted by clap)              |
//! | 3    | Catalogue invalid (parse error, schema violation)    |
//! | 4    | Report settings invalid                              |
//! | 5    | I/O failure (unreadable input, unwritable artifact)  |
//! | 6    | `explain`: unknown source id or class code           |
//!
//! No artifact is written when a run exits non-zero.

use croptaxa_recon::TaxonomyError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code itself; listed for completeness.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Catalogue failed to parse or violates the hierarchy/registry invariants.
pub const EXIT_CATALOGUE_INVALID: u8 = 3;

/// Report settings failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 4;

/// Reading an input or writing the artifact failed.
pub const EXIT_IO: u8 = 5;

/// `explain` was given a source id or class code the catalogue lacks.
pub const EXIT_UNKNOWN_ENTRY: u8 = 6;

/// Map an engine error to its exit code.
pub fn taxonomy_exit_code(err: &TaxonomyError) -> u8 {
    match err {
        e if e.is_catalogue_error() => EXIT_CATALOGUE_INVALID,
        TaxonomyError::ConfigParse(_) | TaxonomyError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        TaxonomyError::Io(_) => EXIT_IO,
        _ => EXIT_ERROR,
    }
}
