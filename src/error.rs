//! Closed set of error kinds shared by every component of the crate.
//!
//! Every fallible public function returns `Result<T, EsaError>`. Recoverable
//! failures surface as a first-failure return; callers are responsible for
//! dropping whatever scoped resources they hold (mmaps, open files), which
//! happens automatically via `Drop` on the owning handles.

use std::io;
use thiserror::Error;

/// The closed set of error kinds produced by this crate.
#[derive(Error, Debug)]
pub enum EsaError {
    #[error("bad manifest at {path}:{line}:{column}: {message}")]
    BadManifest {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("index incompatible: {0}")]
    IndexIncompatible(String),

    #[error("missing table: {0}")]
    MissingTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad alphabet: {0}")]
    BadAlphabet(String),

    #[error("symbol {0} already mapped")]
    AlreadyMapped(u8),

    #[error("position {pos} out of bounds (length {len})")]
    BadPosition { pos: u64, len: u64 },

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("overflow: {0}")]
    Overflow(String),

    #[error("programming error (assertion violated): {0}")]
    ProgrammingError(String),
}

pub type Result<T> = std::result::Result<T, EsaError>;
