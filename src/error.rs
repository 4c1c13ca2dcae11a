use std::io;

use thiserror::Error;

/// Failures surfaced by the trace decoder, page writer and page reader.
///
/// Only `Io` is fatal to a run. `Field` is absorbed by the decoder (the record
/// is skipped) and `Format` only comes out of the normalized-output reader.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot read field `{field}` at offset {offset} (width {width}) from a {len}-byte header")]
    Field {
        field: &'static str,
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, TraceError>;
