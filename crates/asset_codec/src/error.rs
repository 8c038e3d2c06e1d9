//! Fatal codec errors
//!
//! Anything that stops a run lives here. Conditions the export can continue
//! past are [`ExportWarning`](crate::report::ExportWarning)s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a parse, scan, generation or weld run
#[derive(Error, Debug)]
pub enum CodecError {
    /// IO error while reading scripts or meshes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a specific file
    #[error("Failed to read {path:?}: {source}")]
    File {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A pass body whose braces cannot be balanced
    #[error("{url}: brace mismatch in pass '{pass}' of material '{material}' ({opened} opened, {closed} closed)")]
    BraceMismatch {
        /// Script the pass belongs to
        url: String,
        /// Material name
        material: String,
        /// Pass name
        pass: String,
        /// Number of `{` in the body
        opened: usize,
        /// Number of `}` in the body
        closed: usize,
    },

    /// A top-level block that never closes
    #[error("{url}: unterminated block starting at line {line}")]
    UnterminatedBlock {
        /// Script path
        url: String,
        /// 1-based line of the block header
        line: usize,
    },

    /// A closing brace with nothing open
    #[error("{url}: unexpected '}}' at line {line}")]
    UnexpectedClose {
        /// Script path
        url: String,
        /// 1-based line
        line: usize,
    },

    /// Malformed `material` header line
    #[error("{url}: malformed material header at line {line}: '{text}'")]
    MalformedHeader {
        /// Script path
        url: String,
        /// 1-based line
        line: usize,
        /// Offending header text
        text: String,
    },

    /// Geometry input that violates the soup contract
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Malformed OBJ input
    #[error("OBJ parse error at line {line}: {message}")]
    Obj {
        /// 1-based line
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Output formatting failure
    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Result alias used across the codec
pub type CodecResult<T> = Result<T, CodecError>;
