// crates/revision-gate-docx/src/error.rs
// ============================================================================
// Module: DOCX Codec Errors
// Description: Failure modes of reading and writing `.docx` packages.
// Purpose: Keep package, XML, and structure failures distinguishable.
// Dependencies: revision-gate-core, thiserror
// ============================================================================

//! ## Overview
//! Every error here is fatal to the run that hit it: a document that cannot
//! be parsed or written is never partially revised.

use revision_gate_core::CodecError;
use thiserror::Error;

/// `.docx` codec errors.
#[derive(Debug, Error)]
pub enum DocxError {
    /// Zip container could not be read or written.
    #[error("docx package error: {0}")]
    Package(String),
    /// Required part is absent.
    #[error("docx package has no {0} part")]
    MissingPart(String),
    /// Part exceeds the configured size limit.
    #[error("docx part {part} exceeds {max_bytes} bytes")]
    PartTooLarge {
        /// Part name.
        part: String,
        /// Configured limit.
        max_bytes: usize,
    },
    /// Part is not well-formed XML.
    #[error("invalid xml in {part}: {message}")]
    Xml {
        /// Part name.
        part: String,
        /// Parser message.
        message: String,
    },
    /// Part binds WordprocessingML to a prefix other than `w`.
    #[error("{part} binds WordprocessingML to prefix `{prefix}`; only `w` is supported")]
    UnsupportedPrefix {
        /// Part name.
        part: String,
        /// Prefix found; empty for the default namespace.
        prefix: String,
    },
    /// Part is well-formed but not shaped as expected.
    #[error("unexpected structure in {part}: {message}")]
    Structure {
        /// Part name.
        part: String,
        /// What was unexpected.
        message: String,
    },
}

impl DocxError {
    /// Creates a structure error for a part.
    pub(crate) fn structure(part: &str, message: impl Into<String>) -> Self {
        Self::Structure {
            part: part.to_string(),
            message: message.into(),
        }
    }
}

/// Wraps a read-side failure.
pub(crate) fn parse_error(err: DocxError) -> CodecError {
    CodecError::Parse(err.to_string())
}

/// Wraps a write-side failure.
pub(crate) fn write_error(err: DocxError) -> CodecError {
    CodecError::Write(err.to_string())
}
