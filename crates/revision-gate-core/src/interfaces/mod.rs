// crates/revision-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Revision Gate Interfaces
// Description: Seams between the pure core and its I/O collaborators.
// Purpose: Define how documents are decoded/encoded and how artifacts are stored.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The core never touches the filesystem. Hosts plug in a [`DocumentCodec`]
//! for the document format and an [`ArtifactSink`] / [`ArtifactReader`] pair
//! for run outputs. Implementations must fail closed: a read that cannot be
//! completed is an error, never an empty payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ArtifactKind;
use crate::core::Document;
use crate::core::RunpackManifest;

// ============================================================================
// SECTION: Document Codec
// ============================================================================

/// Document codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input could not be parsed; fatal to the run.
    #[error("document parse error: {0}")]
    Parse(String),
    /// Document could not be serialized.
    #[error("document write error: {0}")]
    Write(String),
}

/// Converts between a document file format and the core document tree.
pub trait DocumentCodec {
    /// Parses document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Parse`] when the bytes are not a readable document.
    fn decode(&self, bytes: &[u8]) -> Result<Document, CodecError>;

    /// Serializes a document, reusing `original` for every part the tree
    /// does not model.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Write`] when serialization fails.
    fn encode(&self, original: &[u8], document: &Document) -> Result<Vec<u8>, CodecError>;
}

// ============================================================================
// SECTION: Artifact Sink / Reader
// ============================================================================

/// Artifact payload written into a runpack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Runpack-relative path.
    pub path: String,
    /// Media type.
    pub content_type: String,
    /// Artifact bytes.
    pub bytes: Vec<u8>,
    /// Whether verification requires the artifact.
    pub required: bool,
}

/// Location of a written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Runpack-relative path or absolute URI.
    pub uri: String,
}

/// Artifact storage errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Storage reported an error.
    #[error("artifact error: {0}")]
    Sink(String),
    /// Target already exists; run outputs are write-once.
    #[error("artifact already exists: {0}")]
    AlreadyExists(String),
    /// Artifact exceeds a read limit.
    #[error("artifact too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Artifact path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
}

/// Write-once artifact storage for one runpack.
pub trait ArtifactSink {
    /// Writes an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when writing fails or the path already exists.
    fn write(&mut self, artifact: &Artifact) -> Result<ArtifactRef, ArtifactError>;

    /// Writes the manifest, closing the runpack.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when writing the manifest fails.
    fn finalize(&mut self, manifest: &RunpackManifest) -> Result<ArtifactRef, ArtifactError>;
}

/// Artifact reader for verification.
pub trait ArtifactReader {
    /// Reads artifact bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when reading fails.
    fn read(&self, path: &str) -> Result<Vec<u8>, ArtifactError> {
        self.read_with_limit(path, usize::MAX)
    }

    /// Reads artifact bytes, refusing payloads larger than `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when reading fails or the artifact is too large.
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError>;
}
