// crates/revision-gate-cli/src/artifacts.rs
// ============================================================================
// Module: Run Directory Artifact IO
// Description: Write-once file sink and bounded reader for run directories.
// Purpose: Persist runpack artifacts atomically and read them back for checks.
// Dependencies: revision-gate-core, serde_jcs, tempfile
// ============================================================================

//! ## Overview
//! Every file is staged in a temporary file inside its target directory and
//! persisted with a no-clobber rename, so a file either appears complete or
//! not at all, and an existing file is never replaced. Artifact paths are
//! untrusted: absolute paths and `..` components are rejected, and resolved
//! paths must stay under the run directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use revision_gate_core::Artifact;
use revision_gate_core::ArtifactError;
use revision_gate_core::ArtifactReader;
use revision_gate_core::ArtifactRef;
use revision_gate_core::ArtifactSink;
use revision_gate_core::MANIFEST_FILE_NAME;
use revision_gate_core::RunpackManifest;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single path component to prevent path abuse.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length for run directories.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: File Artifact Sink
// ============================================================================

/// Write-once artifact sink rooted at one run directory.
#[derive(Debug)]
pub struct FileArtifactSink {
    /// Run directory.
    root: PathBuf,
}

impl FileArtifactSink {
    /// Creates a sink, creating the run directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the root path is invalid or cannot be created.
    pub fn new(root: PathBuf) -> Result<Self, ArtifactError> {
        validate_path(&root)?;
        fs::create_dir_all(&root)
            .map_err(|err| ArtifactError::Sink(format!("unable to create run directory: {err}")))?;
        Ok(Self {
            root,
        })
    }

    /// Run directory this sink writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes one file relative to the run directory, refusing to overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::AlreadyExists`] when the target exists and
    /// [`ArtifactError::Sink`] for any other failure.
    pub fn write_file(&self, relative: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let candidate = PathBuf::from(relative);
        ensure_relative_path(&candidate)?;
        let joined = self.root.join(&candidate);
        if let Some(parent) = joined.parent() {
            fs::create_dir_all(parent).map_err(|_| {
                ArtifactError::Sink("unable to create artifact directory".to_string())
            })?;
        }
        let path = resolve_path(&self.root, relative)?;
        persist_new(&path, bytes, relative)?;
        Ok(path)
    }
}

impl ArtifactSink for FileArtifactSink {
    fn write(&mut self, artifact: &Artifact) -> Result<ArtifactRef, ArtifactError> {
        let path = self.write_file(&artifact.path, &artifact.bytes)?;
        Ok(ArtifactRef {
            uri: path.to_string_lossy().to_string(),
        })
    }

    fn finalize(&mut self, manifest: &RunpackManifest) -> Result<ArtifactRef, ArtifactError> {
        let bytes =
            serde_jcs::to_vec(manifest).map_err(|err| ArtifactError::Sink(err.to_string()))?;
        let path = self.write_file(MANIFEST_FILE_NAME, &bytes)?;
        Ok(ArtifactRef {
            uri: path.to_string_lossy().to_string(),
        })
    }
}

// ============================================================================
// SECTION: File Artifact Reader
// ============================================================================

/// Bounded artifact reader rooted at one run directory.
#[derive(Debug, Clone)]
pub struct FileArtifactReader {
    /// Run directory.
    root: PathBuf,
}

impl FileArtifactReader {
    /// Creates a reader rooted at the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the root path is invalid.
    pub fn new(root: PathBuf) -> Result<Self, ArtifactError> {
        validate_path(&root)?;
        Ok(Self {
            root,
        })
    }
}

impl ArtifactReader for FileArtifactReader {
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError> {
        let resolved = resolve_path(&self.root, path)?;
        let file = fs::File::open(&resolved)
            .map_err(|_| ArtifactError::Sink(format!("unable to read artifact {path}")))?;
        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
        let mut bytes = Vec::new();
        file.take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|_| ArtifactError::Sink(format!("unable to read artifact {path}")))?;
        if bytes.len() > max_bytes {
            return Err(ArtifactError::TooLarge {
                path: path.to_string(),
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Stages bytes next to `path` and persists them without clobbering.
fn persist_new(path: &Path, bytes: &[u8], relative: &str) -> Result<(), ArtifactError> {
    let parent = path
        .parent()
        .ok_or_else(|| ArtifactError::Sink("artifact path missing parent".to_string()))?;
    if path.exists() {
        return Err(ArtifactError::AlreadyExists(relative.to_string()));
    }
    let mut staged = NamedTempFile::new_in(parent)
        .map_err(|_| ArtifactError::Sink("unable to stage artifact".to_string()))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|_| ArtifactError::Sink("unable to write artifact".to_string()))?;
    staged.persist_noclobber(path).map_err(|err| {
        if err.error.kind() == ErrorKind::AlreadyExists {
            ArtifactError::AlreadyExists(relative.to_string())
        } else {
            ArtifactError::Sink("unable to persist artifact".to_string())
        }
    })?;
    Ok(())
}

/// Resolves and validates an artifact path relative to a run directory.
fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, ArtifactError> {
    let candidate = PathBuf::from(relative);
    ensure_relative_path(&candidate)?;
    let root = root
        .canonicalize()
        .map_err(|_| ArtifactError::Sink("unable to resolve run directory".to_string()))?;
    let joined = root.join(&candidate);
    let parent = joined
        .parent()
        .ok_or_else(|| ArtifactError::Sink("artifact path missing parent".to_string()))?;
    let parent = parent
        .canonicalize()
        .map_err(|_| ArtifactError::Sink("unable to resolve artifact path".to_string()))?;
    if !parent.starts_with(&root) {
        return Err(ArtifactError::Sink("artifact path escapes run directory".to_string()));
    }
    let file_name = candidate
        .file_name()
        .ok_or_else(|| ArtifactError::Sink("artifact path missing filename".to_string()))?;
    Ok(parent.join(file_name))
}

/// Validates a run directory path against length constraints.
fn validate_path(path: &Path) -> Result<(), ArtifactError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ArtifactError::Sink("run directory path exceeds limit".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ArtifactError::Sink("run directory path component too long".to_string()));
        }
    }
    Ok(())
}

fn ensure_relative_path(candidate: &Path) -> Result<(), ArtifactError> {
    if candidate.is_absolute() {
        return Err(ArtifactError::Sink("absolute artifact path not allowed".to_string()));
    }
    for component in candidate.components() {
        match component {
            Component::ParentDir => {
                return Err(ArtifactError::Sink("artifact path escapes run directory".to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(ArtifactError::Sink("absolute artifact path not allowed".to_string()));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}
