//! # Output Files
//!
//! Writes emitted artifacts and persisted plans, reads plans back.

use sigflow_core::{Artifact, CompiledPlan, MAX_PLAN_PAYLOAD_SIZE, SigflowError};
use std::path::{Path, PathBuf};

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Resolve an output directory, creating it if needed.
///
/// Returns the canonical path so artifact names cannot climb out of it.
pub fn validate_output_dir(dir: &Path) -> Result<PathBuf, SigflowError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        SigflowError::IoError(format!("Cannot create directory '{}': {e}", dir.display()))
    })?;
    let canonical = dir.canonicalize().map_err(|e| {
        SigflowError::IoError(format!("Invalid output directory '{}': {e}", dir.display()))
    })?;
    if !canonical.is_dir() {
        return Err(SigflowError::IoError(format!(
            "Output path '{}' is not a directory",
            dir.display()
        )));
    }
    Ok(canonical)
}

/// Resolve an output file: the parent must exist, the name is kept.
fn validate_output_file(path: &Path) -> Result<PathBuf, SigflowError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        SigflowError::IoError(format!(
            "Invalid output directory '{}': {e}",
            parent.display()
        ))
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| SigflowError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(file_name))
}

// =============================================================================
// ARTIFACTS
// =============================================================================

/// Write artifacts into `dir`, returning the written paths in order.
///
/// Artifact names must be plain file names.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>, SigflowError> {
    let dir = validate_output_dir(dir)?;
    let mut written = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let name = Path::new(&artifact.file_name);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(SigflowError::IoError(format!(
                "Artifact name '{}' is not a plain file name",
                artifact.file_name
            )));
        }
        let path = dir.join(name);
        std::fs::write(&path, &artifact.contents)
            .map_err(|e| SigflowError::IoError(format!("Write '{}': {e}", path.display())))?;
        tracing::debug!(path = %path.display(), bytes = artifact.contents.len(), "artifact written");
        written.push(path);
    }

    Ok(written)
}

// =============================================================================
// PLANS
// =============================================================================

/// Write raw plan bytes to `path`.
pub fn write_plan(path: &Path, data: &[u8]) -> Result<PathBuf, SigflowError> {
    let path = validate_output_file(path)?;
    std::fs::write(&path, data)
        .map_err(|e| SigflowError::IoError(format!("Write '{}': {e}", path.display())))?;
    Ok(path)
}

/// Read a binary plan written by `export -t binary`.
pub fn read_plan(path: &Path) -> Result<CompiledPlan, SigflowError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        SigflowError::IoError(format!("Cannot read plan '{}': {e}", path.display()))
    })?;
    if metadata.len() > MAX_PLAN_PAYLOAD_SIZE as u64 {
        return Err(SigflowError::SerializationError(format!(
            "Plan size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_PLAN_PAYLOAD_SIZE
        )));
    }
    let data =
        std::fs::read(path).map_err(|e| SigflowError::IoError(format!("Read plan: {e}")))?;
    sigflow_core::plan_from_bytes(&data)
}
