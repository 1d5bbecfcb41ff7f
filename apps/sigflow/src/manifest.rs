//! # Functor Manifests
//!
//! A manifest lists the functors of one graph plus compiler settings:
//!
//! ```toml
//! [compiler]
//! allow_dangling_inputs = false
//!
//! [[functor]]
//! name = "tick"
//! provides = ["tick"]
//! pure = false
//!
//! [[functor]]
//! name = "blink"
//! consumes = ["tick"]
//! provides = ["led"]
//! ```
//!
//! Files ending in `.json` are read as JSON with the same shape; anything
//! else is read as TOML.

use serde::{Deserialize, Serialize};
use sigflow_core::{CompileOptions, CompiledPlan, Compiler, FunctorDecl, SigflowError};
use std::path::Path;

/// Maximum manifest file size (16 MB).
///
/// Checked against file metadata before reading.
pub const MAX_MANIFEST_SIZE: u64 = 16 * 1024 * 1024;

/// Serialization of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// A parsed functor manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Compiler settings.
    #[serde(default)]
    pub compiler: CompileOptions,

    /// Functor declarations, in declaration order.
    #[serde(default, rename = "functor")]
    pub functors: Vec<FunctorDecl>,
}

impl Manifest {
    /// Parse manifest text in the given format.
    pub fn parse(text: &str, format: ManifestFormat) -> Result<Self, SigflowError> {
        match format {
            ManifestFormat::Toml => toml::from_str(text)
                .map_err(|e| SigflowError::SerializationError(format!("Invalid manifest: {e}"))),
            ManifestFormat::Json => serde_json::from_str(text)
                .map_err(|e| SigflowError::SerializationError(format!("Invalid manifest: {e}"))),
        }
    }

    /// Load a manifest file, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, SigflowError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SigflowError::IoError(format!("Cannot read manifest '{}': {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(SigflowError::IoError(format!(
                "Manifest '{}' is not a regular file",
                path.display()
            )));
        }
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(SigflowError::SerializationError(format!(
                "Manifest size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_MANIFEST_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| SigflowError::IoError(format!("Read manifest: {e}")))?;

        let manifest = Self::parse(&text, ManifestFormat::from_path(path))?;
        tracing::debug!(
            path = %path.display(),
            functors = manifest.functors.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Effective compiler options, with `allow_dangling` forcing dangling
    /// inputs on.
    #[must_use]
    pub fn options(&self, allow_dangling: bool) -> CompileOptions {
        CompileOptions {
            allow_dangling_inputs: self.compiler.allow_dangling_inputs || allow_dangling,
        }
    }

    /// Compile the manifest's functors.
    pub fn compile(&self, allow_dangling: bool) -> Result<CompiledPlan, SigflowError> {
        Compiler::with_options(self.options(allow_dangling)).compile(&self.functors)
    }
}

// =============================================================================
// TESTS
// =============================================================================
