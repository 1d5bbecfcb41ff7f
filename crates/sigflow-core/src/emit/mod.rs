//! # Emission Interface
//!
//! Emitters render a [`CompiledPlan`] into target artifacts (source code,
//! configuration, documentation).
//!
//! The plan handed to an emitter is fully resolved and validated; emitters
//! perform no graph validation of their own. They may still reject names
//! their target cannot express.

mod c;

pub use c::CEmitter;

use crate::{CompiledPlan, SigflowError};
use serde::{Deserialize, Serialize};

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// File name, relative to the output directory.
    pub file_name: String,
    /// File contents.
    pub contents: String,
}

impl Artifact {
    /// Create an artifact.
    #[must_use]
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

/// The Emitter trait defines the boundary between the CORE and its targets.
///
/// Implementors are pure: they turn a plan into artifacts and never touch
/// the file system. Writing artifacts out is the caller's concern.
pub trait Emitter {
    /// Short name of the target, for diagnostics.
    fn target(&self) -> &'static str;

    /// Render the plan.
    fn emit(&self, plan: &CompiledPlan) -> Result<Vec<Artifact>, SigflowError>;
}
