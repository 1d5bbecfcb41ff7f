//! # Sigflow
//!
//! File-system side of the Sigflow compiler: manifests in, artifacts out.
//!
//! The compiler itself lives in `sigflow-core`; this crate only reads
//! functor manifests and writes what the core produces.

pub mod manifest;
pub mod output;

pub use manifest::{MAX_MANIFEST_SIZE, Manifest, ManifestFormat};
pub use output::{read_plan, validate_output_dir, write_artifacts, write_plan};
