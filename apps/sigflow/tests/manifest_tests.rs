//! Integration tests for manifest loading and file output.

use sigflow::{Manifest, read_plan, validate_output_dir, write_artifacts, write_plan};
use sigflow_core::{
    Artifact, CEmitter, Emitter, ExternalEvent, Functor, ScheduleRunner, SigflowError,
    plan_to_bytes,
};
use std::path::Path;

const EXAMPLE_TOML: &str = r#"
[compiler]
allow_dangling_inputs = false

[[functor]]
name = "a"
provides = ["a"]
pure = false

[[functor]]
name = "tick"
provides = ["tick"]
pure = false

[[functor]]
name = "ef"
consumes = ["a"]
provides = ["e", "f"]

[[functor]]
name = "g"
consumes = ["a"]
provides = ["g"]

[[functor]]
name = "h"
consumes = ["g"]
provides = ["h"]

[[functor]]
name = "i"
consumes = ["h", "f"]
provides = ["i"]
"#;

fn write_manifest(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write manifest");
    path
}

// =============================================================================
// MANIFEST LOADING
// =============================================================================

#[test]
fn toml_manifest_compiles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(dir.path(), "graph.toml", EXAMPLE_TOML);

    let manifest = Manifest::load(&path).expect("load");
    assert_eq!(manifest.functors.len(), 6);
    assert!(!manifest.functors[0].pure);
    assert!(manifest.functors[2].pure);

    let plan = manifest.compile(false).expect("compile");
    assert_eq!(plan.layers().len(), 4);
    assert_eq!(plan.event_count(), 2);
}

#[test]
fn json_manifest_selected_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(
        dir.path(),
        "graph.json",
        r#"{
            "compiler": { "allow_dangling_inputs": true },
            "functor": [
                { "name": "mix", "consumes": ["env"], "provides": ["m"] }
            ]
        }"#,
    );

    let manifest = Manifest::load(&path).expect("load");
    assert!(manifest.compiler.allow_dangling_inputs);

    let plan = manifest.compile(false).expect("compile");
    assert_eq!(plan.external_inputs(), vec!["env"]);
}

#[test]
fn allow_dangling_flag_overrides_strict_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(
        dir.path(),
        "graph.toml",
        "[[functor]]\nname = \"mix\"\nconsumes = [\"env\"]\nprovides = [\"m\"]\n",
    );
    let manifest = Manifest::load(&path).expect("load");

    assert!(matches!(
        manifest.compile(false),
        Err(SigflowError::DanglingDependency { .. })
    ));
    assert!(manifest.compile(true).is_ok());
}

#[test]
fn missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = Manifest::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(SigflowError::IoError(_))));
}

#[test]
fn directory_is_not_a_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        Manifest::load(dir.path()),
        Err(SigflowError::IoError(_))
    ));
}

#[test]
fn malformed_manifest_is_serialization_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(dir.path(), "graph.toml", "[[functor]]\nprovides = 3\n");
    assert!(matches!(
        Manifest::load(&path),
        Err(SigflowError::SerializationError(_))
    ));
}

// =============================================================================
// EMISSION
// =============================================================================

#[test]
fn emitted_sources_written_to_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = Manifest::parse(EXAMPLE_TOML, sigflow::ManifestFormat::Toml)
        .expect("parse")
        .compile(false)
        .expect("compile");

    let artifacts = CEmitter::default().emit(&plan).expect("emit");
    let out = dir.path().join("generated");
    let written = write_artifacts(&out, &artifacts).expect("write");

    assert_eq!(written.len(), artifacts.len());
    for path in &written {
        assert!(path.is_file(), "{path:?}");
    }

    let eval = std::fs::read_to_string(out.join("functor_eval.c")).expect("read");
    assert!(eval.contains("void process_layers(external_event_t event)"));
    assert!(eval.contains("static void process_layer_3(pass_context_t *ctx)"));

    let header = std::fs::read_to_string(out.join("functor_eval.h")).expect("read");
    assert!(header.contains("enEvent_a,"));
    assert!(header.contains("enEvent_INVALID,"));
}

#[test]
fn artifact_names_cannot_escape_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = write_artifacts(dir.path(), &[Artifact::new("../escape.c", "")]);
    assert!(matches!(result, Err(SigflowError::IoError(_))));
    assert!(!dir.path().join("..").join("escape.c").exists());
}

#[test]
fn output_dir_created_on_demand() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("a").join("b");
    let resolved = validate_output_dir(&nested).expect("create");
    assert!(resolved.is_dir());
}

// =============================================================================
// PLAN FILES
// =============================================================================

#[test]
fn exported_plan_reads_back_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = Manifest::parse(EXAMPLE_TOML, sigflow::ManifestFormat::Toml)
        .expect("parse")
        .compile(false)
        .expect("compile");

    let bytes = plan_to_bytes(&plan).expect("serialize");
    let path = write_plan(&dir.path().join("plan.sgfl"), &bytes).expect("write");
    let restored = read_plan(&path).expect("read");
    assert_eq!(restored, plan);

    // The restored plan drives the same passes
    let event = ExternalEvent::Event(restored.event_for("a").expect("event"));
    let report = ScheduleRunner::new(&restored).process(event, &mut |_: &Functor| {});
    assert_eq!(report.fired.len(), 5);
}

#[test]
fn corrupted_plan_file_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plan.sgfl");
    std::fs::write(&path, b"SGFL\x01garbage").expect("write");
    assert!(matches!(
        read_plan(&path),
        Err(SigflowError::SerializationError(_))
    ));
}
