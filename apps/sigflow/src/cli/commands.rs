//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use sigflow::{Manifest, read_plan, write_artifacts, write_plan};
use sigflow_core::{
    CEmitter, CompiledPlan, Emitter, ExternalEvent, Functor, PassReport, ScheduleRunner,
    SigflowError, plan_checksum, plan_hash, plan_to_bytes,
};
use std::path::Path;

/// Event name selecting the `NoEvent` sentinel in `simulate`.
const NO_EVENT: &str = "none";

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate the manifest and summarize the plan.
pub fn cmd_check(manifest: &Path, allow_dangling: bool, json_mode: bool) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;
    print_summary(&plan, &manifest.display().to_string(), json_mode)
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// Show the layer table.
pub fn cmd_plan(manifest: &Path, allow_dangling: bool, json_mode: bool) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;

    if json_mode {
        let signals: Vec<_> = plan
            .signal_table()
            .map(|(name, slot)| serde_json::json!({ "name": name, "slot": slot.slot() }))
            .collect();
        let events: Vec<_> = plan
            .events()
            .map(|(id, functor)| serde_json::json!({ "event": id.index(), "functor": functor.name }))
            .collect();
        let output = serde_json::json!({
            "signals": signals,
            "events": events,
            "startup_layer": plan.startup_layer(),
            "layers": plan.layer_table(),
        });
        print_json(&output);
        return Ok(());
    }

    println!("Sigflow Plan");
    println!("============");
    println!();
    println!("Signals:");
    for (name, slot) in plan.signal_table() {
        println!("  [{:>3}] {}", slot.slot(), name);
    }
    println!();

    for (index, rows) in plan.layer_table().iter().enumerate() {
        if index == plan.startup_layer() {
            println!("Layer {index} (startup):");
        } else {
            println!("Layer {index}:");
        }
        for row in rows {
            let mut condition: Vec<String> = row.condition.iter().map(|s| s.to_string()).collect();
            if row.on_event {
                condition.push(format!("event {}", row.functor));
            }
            let condition = if condition.is_empty() {
                "never".to_string()
            } else {
                condition.join(" | ")
            };
            println!(
                "  {:<16} when {:<32} marks {}",
                row.functor,
                condition,
                row.marks.join(", ")
            );
        }
    }

    let externals = plan.external_inputs();
    if !externals.is_empty() {
        println!();
        println!("Environment inputs: {}", externals.join(", "));
    }

    Ok(())
}

// =============================================================================
// EMIT COMMAND
// =============================================================================

/// Generate C sources into a directory.
pub fn cmd_emit(
    manifest: &Path,
    allow_dangling: bool,
    output: &Path,
    storage_type: String,
) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;
    let emitter = CEmitter { storage_type };

    let artifacts = emitter.emit(&plan)?;
    let written = write_artifacts(output, &artifacts)?;

    tracing::info!(emitter = emitter.target(), files = written.len(), "artifacts emitted");
    for path in &written {
        println!("Wrote {:?}", path);
    }

    Ok(())
}

// =============================================================================
// SIMULATE COMMAND
// =============================================================================

/// Run startup, then one process pass per named event.
pub fn cmd_simulate(
    manifest: &Path,
    allow_dangling: bool,
    json_mode: bool,
    events: &[String],
) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;

    // Resolve every event before running anything
    let resolved = events
        .iter()
        .map(|name| {
            if name == NO_EVENT {
                Ok(ExternalEvent::NoEvent)
            } else {
                plan.event_for(name).map(ExternalEvent::Event)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let runner = ScheduleRunner::new(&plan);
    let mut host = |functor: &Functor| tracing::debug!(functor = %functor.name, "invoke");

    let mut passes = vec![(NO_EVENT, runner.startup(&mut host))];
    for (name, event) in events.iter().zip(resolved) {
        passes.push((name.as_str(), runner.process(event, &mut host)));
    }

    if json_mode {
        let output: Vec<_> = passes
            .iter()
            .map(|(name, report)| {
                serde_json::json!({
                    "mode": format!("{:?}", report.mode),
                    "event": name,
                    "fired": fired_names(&plan, report),
                    "changed": report
                        .flags
                        .changed_slots()
                        .into_iter()
                        .map(|s| plan.signal_name(s))
                        .collect::<Vec<_>>(),
                    "flag_words": report.flags.words(),
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(output));
        return Ok(());
    }

    for (name, report) in &passes {
        let fired = fired_names(&plan, report);
        println!(
            "{:?} [{}]: {}",
            report.mode,
            name,
            if fired.is_empty() {
                "-".to_string()
            } else {
                fired.join(", ")
            }
        );
    }

    Ok(())
}

fn fired_names<'p>(plan: &'p CompiledPlan, report: &PassReport) -> Vec<&'p str> {
    report
        .fired
        .iter()
        .map(|&id| plan.functor_name(id))
        .collect()
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the compiled plan.
pub fn cmd_export(
    manifest: &Path,
    allow_dangling: bool,
    output: &Path,
    format: &str,
) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;

    let data = match format {
        "binary" => {
            let data = plan_to_bytes(&plan)?;
            println!("Checksum: {}", plan_checksum(&plan)?);
            data
        }
        "json" => serde_json::to_vec_pretty(&plan)
            .map_err(|e| SigflowError::SerializationError(e.to_string()))?,
        _ => {
            return Err(SigflowError::SerializationError(format!(
                "Unknown format: {}. Use: binary, json",
                format
            )));
        }
    };

    let path = write_plan(output, &data)?;
    println!("Exported {} bytes to {:?}", data.len(), path);

    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Summarize a plan exported in binary format.
pub fn cmd_inspect(input: &Path, json_mode: bool) -> Result<(), SigflowError> {
    let plan = read_plan(input)?;
    print_summary(&plan, &input.display().to_string(), json_mode)
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Compute BLAKE3 cryptographic hash of the compiled plan.
pub fn cmd_hash(manifest: &Path, allow_dangling: bool, json_mode: bool) -> Result<(), SigflowError> {
    let plan = load_plan(manifest, allow_dangling)?;
    let hash = plan_hash(&plan)?;
    let checksum = plan_checksum(&plan)?;

    if json_mode {
        let output = serde_json::json!({
            "algorithm": "blake3",
            "hash": hash,
            "checksum": checksum,
        });
        print_json(&output);
        return Ok(());
    }

    println!("BLAKE3:   {}", hash);
    println!("Checksum: {}", checksum);

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load a manifest and compile it.
pub fn load_plan(manifest: &Path, allow_dangling: bool) -> Result<CompiledPlan, SigflowError> {
    let plan = Manifest::load(manifest)?.compile(allow_dangling)?;
    tracing::info!(
        functors = plan.functor_count(),
        signals = plan.signal_count(),
        layers = plan.layers().len(),
        "plan compiled"
    );
    Ok(plan)
}

fn print_summary(plan: &CompiledPlan, source: &str, json_mode: bool) -> Result<(), SigflowError> {
    let checksum = plan_checksum(plan)?;

    if json_mode {
        let output = serde_json::json!({
            "source": source,
            "functors": plan.functor_count(),
            "signals": plan.signal_count(),
            "events": plan.event_count(),
            "layers": plan.layers().len(),
            "storage_words": plan.storage_words(),
            "allow_dangling_inputs": plan.options().allow_dangling_inputs,
            "environment_inputs": plan.external_inputs(),
            "checksum": checksum,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Sigflow Plan Summary");
    println!("====================");
    println!("Source:   {}", source);
    println!();
    println!("Functors:      {}", plan.functor_count());
    println!("Signals:       {}", plan.signal_count());
    println!("Events:        {}", plan.event_count());
    println!("Layers:        {}", plan.layers().len());
    println!("Storage Words: {}", plan.storage_words());
    let externals = plan.external_inputs();
    if !externals.is_empty() {
        println!("Environment:   {}", externals.join(", "));
    }
    println!("Checksum:      {}", checksum);

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}
