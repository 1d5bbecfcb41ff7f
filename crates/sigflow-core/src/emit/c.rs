//! C target: renders a plan as a header/source pair for an embedded loop.
//!
//! Generated files:
//! - `functor_header.h`: one prototype per scheduled functor
//! - `functor_impl_template.c`: printf stubs to copy and fill in
//! - `functor_eval.h`: event enum, slot defines, signal storage, entry points
//! - `functor_eval.c`: layer functions, `process_layers()`, `startup()`
//! - `bitfield.h`: change-flag bit macros
//!
//! Pass state lives in a `pass_context_t` on the stack of each entry point,
//! so the generated code keeps no mutable state between passes apart from
//! signal storage.

use super::{Artifact, Emitter};
use crate::primitives::STARTUP_LAYER;
use crate::{CompiledPlan, Functor, Input, SigflowError};
use std::fmt::Write;

const HEADER_FILE: &str = "functor_header.h";
const IMPL_FILE: &str = "functor_impl_template.c";
const EVAL_HEADER_FILE: &str = "functor_eval.h";
const EVAL_SOURCE_FILE: &str = "functor_eval.c";
const BITFIELD_FILE: &str = "bitfield.h";

/// Suffix of the `NoEvent` sentinel in the event enum (`enEvent_INVALID`).
const SENTINEL_EVENT: &str = "INVALID";

/// C99/C11 keywords. Signal names become parameter names, so none of these
/// may appear as a functor, signal or environment input name.
const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

const BITFIELD_H: &str = "\
#ifndef bitfield_h
#define bitfield_h

#define BITFIELD_DECL(t, name, count) t name[((count) / (sizeof(t) * 8)) + 1]

#define bitfield_bits(bf) (sizeof((bf)[0]) * 8)
#define bitfield_pos(bf, n) ((n) / bitfield_bits(bf))
#define bitfield_bit(bf, n) ((n) % bitfield_bits(bf))

#define bitfield_get(bf, n) ((((bf)[bitfield_pos(bf, n)]) >> bitfield_bit(bf, n)) & 1u)
#define bitfield_set(bf, n) ((bf)[bitfield_pos(bf, n)] |= (1u << bitfield_bit(bf, n)))

#endif
";

/// Emits C sources for the compiled schedule.
#[derive(Debug, Clone)]
pub struct CEmitter {
    /// C type of every signal's storage.
    pub storage_type: String,
}

impl Default for CEmitter {
    fn default() -> Self {
        Self {
            storage_type: "uint8_t".to_string(),
        }
    }
}

impl Emitter for CEmitter {
    fn target(&self) -> &'static str {
        "c"
    }

    fn emit(&self, plan: &CompiledPlan) -> Result<Vec<Artifact>, SigflowError> {
        check_identifiers(plan)?;
        // The storage type may be a keyword type such as `int`
        check_identifier(&self.storage_type)?;

        Ok(vec![
            Artifact::new(HEADER_FILE, self.functor_header(plan)),
            Artifact::new(IMPL_FILE, self.functor_impl(plan)),
            Artifact::new(EVAL_HEADER_FILE, self.eval_header(plan)),
            Artifact::new(EVAL_SOURCE_FILE, self.eval_source(plan)),
            Artifact::new(BITFIELD_FILE, BITFIELD_H),
        ])
    }
}

impl CEmitter {
    fn signature(&self, plan: &CompiledPlan, functor: &Functor) -> String {
        if functor.consumes.is_empty() {
            return "void".to_string();
        }
        functor
            .consumes
            .iter()
            .map(|input| format!("{} {}", self.storage_type, input_name(plan, input)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn functor_header(&self, plan: &CompiledPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#ifndef functor_header_h");
        let _ = writeln!(out, "#define functor_header_h");
        let _ = writeln!(out);
        let _ = writeln!(out, "#include <stdint.h>");
        let _ = writeln!(out);
        for functor in scheduled(plan) {
            let _ = writeln!(
                out,
                "void evaluate_functor_{}({});",
                functor.name,
                self.signature(plan, functor)
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "#endif");
        out
    }

    fn functor_impl(&self, plan: &CompiledPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#include <stdio.h>");
        let _ = writeln!(out, "#include \"{HEADER_FILE}\"");
        let _ = writeln!(out, "#include \"{EVAL_HEADER_FILE}\"");
        for functor in scheduled(plan) {
            let args: Vec<&str> = functor
                .consumes
                .iter()
                .map(|input| input_name(plan, input))
                .collect();
            let fmt = args.iter().map(|_| " %d").collect::<String>();
            let vals = args.iter().map(|a| format!(", {a}")).collect::<String>();

            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "void evaluate_functor_{}({})",
                functor.name,
                self.signature(plan, functor)
            );
            let _ = writeln!(out, "{{");
            let _ = writeln!(
                out,
                "    printf(\"evaluating functor {}{}\\n\"{});",
                functor.name, fmt, vals
            );
            let _ = writeln!(out, "}}");
        }
        out
    }

    fn eval_header(&self, plan: &CompiledPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#ifndef functor_eval_h");
        let _ = writeln!(out, "#define functor_eval_h");
        let _ = writeln!(out);
        let _ = writeln!(out, "#include <stdint.h>");
        let _ = writeln!(out);

        let _ = writeln!(out, "typedef enum {{");
        for (_, functor) in plan.events() {
            let _ = writeln!(out, "    enEvent_{},", functor.name);
        }
        let _ = writeln!(out, "    enEvent_{SENTINEL_EVENT},");
        let _ = writeln!(out, "}} external_event_t;");
        let _ = writeln!(out);

        let _ = writeln!(out, "#define SIGNAL_COUNT {}", plan.signal_count());
        let _ = writeln!(out);
        for (name, slot) in plan.signal_table() {
            let _ = writeln!(out, "#define nSignal_{} {}", name, slot.slot());
            let _ = writeln!(out, "extern {} storageSignal_{};", self.storage_type, name);
        }

        let externals = plan.external_inputs();
        if !externals.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "/* Environment inputs: no producer, never marked changed. */");
            for name in externals {
                let _ = writeln!(out, "extern {} storageSignal_{};", self.storage_type, name);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "void process_layers(external_event_t event);");
        let _ = writeln!(out, "void startup(void);");
        let _ = writeln!(out);
        let _ = writeln!(out, "#endif");
        out
    }

    fn eval_source(&self, plan: &CompiledPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#include <string.h>");
        let _ = writeln!(out, "#include \"{EVAL_HEADER_FILE}\"");
        let _ = writeln!(out, "#include \"{HEADER_FILE}\"");
        let _ = writeln!(out, "#include \"{BITFIELD_FILE}\"");
        let _ = writeln!(out);
        let _ = writeln!(out, "typedef struct {{");
        let _ = writeln!(out, "    external_event_t event;");
        let _ = writeln!(out, "    BITFIELD_DECL(uint32_t, signal_changed, SIGNAL_COUNT);");
        let _ = writeln!(out, "}} pass_context_t;");
        let _ = writeln!(out);

        for (name, _) in plan.signal_table() {
            let _ = writeln!(out, "{} storageSignal_{} = 0;", self.storage_type, name);
        }
        let _ = writeln!(out);

        for layer in plan.layers() {
            let _ = writeln!(
                out,
                "static void process_layer_{}(pass_context_t *ctx);",
                layer.index
            );
        }

        for layer in plan.layers() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "static void process_layer_{}(pass_context_t *ctx)",
                layer.index
            );
            let _ = writeln!(out, "{{");
            for step in &layer.steps {
                let Some(functor) = plan.functor(step.functor) else {
                    continue;
                };
                let mut terms: Vec<String> = step
                    .trigger
                    .changed
                    .iter()
                    .map(|&s| {
                        format!(
                            "bitfield_get(ctx->signal_changed, nSignal_{})",
                            plan.signal_name(s)
                        )
                    })
                    .collect();
                if step.trigger.event.is_some() {
                    terms.push(format!("ctx->event == enEvent_{}", functor.name));
                }
                let condition = if terms.is_empty() {
                    "0".to_string()
                } else {
                    terms.join(" || ")
                };

                let _ = writeln!(out, "    if ({condition}) {{");
                let _ = writeln!(
                    out,
                    "        evaluate_functor_{}({});",
                    functor.name,
                    bindings(plan, functor)
                );
                for &signal in &step.marks {
                    let _ = writeln!(
                        out,
                        "        bitfield_set(ctx->signal_changed, nSignal_{});",
                        plan.signal_name(signal)
                    );
                }
                let _ = writeln!(out, "    }}");
            }
            let _ = writeln!(out, "}}");
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "void process_layers(external_event_t event)");
        let _ = writeln!(out, "{{");
        let _ = writeln!(out, "    pass_context_t ctx;");
        let _ = writeln!(out, "    memset(&ctx, 0, sizeof(ctx));");
        let _ = writeln!(out, "    ctx.event = event;");
        for layer in plan.layers() {
            let _ = writeln!(out, "    process_layer_{}(&ctx);", layer.index);
        }
        let _ = writeln!(out, "}}");

        let _ = writeln!(out);
        let _ = writeln!(out, "void startup(void)");
        let _ = writeln!(out, "{{");
        let _ = writeln!(out, "    pass_context_t ctx;");
        let _ = writeln!(out, "    memset(&ctx, 0, sizeof(ctx));");
        let _ = writeln!(out, "    ctx.event = enEvent_{SENTINEL_EVENT};");
        for layer in plan.layers() {
            if layer.index == STARTUP_LAYER {
                for step in &layer.steps {
                    let Some(functor) = plan.functor(step.functor) else {
                        continue;
                    };
                    let _ = writeln!(
                        out,
                        "    evaluate_functor_{}({});",
                        functor.name,
                        bindings(plan, functor)
                    );
                    for &signal in &step.marks {
                        let _ = writeln!(
                            out,
                            "    bitfield_set(ctx.signal_changed, nSignal_{});",
                            plan.signal_name(signal)
                        );
                    }
                }
            } else {
                let _ = writeln!(out, "    process_layer_{}(&ctx);", layer.index);
            }
        }
        let _ = writeln!(out, "}}");
        out
    }
}

fn scheduled(plan: &CompiledPlan) -> impl Iterator<Item = &Functor> {
    plan.functors().iter().filter(|f| f.is_schedulable())
}

fn input_name<'p>(plan: &'p CompiledPlan, input: &'p Input) -> &'p str {
    match input {
        Input::Signal(signal) => plan.signal_name(*signal),
        Input::External(name) => name.as_str(),
    }
}

fn bindings(plan: &CompiledPlan, functor: &Functor) -> String {
    functor
        .consumes
        .iter()
        .map(|input| format!("storageSignal_{}", input_name(plan, input)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_identifiers(plan: &CompiledPlan) -> Result<(), SigflowError> {
    for functor in plan.functors() {
        check_name(&functor.name)?;
    }
    for (_, functor) in plan.events() {
        if functor.name == SENTINEL_EVENT {
            return Err(SigflowError::EmitError(format!(
                "impure functor {:?} collides with the enEvent_{SENTINEL_EVENT} sentinel",
                functor.name
            )));
        }
    }
    for (name, _) in plan.signal_table() {
        check_name(name)?;
    }
    for name in plan.external_inputs() {
        check_name(name)?;
    }
    Ok(())
}

/// A user name: a C identifier that is not a keyword.
fn check_name(name: &str) -> Result<(), SigflowError> {
    check_identifier(name)?;
    if C_KEYWORDS.contains(&name) {
        return Err(SigflowError::EmitError(format!(
            "{name:?} is a C keyword"
        )));
    }
    Ok(())
}

fn check_identifier(name: &str) -> Result<(), SigflowError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SigflowError::EmitError(format!(
            "{name:?} is not a valid C identifier"
        )))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Compiler, FunctorDecl};

    fn emit(decls: &[FunctorDecl]) -> Vec<Artifact> {
        let plan = Compiler::permissive().compile(decls).expect("compile");
        CEmitter::default().emit(&plan).expect("emit")
    }

    fn file<'a>(artifacts: &'a [Artifact], name: &str) -> &'a str {
        artifacts
            .iter()
            .find(|a| a.file_name == name)
            .map(|a| a.contents.as_str())
            .unwrap_or_default()
    }

    #[test]
    fn emits_all_files() {
        let artifacts = emit(&[FunctorDecl::impure("a", &[], &["a"])]);
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![HEADER_FILE, IMPL_FILE, EVAL_HEADER_FILE, EVAL_SOURCE_FILE, BITFIELD_FILE]
        );
    }

    #[test]
    fn event_enum_lists_impure_functors_then_sentinel() {
        let artifacts = emit(&[
            FunctorDecl::impure("a", &[], &["a"]),
            FunctorDecl::pure("g", &["a"], &["g"]),
            FunctorDecl::impure("tick", &[], &["tick"]),
        ]);
        let header = file(&artifacts, EVAL_HEADER_FILE);

        let a = header.find("enEvent_a,").expect("a");
        let tick = header.find("enEvent_tick,").expect("tick");
        let invalid = header.find("enEvent_INVALID,").expect("sentinel");
        assert!(a < tick && tick < invalid);
        assert!(!header.contains("enEvent_g"));
        assert!(header.contains("#define nSignal_g 1"));
    }

    #[test]
    fn layer_condition_combines_inputs_and_event() {
        let artifacts = emit(&[
            FunctorDecl::impure("a", &[], &["a"]),
            FunctorDecl::impure("s", &["a"], &["s"]),
        ]);
        let source = file(&artifacts, EVAL_SOURCE_FILE);

        assert!(source.contains(
            "if (bitfield_get(ctx->signal_changed, nSignal_a) || ctx->event == enEvent_s) {"
        ));
        assert!(source.contains("evaluate_functor_s(storageSignal_a);"));
    }

    #[test]
    fn startup_evaluates_layer_zero_once_per_functor() {
        let artifacts = emit(&[
            FunctorDecl::impure("imu", &[], &["ax", "ay"]),
            FunctorDecl::pure("norm", &["ax", "ay"], &["n"]),
        ]);
        let source = file(&artifacts, EVAL_SOURCE_FILE);
        let startup = &source[source.find("void startup(void)").expect("startup")..];

        assert_eq!(startup.matches("evaluate_functor_imu();").count(), 1);
        assert!(startup.contains("bitfield_set(ctx.signal_changed, nSignal_ax);"));
        assert!(startup.contains("bitfield_set(ctx.signal_changed, nSignal_ay);"));
        assert!(startup.contains("process_layer_1(&ctx);"));
        assert!(!startup.contains("process_layer_0(&ctx);"));
    }

    #[test]
    fn environment_inputs_declared_extern_only() {
        let artifacts = emit(&[FunctorDecl::pure("g", &["env"], &["g"])]);
        let header = file(&artifacts, EVAL_HEADER_FILE);
        let source = file(&artifacts, EVAL_SOURCE_FILE);

        assert!(header.contains("extern uint8_t storageSignal_env;"));
        assert!(!header.contains("nSignal_env"));
        assert!(!source.contains("storageSignal_env = 0;"));
        assert!(source.contains("if (0) {"));
    }

    #[test]
    fn unscheduled_functor_has_no_prototype() {
        let artifacts = emit(&[
            FunctorDecl::impure("a", &[], &["a"]),
            FunctorDecl::pure("sink", &["a"], &[]),
        ]);
        assert!(!file(&artifacts, HEADER_FILE).contains("sink"));
        assert!(!file(&artifacts, IMPL_FILE).contains("sink"));
    }

    #[test]
    fn impure_functor_named_like_sentinel_rejected() {
        let plan = Compiler::new()
            .compile(&[FunctorDecl::impure("INVALID", &[], &["x"])])
            .expect("compile");
        let result = CEmitter::default().emit(&plan);
        assert!(matches!(result, Err(SigflowError::EmitError(_))));

        // A pure functor gets no enumerator, so the name is free
        let plan = Compiler::new()
            .compile(&[
                FunctorDecl::impure("a", &[], &["a"]),
                FunctorDecl::pure("INVALID", &["a"], &["x"]),
            ])
            .expect("compile");
        let header = CEmitter::default().emit(&plan).expect("emit");
        assert_eq!(file(&header, EVAL_HEADER_FILE).matches("enEvent_INVALID,").count(), 1);
    }

    #[test]
    fn keyword_names_rejected() {
        let cases = [
            vec![
                FunctorDecl::impure("a", &[], &["x"]),
                FunctorDecl::pure("int", &["x"], &["y"]),
            ],
            vec![
                FunctorDecl::impure("a", &[], &["int"]),
                FunctorDecl::pure("k", &["int"], &["z"]),
            ],
            vec![FunctorDecl::pure("k", &["void"], &["z"])],
        ];
        for decls in cases {
            let plan = Compiler::permissive().compile(&decls).expect("compile");
            let result = CEmitter::default().emit(&plan);
            assert!(matches!(result, Err(SigflowError::EmitError(_))), "{decls:?}");
        }
    }

    #[test]
    fn keyword_storage_type_accepted() {
        let plan = Compiler::new()
            .compile(&[FunctorDecl::impure("a", &[], &["a"])])
            .expect("compile");
        let emitter = CEmitter {
            storage_type: "int".to_string(),
        };
        let artifacts = emitter.emit(&plan).expect("emit");
        assert!(file(&artifacts, EVAL_HEADER_FILE).contains("extern int storageSignal_a;"));
    }

    #[test]
    fn non_identifier_names_rejected() {
        let plan = Compiler::new()
            .compile(&[FunctorDecl::impure("a-1", &[], &["a"])])
            .expect("compile");
        let result = CEmitter::default().emit(&plan);
        assert!(matches!(result, Err(SigflowError::EmitError(_))));
    }
}
