//! Building a sandbox and running the policy script in it.
//!
//! Construction steps, in order:
//!
//! 1. open the base library, then the configured remainder
//! 2. register host handle types and functions
//! 3. preload native modules
//! 4. compile and preload user modules
//! 5. compile the main script
//!
//! Any failing step aborts construction; the engine is dropped with it.

use crate::error::{SandboxError, ValidationError};
use crate::handles::{HostHandle, register_host_api};
use crate::libs::opening_order;
use crate::options::{BindingNames, SandboxConfig};
use crate::preload::PreloadRegistry;
use crate::result::classify;
use planwarden_planfile::{PlanBundle, State};
use rhai::{AST, Dynamic, Engine, Scope};
use std::sync::Arc;

const SCRIPT_LOG_TARGET: &str = "planwarden::script";

/// A compiled policy script inside its restricted engine.
pub struct Sandbox {
    engine: Engine,
    script: AST,
    bindings: BindingNames,
}

impl Sandbox {
    pub fn build(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine = Engine::new_raw();
        engine.disable_symbol("eval");
        engine.on_print(|text| tracing::info!(target: SCRIPT_LOG_TARGET, "{text}"));
        engine.on_debug(|text, source, pos| {
            tracing::debug!(
                target: SCRIPT_LOG_TARGET,
                source = source.unwrap_or("main"),
                position = %pos,
                "{text}"
            );
        });
        if let Some(max) = config.limits.max_operations {
            engine.set_max_operations(max);
        }
        if let Some(max) = config.limits.max_call_levels {
            engine.set_max_call_levels(max);
        }

        for lib in opening_order(&config.libs)? {
            lib.open(&mut engine);
            tracing::debug!(lib = lib.name, "opened standard library");
        }

        register_host_api(&mut engine);

        let mut registry = PreloadRegistry::default();
        for module in &config.modules {
            if module.name.is_empty() {
                return Err(SandboxError::PreloadModule(module.name.clone()));
            }
            registry.register_native(&module.name, module.loader);
        }

        for module in &config.user_modules {
            if module.name.is_empty() {
                return Err(SandboxError::PreloadModule(module.name.clone()));
            }
            let ast = engine
                .compile(&module.source)
                .map_err(|e| SandboxError::UserModule {
                    name: module.name.clone(),
                    reason: e.to_string(),
                })?;
            registry.register_script(&module.name, ast);
        }
        engine.set_module_resolver(registry);

        let script = engine
            .compile(&config.script)
            .map_err(|e| SandboxError::InvalidScript {
                reason: e.to_string(),
            })?;

        tracing::debug!(
            modules = config.modules.len(),
            user_modules = config.user_modules.len(),
            "sandbox ready"
        );
        Ok(Self {
            engine,
            script,
            bindings: config.bindings.clone(),
        })
    }

    /// Run the policy script once against `bundle`.
    pub fn invoke(&self, bundle: Arc<PlanBundle>) -> Result<(), ValidationError> {
        let mut scope = self.bind(bundle)?;
        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.script)
            .map_err(|e| ValidationError::ScriptFailed(e.to_string()))?;

        let issues = classify(&value);
        if issues.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = issues.len(), "policy reported issues");
        Err(ValidationError::ValidationFailed { issues })
    }

    fn bind(&self, bundle: Arc<PlanBundle>) -> Result<Scope<'static>, ValidationError> {
        let state = state_value(&self.bindings.state, bundle.prior_state.as_ref())?;
        let prev_state = state_value(&self.bindings.prev_state, bundle.prev_run_state.as_ref())?;
        let config = rhai::serde::to_dynamic(&bundle.config).map_err(|e| {
            ValidationError::ScriptFailed(format!("failed to bind `{}`: {e}", self.bindings.config))
        })?;

        let mut scope = Scope::new();
        scope.push_constant(self.bindings.plan.as_str(), HostHandle::plan(bundle));
        scope.push_constant_dynamic(self.bindings.state.as_str(), state);
        scope.push_constant_dynamic(self.bindings.prev_state.as_str(), prev_state);
        scope.push_constant_dynamic(self.bindings.config.as_str(), config);
        Ok(scope)
    }
}

/// A state as a script value; an absent state is `()`.
fn state_value(binding: &str, state: Option<&State>) -> Result<Dynamic, ValidationError> {
    let Some(state) = state else {
        return Ok(Dynamic::UNIT);
    };
    rhai::serde::to_dynamic(state)
        .map_err(|e| ValidationError::ScriptFailed(format!("failed to bind `{binding}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{SandboxOptions, UserModule};
    use crate::testing::sample_bundle;

    fn build(options: SandboxOptions) -> Result<Sandbox, SandboxError> {
        Sandbox::build(&SandboxConfig::from_options([options]))
    }

    fn run(script: &str) -> Result<(), ValidationError> {
        build(SandboxOptions::script(script))
            .expect("sandbox builds")
            .invoke(Arc::new(sample_bundle()))
    }

    #[test]
    fn construction_failures_name_the_step() {
        let err = build(SandboxOptions::script("true").with_libs(["io"]))
            .err()
            .expect("unknown lib");
        assert_eq!(err, SandboxError::UnknownLibrary("io".to_string()));

        let err = build(SandboxOptions::script("let = 1;")).err().expect("bad script");
        assert!(matches!(err, SandboxError::InvalidScript { .. }));

        let err = build(
            SandboxOptions::script("true")
                .with_user_modules(vec![UserModule::new("broken", "fn (")]),
        )
        .err()
        .expect("bad module");
        assert!(matches!(err, SandboxError::UserModule { ref name, .. } if name == "broken"));
    }

    #[test]
    fn return_values_decide_the_outcome() {
        assert!(run("true").is_ok());
        assert!(run("()").is_ok());
        assert!(run("").is_ok());
        assert_eq!(run("false").expect_err("fails").issues(), ["validation failed"]);
        assert_eq!(run(r#""needs tags""#).expect_err("fails").issues(), ["needs tags"]);
        assert_eq!(
            run(r#"["a", "b", "c", "d"]"#).expect_err("fails").issues(),
            ["a", "b", "c", "d"]
        );
        assert_eq!(
            run("123").expect_err("fails").issues(),
            ["validation failed (123)"]
        );
    }

    #[test]
    fn runtime_errors_are_script_failures() {
        let err = run(r#"throw "boom""#).expect_err("throws");
        assert!(matches!(err, ValidationError::ScriptFailed(ref m) if m.contains("boom")), "{err}");
    }

    #[test]
    fn invalid_host_call_reports_receiver_and_arity_together() {
        let err = run(r#""web".findResource("a")"#).expect_err("invalid call");
        let ValidationError::ScriptFailed(message) = &err else {
            panic!("expected a script failure, got {err:?}");
        };
        assert!(message.contains("bad receiver (plan expected, got string)"), "{message}");
        assert!(
            message.contains("not enough arguments (expected 3, got 2)"),
            "{message}"
        );
        assert!(
            message.contains("bad argument #3 (string expected, got no value)"),
            "{message}"
        );
    }

    #[test]
    fn eval_is_unavailable() {
        assert!(build(SandboxOptions::script(r#"eval("true")"#)).is_err());
    }

    #[test]
    fn bindings_expose_bundle_parts() {
        assert!(run("state.lineage == \"lineage-a\" && state.serial == 3").is_ok());
        assert!(run("prevState.serial == 2").is_ok());
        assert!(run("config.root.dir == \".\"").is_ok());
    }

    #[test]
    fn absent_states_are_unit() {
        let mut bundle = sample_bundle();
        bundle.prior_state = None;
        bundle.prev_run_state = None;
        let sandbox = build(SandboxOptions::script(
            r#"type_of(state) == "()" && type_of(prevState) == "()""#,
        ))
        .expect("sandbox builds");
        assert!(sandbox.invoke(Arc::new(bundle)).is_ok());
    }

    #[test]
    fn operation_limit_stops_runaway_scripts() {
        let sandbox = build(SandboxOptions::script("loop {}").with_max_operations(1_000))
            .expect("sandbox builds");
        let err = sandbox.invoke(Arc::new(sample_bundle())).expect_err("limit hit");
        assert!(matches!(err, ValidationError::ScriptFailed(_)));
    }

    #[test]
    fn each_invocation_gets_fresh_bindings() {
        let sandbox = build(SandboxOptions::script(
            r#"plan.findResource("aws_instance", "single_resource").len() == 1"#,
        ))
        .expect("sandbox builds");
        let bundle = Arc::new(sample_bundle());
        assert!(sandbox.invoke(Arc::clone(&bundle)).is_ok());
        assert!(sandbox.invoke(bundle).is_ok());
    }
}
