//! # planwarden-sandbox
//!
//! Runs a policy script against a plan bundle inside a restricted Rhai
//! engine. Scripts see only the libraries they were granted, the host
//! bindings (`plan`, `state`, `prevState`, `config`) and the modules
//! preloaded for `import`.
//!
//! ## Script result
//!
//! A script passes by returning `()` or `true`. Returning `false`, a
//! string, or an array of messages fails validation with those issues. A
//! script that throws fails with a script error instead.

pub mod builder;
pub mod call;
pub mod error;
pub mod handles;
pub mod libs;
pub mod modules;
pub mod options;
mod preload;
pub mod result;
pub mod warden;

pub use builder::Sandbox;
pub use call::{CallValidationError, CallViolation};
pub use error::{OutcomeKind, SandboxError, ValidationError, ValidationReport};
pub use handles::{HandleKind, HostHandle};
pub use libs::{BASE_LIB, StandardLib};
pub use modules::{default_modules, native_module};
pub use options::{
    BindingNames, BindingOverrides, NativeModule, SandboxConfig, SandboxLimits, SandboxOptions,
    UserModule,
};
pub use warden::Warden;

#[cfg(test)]
pub(crate) mod testing {
    use planwarden_planfile::{
        Change, ChangeAction, Changes, InstanceKey, Plan, PlanArchiveWriter, PlanAssembler,
        PlanBundle, ResourceInstanceAddr, ResourceInstanceChange, State,
    };
    use serde_json::{Value, json};
    use std::io::Cursor;

    fn change(resource_type: &str, name: &str, index: Option<i64>) -> ResourceInstanceChange {
        let mut addr = ResourceInstanceAddr::managed(resource_type, name);
        addr.index = index.map(InstanceKey::Int);
        ResourceInstanceChange {
            addr,
            deposed_key: None,
            provider_addr: "provider[\"registry.terraform.io/hashicorp/aws\"]".to_string(),
            change: Change {
                action: ChangeAction::Create,
                before: Value::Null,
                after: json!({"instance_type": "t3.micro", "tags": {"team": "infra"}}),
            },
        }
    }

    /// Two aws_instance changes and both states, round-tripped through an
    /// archive.
    pub(crate) fn sample_bundle() -> PlanBundle {
        let plan = Plan::new(Changes {
            resources: vec![
                change("aws_instance", "multiple_resource", Some(0)),
                change("aws_instance", "single_resource", None),
            ],
            outputs: Vec::new(),
        });
        let bytes = PlanArchiveWriter::new(plan)
            .with_prior_state(State::new("lineage-a", 3))
            .with_prev_run_state(State::new("lineage-a", 2))
            .to_bytes()
            .expect("archive writes");
        PlanAssembler::default()
            .load_reader(Cursor::new(bytes))
            .expect("bundle loads")
    }
}
