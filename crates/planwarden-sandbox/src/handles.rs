//! Host objects exposed to policy scripts.
//!
//! Every handle keeps the bundle it was created from alive, so handles stay
//! valid for as long as a script holds them. Each handle carries its kind;
//! host functions reject receivers of the wrong kind.

use crate::call::{CallCheck, into_script_error, register_checked};
use crate::error::{ScriptResult, runtime_error};
use planwarden_planfile::{InstanceKey, PlanBundle, ResourceInstanceChange};
use rhai::{Array, Dynamic, Engine, INT, Map};
use std::fmt;
use std::sync::Arc;

pub const FIND_RESOURCE: &str = "findResource";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Plan,
    ResourceChange,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Plan => "plan",
            HandleKind::ResourceChange => "resourceChange",
        }
    }
}

#[derive(Debug, Clone)]
pub enum HostHandle {
    Plan(PlanHandle),
    ResourceChange(ResourceChangeHandle),
}

impl HostHandle {
    pub fn plan(bundle: Arc<PlanBundle>) -> Self {
        HostHandle::Plan(PlanHandle { bundle })
    }

    pub fn kind(&self) -> HandleKind {
        match self {
            HostHandle::Plan(_) => HandleKind::Plan,
            HostHandle::ResourceChange(_) => HandleKind::ResourceChange,
        }
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostHandle::Plan(_) => f.write_str("plan"),
            HostHandle::ResourceChange(rc) => write!(f, "resourceChange({})", rc.record().addr),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanHandle {
    bundle: Arc<PlanBundle>,
}

impl PlanHandle {
    pub fn find_resources(&self, resource_type: &str, resource_name: &str) -> Vec<HostHandle> {
        self.bundle
            .plan
            .find_resources(resource_type, resource_name)
            .map(|(index, _)| {
                HostHandle::ResourceChange(ResourceChangeHandle {
                    bundle: Arc::clone(&self.bundle),
                    index,
                })
            })
            .collect()
    }
}

/// One entry of the plan's resource changes. `index` is always in range:
/// these handles are only created from the bundle's own change list.
#[derive(Debug, Clone)]
pub struct ResourceChangeHandle {
    bundle: Arc<PlanBundle>,
    index: usize,
}

impl ResourceChangeHandle {
    pub fn record(&self) -> &ResourceInstanceChange {
        &self.bundle.plan.changes.resources[self.index]
    }
}

fn as_plan(value: &Dynamic) -> Option<PlanHandle> {
    match value.clone().try_cast::<HostHandle>()? {
        HostHandle::Plan(plan) => Some(plan),
        HostHandle::ResourceChange(_) => None,
    }
}

fn as_resource_change(value: &Dynamic) -> Option<ResourceChangeHandle> {
    match value.clone().try_cast::<HostHandle>()? {
        HostHandle::ResourceChange(rc) => Some(rc),
        HostHandle::Plan(_) => None,
    }
}

fn find_resource(args: &[Dynamic]) -> ScriptResult<Dynamic> {
    let mut check = CallCheck::new(FIND_RESOURCE, args);
    let plan = check.receiver(HandleKind::Plan.name(), as_plan);
    check.arity(3);
    let resource_type = check.string(2);
    let resource_name = check.string(3);
    check.finish().map_err(into_script_error)?;

    let (Some(plan), Some(resource_type), Some(resource_name)) =
        (plan, resource_type, resource_name)
    else {
        return Err(runtime_error(format!("invalid call to '{FIND_RESOURCE}'")));
    };
    let found: Array = plan
        .find_resources(&resource_type, &resource_name)
        .into_iter()
        .map(Dynamic::from)
        .collect();
    Ok(found.into())
}

type Accessor = fn(&ResourceInstanceChange) -> ScriptResult<Dynamic>;

fn instance_key(key: &InstanceKey) -> Dynamic {
    match key {
        InstanceKey::Int(i) => Dynamic::from(*i as INT),
        InstanceKey::Str(s) => Dynamic::from(s.clone()),
    }
}

fn change_map(rc: &ResourceInstanceChange) -> ScriptResult<Dynamic> {
    let mut map = Map::new();
    map.insert("action".into(), Dynamic::from(rc.change.action.as_str().to_string()));
    map.insert("before".into(), rhai::serde::to_dynamic(&rc.change.before)?);
    map.insert("after".into(), rhai::serde::to_dynamic(&rc.change.after)?);
    Ok(map.into())
}

const RESOURCE_CHANGE_ACCESSORS: &[(&str, Accessor)] = &[
    ("address", |rc| Ok(rc.addr.to_string().into())),
    ("moduleAddress", |rc| Ok(rc.addr.module_address().into())),
    ("mode", |rc| Ok(rc.addr.mode.as_str().to_string().into())),
    ("type", |rc| Ok(rc.addr.resource_type.clone().into())),
    ("name", |rc| Ok(rc.addr.name.clone().into())),
    ("index", |rc| Ok(rc.addr.index.as_ref().map_or(Dynamic::UNIT, instance_key))),
    ("providerName", |rc| Ok(rc.provider_addr.clone().into())),
    ("deposed", |rc| {
        Ok(rc.deposed_key.clone().map_or(Dynamic::UNIT, Dynamic::from))
    }),
    ("change", change_map),
];

fn accessor(args: &[Dynamic], name: &'static str, get: Accessor) -> ScriptResult<Dynamic> {
    let mut check = CallCheck::new(name, args);
    let rc = check.receiver(HandleKind::ResourceChange.name(), as_resource_change);
    check.arity(1);
    check.finish().map_err(into_script_error)?;
    match rc {
        Some(rc) => get(rc.record()),
        None => Err(runtime_error(format!("invalid call to '{name}'"))),
    }
}

/// Register handle types and their functions.
pub(crate) fn register_host_api(engine: &mut Engine) {
    engine.register_type_with_name::<HostHandle>("handle");
    engine.register_fn("to_string", |h: &mut HostHandle| h.to_string());
    engine.register_fn("to_debug", |h: &mut HostHandle| h.to_string());

    register_checked(engine, FIND_RESOURCE, find_resource);
    for &(name, get) in RESOURCE_CHANGE_ACCESSORS {
        register_checked(engine, name, move |args: &[Dynamic]| accessor(args, name, get));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_bundle;
    use rhai::Scope;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        register_host_api(&mut engine);
        engine
    }

    fn eval(script: &str) -> Result<Dynamic, Box<rhai::EvalAltResult>> {
        let mut scope = Scope::new();
        scope.push_constant("plan", HostHandle::plan(Arc::new(sample_bundle())));
        engine().eval_with_scope::<Dynamic>(&mut scope, script)
    }

    #[test]
    fn find_resource_returns_matching_changes() {
        let found = eval(r#"plan.findResource("aws_instance", "multiple_resource")"#)
            .expect("call succeeds")
            .into_array()
            .expect("array");
        assert_eq!(found.len(), 1);
        let handle = found[0].clone().try_cast::<HostHandle>().expect("handle");
        assert_eq!(handle.kind(), HandleKind::ResourceChange);
        assert_eq!(handle.to_string(), "resourceChange(aws_instance.multiple_resource[0])");

        let none = eval(r#"plan.findResource("aws_instance", "nope").len()"#).expect("call");
        assert_eq!(none.as_int().expect("int"), 0);
    }

    #[test]
    fn accessors_read_the_underlying_change() {
        let out = eval(
            r#"
            let rc = plan.findResource("aws_instance", "multiple_resource")[0];
            [rc.type(), rc.name(), rc.address(), rc.mode(), rc.index(), rc.change().action]
            "#,
        )
        .expect("script runs");
        let values: Vec<String> = out
            .into_array()
            .expect("array")
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(
            values,
            vec![
                "aws_instance",
                "multiple_resource",
                "aws_instance.multiple_resource[0]",
                "managed",
                "0",
                "create",
            ]
        );
    }

    #[test]
    fn change_values_are_script_maps() {
        let out = eval(
            r#"plan.findResource("aws_instance", "multiple_resource")[0].change().after.instance_type"#,
        )
        .expect("script runs");
        assert_eq!(out.to_string(), "t3.micro");
    }

    #[test]
    fn bad_call_reports_every_problem() {
        let err = eval(r#"plan.findResource(1)"#).expect_err("invalid call");
        let message = err.to_string();
        assert!(message.contains("not enough arguments (expected 3, got 2)"), "{message}");
        assert!(message.contains("bad argument #2 (string expected, got integer)"), "{message}");
        assert!(message.contains("bad argument #3"), "{message}");
    }

    #[test]
    fn wrong_receiver_kind_is_rejected() {
        let err = eval(r#"plan.name()"#).expect_err("plan is not a resource change");
        assert!(
            err.to_string()
                .contains("bad receiver (resourceChange expected, got plan)"),
            "{err}"
        );

        let err = eval(r#""web".findResource("a", "b")"#).expect_err("string receiver");
        assert!(err.to_string().contains("bad receiver (plan expected, got string)"), "{err}");
    }
}
