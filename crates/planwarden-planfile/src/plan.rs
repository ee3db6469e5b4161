//! The change plan: the set of resource instance changes a run would apply.

use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Plan encoding version understood by [`crate::JsonPlanFormat`].
pub const PLAN_FORMAT_VERSION: u64 = 3;

/// A decoded change plan.
///
/// `prior_state` and `prev_run_state` are not part of the plan encoding;
/// [`crate::PlanArchiveReader::read_plan`] attaches them from their own
/// archive entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub format_version: u64,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub changes: Changes,
    #[serde(skip)]
    pub prior_state: Option<State>,
    #[serde(skip)]
    pub prev_run_state: Option<State>,
}

impl Plan {
    pub fn new(changes: Changes) -> Self {
        Self {
            format_version: PLAN_FORMAT_VERSION,
            terraform_version: String::new(),
            variables: BTreeMap::new(),
            changes,
            prior_state: None,
            prev_run_state: None,
        }
    }

    /// Every resource change whose type and name both match, in change-set
    /// order.
    pub fn find_resources<'a>(
        &'a self,
        resource_type: &'a str,
        resource_name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a ResourceInstanceChange)> + 'a {
        self.changes
            .resources
            .iter()
            .enumerate()
            .filter(move |(_, rc)| {
                rc.addr.resource_type == resource_type && rc.addr.name == resource_name
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Changes {
    #[serde(default)]
    pub resources: Vec<ResourceInstanceChange>,
    #[serde(default)]
    pub outputs: Vec<OutputChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputChange {
    pub name: String,
    #[serde(default)]
    pub sensitive: bool,
    pub change: Change,
}

/// One planned change to one resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstanceChange {
    pub addr: ResourceInstanceAddr,
    /// Set when the change targets a deposed object rather than the
    /// current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposed_key: Option<String>,
    pub provider_addr: String,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    #[serde(default)]
    pub before: Value,
    #[serde(default)]
    pub after: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Read,
    Update,
    DeleteThenCreate,
    CreateThenDelete,
    Delete,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::NoOp => "no-op",
            ChangeAction::Create => "create",
            ChangeAction::Read => "read",
            ChangeAction::Update => "update",
            ChangeAction::DeleteThenCreate => "delete-then-create",
            ChangeAction::CreateThenDelete => "create-then-delete",
            ChangeAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    Managed,
    Data,
}

impl ResourceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceMode::Managed => "managed",
            ResourceMode::Data => "data",
        }
    }
}

/// Instance key of a resource or module declared with `count` or
/// `for_each`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Int(i) => write!(f, "[{i}]"),
            InstanceKey::Str(s) => write!(f, "[{s:?}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInstanceStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<InstanceKey>,
}

/// Absolute address of a resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInstanceAddr {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module: Vec<ModuleInstanceStep>,
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<InstanceKey>,
}

impl ResourceInstanceAddr {
    pub fn managed(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Vec::new(),
            mode: ResourceMode::Managed,
            resource_type: resource_type.into(),
            name: name.into(),
            index: None,
        }
    }

    /// The module path part of the address; empty for the root module.
    pub fn module_address(&self) -> String {
        self.module
            .iter()
            .map(|step| match &step.key {
                Some(key) => format!("module.{}{key}", step.name),
                None => format!("module.{}", step.name),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ResourceInstanceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.module_address();
        if !module.is_empty() {
            write!(f, "{module}.")?;
        }
        if self.mode == ResourceMode::Data {
            f.write_str("data.")?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(index) = &self.index {
            write!(f, "{index}")?;
        }
        Ok(())
    }
}
