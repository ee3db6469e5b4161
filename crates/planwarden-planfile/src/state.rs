//! State snapshots embedded alongside a plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// State encoding version understood by [`crate::JsonPlanFormat`].
pub const STATE_FORMAT_VERSION: u64 = 4;

/// A decoded state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub version: u64,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub lineage: String,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

impl State {
    pub fn new(lineage: impl Into<String>, serial: u64) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            terraform_version: String::new(),
            serial,
            lineage: lineage.into(),
            outputs: BTreeMap::new(),
            resources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub instances: Vec<Value>,
}
