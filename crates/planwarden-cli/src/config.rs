//! TOML policy files.
//!
//! Paths inside a policy file are relative to the file itself.

use planwarden_sandbox::{BindingOverrides, SandboxOptions, UserModule, native_module};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    pub script: Option<PathBuf>,
    pub libs: Option<Vec<String>>,
    pub modules: Option<Vec<String>>,
    pub max_operations: Option<u64>,
    pub max_call_levels: Option<usize>,
    #[serde(default)]
    pub bindings: BindingsSection,
    pub user_modules: Option<Vec<UserModuleEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingsSection {
    pub plan: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "prevState")]
    pub prev_state: Option<String>,
    pub config: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserModuleEntry {
    pub name: String,
    pub path: PathBuf,
}

impl PolicyFile {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid policy file: {e}"))
    }

    /// Read the file and every script it references.
    pub fn load(path: &Path) -> Result<SandboxOptions, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read policy file {}: {e}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text)?.into_options(base_dir)
    }

    pub fn into_options(self, base_dir: &Path) -> Result<SandboxOptions, String> {
        let script = self
            .script
            .map(|script| read_source(base_dir, &script, "policy script"))
            .transpose()?;

        let modules = self
            .modules
            .map(|names| {
                names
                    .iter()
                    .map(|name| {
                        native_module(name).ok_or_else(|| format!("unknown native module '{name}'"))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let user_modules = self
            .user_modules
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| {
                        let source = read_source(base_dir, &entry.path, "user module")?;
                        Ok(UserModule::new(entry.name, source))
                    })
                    .collect::<Result<Vec<_>, String>>()
            })
            .transpose()?;

        Ok(SandboxOptions {
            libs: self.libs,
            modules,
            user_modules,
            script,
            bindings: BindingOverrides {
                plan: self.bindings.plan,
                state: self.bindings.state,
                prev_state: self.bindings.prev_state,
                config: self.bindings.config,
            },
            max_operations: self.max_operations,
            max_call_levels: self.max_call_levels,
        })
    }
}

fn read_source(base_dir: &Path, path: &Path, label: &str) -> Result<String, String> {
    let full = base_dir.join(path);
    fs::read_to_string(&full).map_err(|e| format!("failed to read {label} {}: {e}", full.display()))
}
