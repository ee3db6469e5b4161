//! Configuration carried inside a plan archive.
//!
//! The archive stores configuration as a raw snapshot: a set of modules,
//! each with its source directory and files. A [`ConfigLoader`] turns that
//! snapshot into a [`Config`] tree and reports problems as
//! [`Diagnostics`], which may mix fatal errors with warnings.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Module key of the root module in a snapshot.
pub const ROOT_MODULE_KEY: &str = "";

/// Raw configuration source tree, keyed by module path (`""` for the root,
/// `"network"`, `"network.subnet"` for nested calls).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub modules: BTreeMap<String, SnapshotModule>,
}

impl ConfigSnapshot {
    /// A snapshot holding only a root module with the given files.
    pub fn root(dir: impl Into<String>, files: BTreeMap<String, Vec<u8>>) -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(
            ROOT_MODULE_KEY.to_string(),
            SnapshotModule {
                dir: dir.into(),
                source_addr: String::new(),
                version: None,
                files,
            },
        );
        Self { modules }
    }

    pub fn root_module(&self) -> Option<&SnapshotModule> {
        self.modules.get(ROOT_MODULE_KEY)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotModule {
    pub dir: String,
    pub source_addr: String,
    pub version: Option<String>,
    pub files: BTreeMap<String, Vec<u8>>,
}

/// A loaded configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub root: ModuleConfig,
}

impl Config {
    /// Look up a module by its dotted key.
    pub fn module(&self, key: &str) -> Option<&ModuleConfig> {
        if key.is_empty() {
            return Some(&self.root);
        }
        key.split('.')
            .try_fold(&self.root, |module, name| module.children.get(name))
    }

    /// Number of modules in the tree, the root included.
    pub fn module_count(&self) -> usize {
        fn count(module: &ModuleConfig) -> usize {
            1 + module.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub key: String,
    pub source_addr: String,
    pub version: Option<String>,
    pub dir: String,
    pub files: BTreeMap<String, String>,
    pub children: BTreeMap<String, ModuleConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    /// Renders the error diagnostics only; warnings never explain a failure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors()
            .map(|d| {
                if d.detail.is_empty() {
                    d.summary.clone()
                } else {
                    format!("{}: {}", d.summary, d.detail)
                }
            })
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// Builds a [`Config`] from a raw snapshot.
pub trait ConfigLoader {
    /// Load the configuration rooted at `root_dir`.
    ///
    /// The returned configuration may be present even when diagnostics
    /// carry errors; callers must check [`Diagnostics::has_errors`].
    fn load_config(
        &self,
        snapshot: &ConfigSnapshot,
        root_dir: &str,
    ) -> (Option<Config>, Diagnostics);
}

/// Loads the module tree of a snapshot, keeping source files as text.
///
/// Configuration-language source is not parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotConfigLoader;

impl ConfigLoader for SnapshotConfigLoader {
    fn load_config(
        &self,
        snapshot: &ConfigSnapshot,
        root_dir: &str,
    ) -> (Option<Config>, Diagnostics) {
        let mut diags = Diagnostics::new();

        match snapshot.root_module() {
            Some(root) if root.dir == root_dir => {}
            Some(root) => {
                diags.push(Diagnostic::error(
                    "Root module mismatch",
                    format!(
                        "the root module lives in {:?}, not in {root_dir:?}",
                        root.dir
                    ),
                ));
                return (None, diags);
            }
            None => {
                diags.push(Diagnostic::error(
                    "Root module not found",
                    "the configuration snapshot has no root module",
                ));
                return (None, diags);
            }
        }

        let mut nodes: BTreeMap<String, ModuleConfig> = BTreeMap::new();
        for (key, module) in &snapshot.modules {
            if !key.is_empty() && !snapshot.modules.contains_key(parent_key(key)) {
                diags.push(Diagnostic::error(
                    "Orphaned module",
                    format!(
                        "module {key:?} has no parent module {:?} in the snapshot",
                        parent_key(key)
                    ),
                ));
                continue;
            }
            if module.files.is_empty() {
                diags.push(Diagnostic::warning(
                    "Empty module",
                    format!("module {key:?} in {:?} has no files", module.dir),
                ));
            }

            let mut files = BTreeMap::new();
            for (name, bytes) in &module.files {
                match String::from_utf8(bytes.clone()) {
                    Ok(text) => {
                        files.insert(name.clone(), text);
                    }
                    Err(_) => diags.push(Diagnostic::error(
                        "Invalid file encoding",
                        format!("{}/{name} is not valid UTF-8", module.dir),
                    )),
                }
            }

            nodes.insert(
                key.clone(),
                ModuleConfig {
                    key: key.clone(),
                    source_addr: module.source_addr.clone(),
                    version: module.version.clone(),
                    dir: module.dir.clone(),
                    files,
                    children: BTreeMap::new(),
                },
            );
        }

        // Attach the deepest modules first so each child is complete before
        // it moves into its parent.
        let mut keys: Vec<String> = nodes.keys().filter(|k| !k.is_empty()).cloned().collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.matches('.').count()));
        for key in keys {
            let Some(node) = nodes.remove(&key) else {
                continue;
            };
            let name = key.rsplit('.').next().unwrap_or(&key).to_string();
            match nodes.get_mut(parent_key(&key)) {
                Some(parent) => {
                    parent.children.insert(name, node);
                }
                None => diags.push(Diagnostic::error(
                    "Orphaned module",
                    format!("module {key:?} lost its parent module"),
                )),
            }
        }

        let config = nodes
            .remove(ROOT_MODULE_KEY)
            .map(|root| Config { root });
        (config, diags)
    }
}

fn parent_key(key: &str) -> &str {
    key.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}
