//! Sandbox configuration and the option values that build it.
//!
//! A [`SandboxConfig`] starts from defaults; each [`SandboxOptions`] applied
//! to it overrides only the fields it sets, later options winning.

use crate::libs::default_libs;
use crate::modules::default_modules;
use rhai::Module;
use serde::{Deserialize, Serialize};

/// A module provided by host code, available to scripts via `import`.
#[derive(Debug, Clone)]
pub struct NativeModule {
    pub name: String,
    pub loader: fn() -> Module,
}

impl NativeModule {
    pub fn new(name: impl Into<String>, loader: fn() -> Module) -> Self {
        Self {
            name: name.into(),
            loader,
        }
    }
}

/// A module given as script source, compiled when the sandbox is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModule {
    pub name: String,
    pub source: String,
}

impl UserModule {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Names under which the bundle parts are visible to the policy script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingNames {
    pub plan: String,
    pub state: String,
    pub prev_state: String,
    pub config: String,
}

impl Default for BindingNames {
    fn default() -> Self {
        Self {
            plan: "plan".to_string(),
            state: "state".to_string(),
            prev_state: "prevState".to_string(),
            config: "config".to_string(),
        }
    }
}

/// Resource ceilings for one script run. `None` leaves the engine default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxLimits {
    pub max_operations: Option<u64>,
    pub max_call_levels: Option<usize>,
}

/// Fully resolved sandbox configuration.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub libs: Vec<String>,
    pub modules: Vec<NativeModule>,
    pub user_modules: Vec<UserModule>,
    pub script: String,
    pub bindings: BindingNames,
    pub limits: SandboxLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            libs: default_libs(),
            modules: default_modules(),
            user_modules: Vec::new(),
            script: String::new(),
            bindings: BindingNames::default(),
            limits: SandboxLimits::default(),
        }
    }
}

impl SandboxConfig {
    /// Defaults with every option applied in order.
    pub fn from_options(options: impl IntoIterator<Item = SandboxOptions>) -> Self {
        let mut config = Self::default();
        for option in options {
            config.apply(option);
        }
        config
    }

    pub fn apply(&mut self, options: SandboxOptions) {
        if let Some(libs) = options.libs {
            self.libs = libs;
        }
        if let Some(modules) = options.modules {
            self.modules = modules;
        }
        if let Some(user_modules) = options.user_modules {
            self.user_modules = user_modules;
        }
        if let Some(script) = options.script {
            self.script = script;
        }
        let bindings = options.bindings;
        if let Some(name) = bindings.plan {
            self.bindings.plan = name;
        }
        if let Some(name) = bindings.state {
            self.bindings.state = name;
        }
        if let Some(name) = bindings.prev_state {
            self.bindings.prev_state = name;
        }
        if let Some(name) = bindings.config {
            self.bindings.config = name;
        }
        if options.max_operations.is_some() {
            self.limits.max_operations = options.max_operations;
        }
        if options.max_call_levels.is_some() {
            self.limits.max_call_levels = options.max_call_levels;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOverrides {
    pub plan: Option<String>,
    pub state: Option<String>,
    pub prev_state: Option<String>,
    pub config: Option<String>,
}

/// Partial configuration. Unset fields leave the current value alone.
#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    pub libs: Option<Vec<String>>,
    pub modules: Option<Vec<NativeModule>>,
    pub user_modules: Option<Vec<UserModule>>,
    pub script: Option<String>,
    pub bindings: BindingOverrides,
    pub max_operations: Option<u64>,
    pub max_call_levels: Option<usize>,
}

impl SandboxOptions {
    pub fn script(source: impl Into<String>) -> Self {
        Self {
            script: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libs = Some(libs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_modules(mut self, modules: Vec<NativeModule>) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn with_user_modules(mut self, user_modules: Vec<UserModule>) -> Self {
        self.user_modules = Some(user_modules);
        self
    }

    pub fn with_max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = Some(max_operations);
        self
    }
}
