//! The validation entry point: load a plan archive, run the policy.

use crate::builder::Sandbox;
use crate::error::{SandboxError, ValidationError};
use crate::options::{SandboxConfig, SandboxOptions};
use planwarden_planfile::{PlanAssembler, PlanBundle};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

/// A built sandbox plus the loader that feeds it.
///
/// ```no_run
/// use planwarden_sandbox::{SandboxOptions, Warden};
///
/// let warden = Warden::new([SandboxOptions::script(r#"
///     let web = plan.findResource("aws_instance", "web");
///     if web.is_empty() { "aws_instance.web is missing" }
/// "#)])?;
/// warden.validate_path("tfplan")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Warden {
    config: SandboxConfig,
    sandbox: Sandbox,
    assembler: PlanAssembler,
}

impl Warden {
    pub fn new(options: impl IntoIterator<Item = SandboxOptions>) -> Result<Self, SandboxError> {
        Self::from_config(SandboxConfig::from_options(options))
    }

    pub fn from_config(config: SandboxConfig) -> Result<Self, SandboxError> {
        let sandbox = Sandbox::build(&config)?;
        Ok(Self {
            config,
            sandbox,
            assembler: PlanAssembler::default(),
        })
    }

    pub fn with_assembler(mut self, assembler: PlanAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Validate the plan archive in an open file.
    pub fn validate_plan(&self, file: &mut File) -> Result<(), ValidationError> {
        let bundle = self.assembler.load_file(file)?;
        self.validate_bundle(bundle)
    }

    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let bundle = self.assembler.load_path(path)?;
        self.validate_bundle(bundle)
    }

    pub fn validate_reader<R: Read + Seek>(&self, reader: R) -> Result<(), ValidationError> {
        let bundle = self.assembler.load_reader(reader)?;
        self.validate_bundle(bundle)
    }

    /// Run the policy against an already loaded bundle.
    pub fn validate_bundle(&self, bundle: PlanBundle) -> Result<(), ValidationError> {
        let result = self.sandbox.invoke(Arc::new(bundle));
        match &result {
            Ok(()) => tracing::info!("plan passed validation"),
            Err(e) => tracing::info!(outcome = ?e.kind(), "plan did not pass validation"),
        }
        result
    }
}
