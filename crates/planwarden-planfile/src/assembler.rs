//! Assembly of a complete plan bundle from one archive.
//!
//! A straight-line pipeline: size, open, plan, prior state, previous-run
//! state, configuration. The first failing stage aborts the load with its
//! stage label; no partial bundle is ever returned.

use crate::config::{Config, ConfigLoader, SnapshotConfigLoader};
use crate::error::PlanFileError;
use crate::format::{JsonPlanFormat, PlanFormat};
use crate::plan::Plan;
use crate::reader::{PlanArchiveReader, absent_as_none};
use crate::state::State;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Everything one validation run needs from a plan archive.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBundle {
    pub plan: Plan,
    pub prior_state: Option<State>,
    pub prev_run_state: Option<State>,
    pub config: Config,
}

/// Loads [`PlanBundle`]s with a chosen set of format libraries.
#[derive(Clone)]
pub struct PlanAssembler {
    format: Arc<dyn PlanFormat>,
    config_loader: Arc<dyn ConfigLoader>,
}

impl Default for PlanAssembler {
    fn default() -> Self {
        Self {
            format: Arc::new(JsonPlanFormat),
            config_loader: Arc::new(SnapshotConfigLoader),
        }
    }
}

impl PlanAssembler {
    pub fn new(format: Arc<dyn PlanFormat>, config_loader: Arc<dyn ConfigLoader>) -> Self {
        Self {
            format,
            config_loader,
        }
    }

    /// Load a bundle from an open file.
    pub fn load_file(&self, file: &mut File) -> Result<PlanBundle, PlanFileError> {
        let size = file
            .metadata()
            .map_err(|e| PlanFileError::from(e).at("failed to retrieve plan file information"))?
            .len();
        self.load_sized(file, size)
    }

    /// Load a bundle from a file path.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<PlanBundle, PlanFileError> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| PlanFileError::from(e).at("failed to open plan file"))?;
        tracing::debug!(path = %path.display(), "loading plan file");
        self.load_file(&mut file)
    }

    /// Load a bundle from any seekable reader.
    pub fn load_reader<R: Read + Seek>(&self, mut reader: R) -> Result<PlanBundle, PlanFileError> {
        let size = reader
            .seek(SeekFrom::End(0))
            .map_err(|e| PlanFileError::from(e).at("failed to retrieve plan file information"))?;
        self.load_sized(reader, size)
    }

    fn load_sized<R: Read + Seek>(&self, reader: R, size: u64) -> Result<PlanBundle, PlanFileError> {
        let mut reader = PlanArchiveReader::open(reader, size)
            .map_err(|e| e.at("failed to open plan file"))?
            .with_format(Arc::clone(&self.format))
            .with_config_loader(Arc::clone(&self.config_loader));

        let plan = reader
            .read_plan()
            .map_err(|e| e.at("failed to load plan data"))?;
        let prior_state =
            absent_as_none(reader.read_state()).map_err(|e| e.at("failed to load state data"))?;
        let prev_run_state = absent_as_none(reader.read_previous_state())
            .map_err(|e| e.at("failed to load previous state data"))?;

        let (config, diags) = reader.read_config();
        for warning in diags.warnings() {
            tracing::warn!(
                summary = %warning.summary,
                detail = %warning.detail,
                "configuration warning"
            );
        }
        if diags.has_errors() {
            return Err(PlanFileError::Config(diags).at("failed to load configuration data"));
        }
        let config = config.ok_or_else(|| {
            PlanFileError::Snapshot("the configuration loader returned no configuration".to_string())
                .at("failed to load configuration data")
        })?;

        Ok(PlanBundle {
            plan,
            prior_state,
            prev_run_state,
            config,
        })
    }
}

/// Load a bundle from an open file with the default format libraries.
pub fn load_plan_file(file: &mut File) -> Result<PlanBundle, PlanFileError> {
    PlanAssembler::default().load_file(file)
}

/// Load a bundle from a path with the default format libraries.
pub fn load_plan_path(path: impl AsRef<Path>) -> Result<PlanBundle, PlanFileError> {
    PlanAssembler::default().load_path(path)
}

pub fn load_plan_reader<R: Read + Seek>(reader: R) -> Result<PlanBundle, PlanFileError> {
    PlanAssembler::default().load_reader(reader)
}
