//! Plan archive writer.
//!
//! Produces archives in the layout [`crate::PlanArchiveReader`] expects,
//! with artifacts in the [`JsonPlanFormat`] encoding.

use crate::config::ConfigSnapshot;
use crate::error::PlanFileError;
use crate::format::JsonPlanFormat;
use crate::plan::Plan;
use crate::reader::{PLAN_ENTRY, PREV_STATE_ENTRY, STATE_ENTRY};
use crate::snapshot::{start_entry, write_config_snapshot};
use crate::state::State;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::ZipWriter;

#[derive(Debug, Clone)]
pub struct PlanArchiveWriter {
    plan: Plan,
    prior_state: Option<State>,
    prev_run_state: Option<State>,
    config: ConfigSnapshot,
}

impl PlanArchiveWriter {
    /// Start an archive for `plan`, with an empty root module as its
    /// configuration.
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            prior_state: None,
            prev_run_state: None,
            config: ConfigSnapshot::root(".", BTreeMap::new()),
        }
    }

    pub fn with_prior_state(mut self, state: State) -> Self {
        self.prior_state = Some(state);
        self
    }

    pub fn with_prev_run_state(mut self, state: State) -> Self {
        self.prev_run_state = Some(state);
        self
    }

    pub fn with_config(mut self, config: ConfigSnapshot) -> Self {
        self.config = config;
        self
    }

    /// Write the archive to `writer` and hand the writer back.
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W, PlanFileError> {
        let format = JsonPlanFormat;
        let mut zip = ZipWriter::new(writer);

        start_entry(&mut zip, PLAN_ENTRY)?;
        zip.write_all(&format.encode_plan(&self.plan)?)?;

        if let Some(state) = &self.prior_state {
            start_entry(&mut zip, STATE_ENTRY)?;
            zip.write_all(&format.encode_state(state)?)?;
        }
        if let Some(state) = &self.prev_run_state {
            start_entry(&mut zip, PREV_STATE_ENTRY)?;
            zip.write_all(&format.encode_state(state)?)?;
        }

        write_config_snapshot(&mut zip, &self.config)?;

        zip.finish().map_err(|e| PlanFileError::Encode {
            artifact: "archive",
            reason: e.to_string(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PlanFileError> {
        Ok(self.write(Cursor::new(Vec::new()))?.into_inner())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), PlanFileError> {
        let file = File::create(path.as_ref())?;
        let file = self.write(file)?;
        file.sync_all()?;
        Ok(())
    }
}
