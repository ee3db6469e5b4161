//! Plan archive reader.
//!
//! Opening validates the container shape cheaply; each artifact is decoded
//! only when it is requested.

use crate::config::{
    Config, ConfigLoader, ConfigSnapshot, Diagnostic, Diagnostics, SnapshotConfigLoader,
};
use crate::container::ArchiveContainer;
use crate::error::PlanFileError;
use crate::format::{JsonPlanFormat, PlanFormat};
use crate::plan::Plan;
use crate::snapshot;
use crate::state::State;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

/// Entry holding the change plan. Every plan archive has one.
pub const PLAN_ENTRY: &str = "tfplan";
/// Entry holding the prior state.
pub const STATE_ENTRY: &str = "tfstate";
/// Entry holding the state as of the end of the previous run.
pub const PREV_STATE_ENTRY: &str = "tfstate-prev";
/// Leading bytes of plan files written in the pre-archive format.
pub const LEGACY_PLAN_MAGIC: &[u8] = b"tfplan";

pub struct PlanArchiveReader<R> {
    container: ArchiveContainer<R>,
    format: Arc<dyn PlanFormat>,
    config_loader: Arc<dyn ConfigLoader>,
}

impl<R: Read + Seek> PlanArchiveReader<R> {
    /// Open a plan archive over `reader`, whose total length is `size`.
    ///
    /// Fails with [`PlanFileError::LegacyFormatUnsupported`] when the input
    /// is not a container but starts with the legacy plan magic, and with
    /// [`PlanFileError::InvalidContainer`] when the container lacks the plan
    /// entry.
    pub fn open(mut reader: R, size: u64) -> Result<Self, PlanFileError> {
        let head = sniff_head(&mut reader, size)?;
        let container = match ArchiveContainer::open(reader, size) {
            Ok(container) => container,
            Err(err) => {
                if head.starts_with(LEGACY_PLAN_MAGIC) {
                    return Err(PlanFileError::LegacyFormatUnsupported);
                }
                return Err(err);
            }
        };

        // Any archive that merely decodes is not enough; it must carry a plan.
        // The plan's own version is checked when it is read.
        if !container.contains(PLAN_ENTRY) {
            return Err(PlanFileError::InvalidContainer);
        }
        tracing::debug!(entries = container.len(), "opened plan archive");

        Ok(Self {
            container,
            format: Arc::new(JsonPlanFormat),
            config_loader: Arc::new(SnapshotConfigLoader),
        })
    }

    /// Replace the plan/state decoder.
    pub fn with_format(mut self, format: Arc<dyn PlanFormat>) -> Self {
        self.format = format;
        self
    }

    /// Replace the configuration loader.
    pub fn with_config_loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.config_loader = loader;
        self
    }

    /// Names of every entry in the archive, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.container.entry_names()
    }

    /// Read the plan, with the prior and previous-run states attached.
    pub fn read_plan(&mut self) -> Result<Plan, PlanFileError> {
        if !self.container.contains(PLAN_ENTRY) {
            // Checked at open time already.
            return Err(PlanFileError::InvalidContainer);
        }
        let bytes = self
            .container
            .lookup(PLAN_ENTRY)
            .map_err(|e| e.at("failed to retrieve plan from plan file"))?;
        let mut plan = self
            .format
            .decode_plan(&bytes)
            .map_err(|e| e.at("failed to read plan from plan file"))?;

        plan.prev_run_state = absent_as_none(self.read_previous_state())
            .map_err(|e| e.at("failed to read previous run state from plan file"))?;
        plan.prior_state = absent_as_none(self.read_state())
            .map_err(|e| e.at("failed to read prior state from plan file"))?;

        tracing::debug!(
            resources = plan.changes.resources.len(),
            prior_state = plan.prior_state.is_some(),
            prev_run_state = plan.prev_run_state.is_some(),
            "read plan"
        );
        Ok(plan)
    }

    /// Read the prior state.
    ///
    /// Returns [`PlanFileError::NoStateEmbedded`] when the archive carries
    /// none.
    pub fn read_state(&mut self) -> Result<State, PlanFileError> {
        self.read_state_entry(STATE_ENTRY)
    }

    /// Read the state as of the end of the previous run.
    ///
    /// Returns [`PlanFileError::NoStateEmbedded`] when the archive carries
    /// none.
    pub fn read_previous_state(&mut self) -> Result<State, PlanFileError> {
        self.read_state_entry(PREV_STATE_ENTRY)
    }

    /// Extract the configuration source tree without parsing it.
    pub fn read_config_snapshot(&mut self) -> Result<ConfigSnapshot, PlanFileError> {
        snapshot::read_config_snapshot(&mut self.container)
    }

    /// Load the configuration embedded in the archive.
    ///
    /// Problems are reported as diagnostics rather than a single error; use
    /// [`Diagnostics::has_errors`] to decide whether the result is usable.
    pub fn read_config(&mut self) -> (Option<Config>, Diagnostics) {
        let snapshot = match self.read_config_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut diags = Diagnostics::new();
                diags.push(Diagnostic::error(
                    "Failed to read configuration from plan file",
                    format!(
                        "The configuration file snapshot in the plan file could not be read: {e}."
                    ),
                ));
                return (None, diags);
            }
        };

        let root_dir = snapshot
            .root_module()
            .map(|root| root.dir.clone())
            .unwrap_or_default();
        self.config_loader.load_config(&snapshot, &root_dir)
    }

    fn read_state_entry(&mut self, name: &str) -> Result<State, PlanFileError> {
        let bytes = match self.container.lookup(name) {
            Ok(bytes) => bytes,
            Err(PlanFileError::EntryNotFound(_)) => {
                return Err(PlanFileError::NoStateEmbedded(name.to_string()));
            }
            Err(e) => return Err(e.at("failed to extract state from plan file")),
        };
        // An entry with no content carries no state, same as a missing one.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(PlanFileError::NoStateEmbedded(name.to_string()));
        }
        self.format.decode_state(&bytes)
    }
}

/// Turn an absent-state error into `None`, keeping every other failure.
pub fn absent_as_none(result: Result<State, PlanFileError>) -> Result<Option<State>, PlanFileError> {
    match result {
        Ok(state) => Ok(Some(state)),
        Err(e) if e.is_no_state() => Ok(None),
        Err(e) => Err(e),
    }
}

fn sniff_head<R: Read + Seek>(reader: &mut R, size: u64) -> Result<Vec<u8>, PlanFileError> {
    let len = size.min(LEGACY_PLAN_MAGIC.len() as u64);
    let mut head = Vec::with_capacity(len as usize);
    reader.seek(SeekFrom::Start(0))?;
    reader.by_ref().take(len).read_to_end(&mut head)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Change, ChangeAction, Changes, ResourceInstanceAddr, ResourceInstanceChange};
    use crate::writer::PlanArchiveWriter;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn sample_plan() -> Plan {
        Plan::new(Changes {
            resources: vec![ResourceInstanceChange {
                addr: ResourceInstanceAddr::managed("aws_instance", "web"),
                deposed_key: None,
                provider_addr: "provider[\"registry.terraform.io/hashicorp/aws\"]".to_string(),
                change: Change {
                    action: ChangeAction::Create,
                    before: serde_json::Value::Null,
                    after: json!({"ami": "ami-123"}),
                },
            }],
            outputs: Vec::new(),
        })
    }

    fn raw_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(body).expect("write entry");
        }
        writer.finish().expect("finish archive").into_inner()
    }

    fn open(bytes: Vec<u8>) -> Result<PlanArchiveReader<Cursor<Vec<u8>>>, PlanFileError> {
        let size = bytes.len() as u64;
        PlanArchiveReader::open(Cursor::new(bytes), size)
    }

    #[test]
    fn archive_without_plan_entry_is_invalid() {
        let bytes = raw_archive(&[("readme.txt", b"hello"), ("tfstate", b"{}")]);
        let err = open(bytes).err().expect("archive has no plan entry");
        assert!(matches!(err, PlanFileError::InvalidContainer));
    }

    #[test]
    fn legacy_magic_is_reported_distinctly() {
        let err = open(b"tfplan\x00\x01legacy payload".to_vec())
            .err()
            .expect("legacy plan is not an archive");
        assert!(matches!(err, PlanFileError::LegacyFormatUnsupported));
    }

    #[test]
    fn other_garbage_is_not_a_container() {
        let err = open(b"tfpla".to_vec()).err().expect("garbage input");
        assert!(matches!(err, PlanFileError::NotAContainer(_)));
    }

    #[test]
    fn read_plan_attaches_embedded_states() {
        let bytes = PlanArchiveWriter::new(sample_plan())
            .with_prior_state(State::new("lineage-1", 4))
            .to_bytes()
            .expect("archive writes");
        let mut reader = open(bytes).expect("archive opens");

        let plan = reader.read_plan().expect("plan reads");
        assert_eq!(plan.changes.resources.len(), 1);
        assert_eq!(plan.prior_state.as_ref().map(|s| s.serial), Some(4));
        assert!(plan.prev_run_state.is_none());
    }

    #[test]
    fn missing_state_is_no_state_embedded() {
        let bytes = PlanArchiveWriter::new(sample_plan())
            .to_bytes()
            .expect("archive writes");
        let mut reader = open(bytes).expect("archive opens");

        let err = reader.read_state().expect_err("no state entry");
        assert!(matches!(err, PlanFileError::NoStateEmbedded(name) if name == STATE_ENTRY));
        let err = reader.read_previous_state().expect_err("no previous state entry");
        assert!(matches!(err, PlanFileError::NoStateEmbedded(name) if name == PREV_STATE_ENTRY));
    }

    #[test]
    fn empty_state_entry_counts_as_absent() {
        let plan_bytes = crate::JsonPlanFormat
            .encode_plan(&sample_plan())
            .expect("plan encodes");
        let bytes = raw_archive(&[
            ("tfplan", &plan_bytes),
            ("tfstate", b""),
            ("tfstate-prev", b" \n"),
        ]);
        let mut reader = open(bytes).expect("archive opens");

        assert!(reader.read_state().expect_err("empty state").is_no_state());
        assert!(reader.read_previous_state().expect_err("blank state").is_no_state());
        let plan = reader.read_plan().expect("plan still reads");
        assert!(plan.prior_state.is_none());
    }

    #[test]
    fn corrupt_state_fails_the_plan_read_with_context() {
        let plan_bytes = crate::JsonPlanFormat
            .encode_plan(&sample_plan())
            .expect("plan encodes");
        let bytes = raw_archive(&[("tfplan", &plan_bytes), ("tfstate", b"{ broken")]);
        let mut reader = open(bytes).expect("archive opens");

        let err = reader.read_plan().expect_err("corrupt prior state");
        assert!(!err.is_no_state());
        assert!(
            err.to_string()
                .starts_with("failed to read prior state from plan file: failed to decode state")
        );
    }

    #[test]
    fn config_snapshot_is_extracted_raw() {
        let mut files = BTreeMap::new();
        files.insert("main.tf".to_string(), b"resource \"aws_instance\" \"web\" {}".to_vec());
        let bytes = PlanArchiveWriter::new(sample_plan())
            .with_config(ConfigSnapshot::root(".", files))
            .to_bytes()
            .expect("archive writes");
        let mut reader = open(bytes).expect("archive opens");

        let snapshot = reader.read_config_snapshot().expect("snapshot reads");
        let root = snapshot.root_module().expect("root module");
        assert_eq!(root.dir, ".");
        assert_eq!(
            root.files["main.tf"],
            b"resource \"aws_instance\" \"web\" {}".to_vec()
        );

        let (config, diags) = reader.read_config();
        assert!(!diags.has_errors(), "{diags}");
        assert_eq!(config.expect("config loads").root.files.len(), 1);
    }

    #[test]
    fn missing_manifest_becomes_a_diagnostic() {
        let plan_bytes = crate::JsonPlanFormat
            .encode_plan(&sample_plan())
            .expect("plan encodes");
        let mut reader = open(raw_archive(&[("tfplan", &plan_bytes)])).expect("archive opens");

        let (config, diags) = reader.read_config();
        assert!(config.is_none());
        insta::assert_snapshot!(
            diags.to_string(),
            @"Failed to read configuration from plan file: The configuration file snapshot in the plan file could not be read: invalid configuration snapshot: config snapshot does not have manifest file."
        );
    }

    #[test]
    fn snapshot_file_for_unknown_module_is_rejected() {
        let plan_bytes = crate::JsonPlanFormat
            .encode_plan(&sample_plan())
            .expect("plan encodes");
        let manifest = br#"[{"Key": "", "Source": "", "Dir": "."}]"#;
        let bytes = raw_archive(&[
            ("tfplan", &plan_bytes),
            ("tfconfig/modules.json", manifest),
            ("tfconfig/m-network/main.tf", b"# orphan"),
        ]);
        let mut reader = open(bytes).expect("archive opens");

        let err = reader.read_config_snapshot().expect_err("unknown module");
        assert!(matches!(err, PlanFileError::Snapshot(_)));
    }
}
