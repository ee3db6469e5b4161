//! Configuration snapshot layout inside the archive.
//!
//! ```text
//! tfconfig/modules.json          manifest: [{Key, Source, Version?, Dir}]
//! tfconfig/m-<key>/<file name>   one entry per source file
//! ```
//!
//! The root module uses the empty key, so its files live under `tfconfig/m-/`.

use crate::config::{ConfigSnapshot, SnapshotModule};
use crate::container::ArchiveContainer;
use crate::error::PlanFileError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONFIG_SNAPSHOT_PREFIX: &str = "tfconfig/";
pub const CONFIG_SNAPSHOT_MANIFEST: &str = "tfconfig/modules.json";
pub const CONFIG_SNAPSHOT_MODULE_PREFIX: &str = "tfconfig/m-";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestRecord {
    key: String,
    #[serde(rename = "Source", default)]
    source_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    dir: String,
}

/// Extract the raw configuration snapshot without parsing any source.
pub(crate) fn read_config_snapshot<R: Read + Seek>(
    container: &mut ArchiveContainer<R>,
) -> Result<ConfigSnapshot, PlanFileError> {
    let manifest_bytes = match container.lookup(CONFIG_SNAPSHOT_MANIFEST) {
        Ok(bytes) => bytes,
        Err(PlanFileError::EntryNotFound(_)) => {
            return Err(PlanFileError::Snapshot(
                "config snapshot does not have manifest file".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };
    let manifest: Vec<ManifestRecord> = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| PlanFileError::Snapshot(format!("invalid module manifest: {e}")))?;

    let mut modules = BTreeMap::new();
    for record in manifest {
        let previous = modules.insert(
            record.key.clone(),
            SnapshotModule {
                dir: record.dir,
                source_addr: record.source_addr,
                version: record.version,
                files: BTreeMap::new(),
            },
        );
        if previous.is_some() {
            return Err(PlanFileError::Snapshot(format!(
                "module {:?} is listed twice in the manifest",
                record.key
            )));
        }
    }

    for name in container.entry_names() {
        let Some(rest) = name.strip_prefix(CONFIG_SNAPSHOT_MODULE_PREFIX) else {
            continue;
        };
        if rest.ends_with('/') {
            continue;
        }
        let Some((key, file_name)) = rest.rsplit_once('/') else {
            return Err(PlanFileError::Snapshot(format!(
                "invalid module file path {name:?}"
            )));
        };
        let Some(module) = modules.get_mut(key) else {
            return Err(PlanFileError::Snapshot(format!(
                "file {name:?} does not belong to any known module"
            )));
        };
        let bytes = container.lookup(&name)?;
        module.files.insert(file_name.to_string(), bytes);
    }

    Ok(ConfigSnapshot { modules })
}

pub(crate) fn write_config_snapshot<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    snapshot: &ConfigSnapshot,
) -> Result<(), PlanFileError> {
    let manifest: Vec<ManifestRecord> = snapshot
        .modules
        .iter()
        .map(|(key, module)| ManifestRecord {
            key: key.clone(),
            source_addr: module.source_addr.clone(),
            version: module.version.clone(),
            dir: module.dir.clone(),
        })
        .collect();
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).map_err(|e| PlanFileError::Encode {
            artifact: "config snapshot manifest",
            reason: e.to_string(),
        })?;
    start_entry(zip, CONFIG_SNAPSHOT_MANIFEST)?;
    zip.write_all(&manifest_bytes)?;

    for (key, module) in &snapshot.modules {
        for (file_name, bytes) in &module.files {
            start_entry(zip, &format!("{CONFIG_SNAPSHOT_MODULE_PREFIX}{key}/{file_name}"))?;
            zip.write_all(bytes)?;
        }
    }
    Ok(())
}

pub(crate) fn start_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
) -> Result<(), PlanFileError> {
    zip.start_file(name, SimpleFileOptions::default())
        .map_err(|e| PlanFileError::Encode {
            artifact: "archive entry",
            reason: format!("{name}: {e}"),
        })
}
