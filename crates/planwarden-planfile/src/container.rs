//! Random-access archive container with named entries.
//!
//! A thin layer over `zip::ZipArchive` that maps the container library's
//! failures onto [`PlanFileError`]: a stream that is not a container at all,
//! an entry that is absent, and an entry that is present but unreadable are
//! three distinct conditions.

use crate::error::PlanFileError;
use std::io::{Read, Seek};
use zip::ZipArchive;
use zip::result::ZipError;

/// A validated archive container.
pub struct ArchiveContainer<R> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> ArchiveContainer<R> {
    /// Open a container over `reader`, whose total length is `size` bytes.
    pub fn open(reader: R, size: u64) -> Result<Self, PlanFileError> {
        if size == 0 {
            return Err(PlanFileError::NotAContainer("input is empty".to_string()));
        }
        let zip =
            ZipArchive::new(reader).map_err(|e| PlanFileError::NotAContainer(e.to_string()))?;
        Ok(Self { zip })
    }

    /// Number of entries in the container.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Whether an entry with exactly this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Entry names, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        (0..self.zip.len())
            .filter_map(|i| self.zip.name_for_index(i))
            .map(str::to_string)
            .collect()
    }

    /// Open the byte stream of one entry.
    pub fn open_entry(&mut self, name: &str) -> Result<impl Read + '_, PlanFileError> {
        self.zip.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => PlanFileError::EntryNotFound(name.to_string()),
            other => PlanFileError::EntryCorrupt {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Read one entry fully into memory.
    pub fn lookup(&mut self, name: &str) -> Result<Vec<u8>, PlanFileError> {
        let mut entry = self.open_entry(name)?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| PlanFileError::EntryCorrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes)
    }
}
