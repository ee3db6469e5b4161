//! # planwarden-planfile
//!
//! Reading plan archives: the container file a plan run writes, holding the
//! change plan, the prior and previous-run states, and a snapshot of the
//! configuration source.
//!
//! ## Architecture
//!
//! ```text
//! ArchiveContainer      ← zip container, named entries
//!     │
//! PlanArchiveReader     ← fixed entry names, legacy sniffing, lazy reads
//!     │
//! PlanFormat / ConfigLoader  ← artifact decoding, swappable
//!     │
//! PlanAssembler         ← one PlanBundle per archive, stage-labelled errors
//! ```

pub mod assembler;
pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod plan;
pub mod reader;
mod snapshot;
pub mod state;
pub mod writer;

pub use assembler::{
    PlanAssembler, PlanBundle, load_plan_file, load_plan_path, load_plan_reader,
};
pub use config::{
    Config, ConfigLoader, ConfigSnapshot, Diagnostic, Diagnostics, ModuleConfig, ROOT_MODULE_KEY,
    Severity, SnapshotConfigLoader, SnapshotModule,
};
pub use container::ArchiveContainer;
pub use error::PlanFileError;
pub use format::{JsonPlanFormat, PlanFormat};
pub use plan::{
    Change, ChangeAction, Changes, InstanceKey, ModuleInstanceStep, OutputChange,
    PLAN_FORMAT_VERSION, Plan, ResourceInstanceAddr, ResourceInstanceChange, ResourceMode,
};
pub use reader::{
    LEGACY_PLAN_MAGIC, PLAN_ENTRY, PREV_STATE_ENTRY, PlanArchiveReader, STATE_ENTRY,
    absent_as_none,
};
pub use snapshot::{CONFIG_SNAPSHOT_MANIFEST, CONFIG_SNAPSHOT_PREFIX};
pub use state::{STATE_FORMAT_VERSION, State, StateResource};
pub use writer::PlanArchiveWriter;
