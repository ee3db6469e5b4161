//! Error types for plan archive operations.

use crate::config::Diagnostics;

/// Errors arising while opening a plan archive or extracting its artifacts.
#[derive(Debug, thiserror::Error)]
pub enum PlanFileError {
    /// The byte stream is not a structurally valid container.
    #[error("the given file is not a plan archive: {0}")]
    NotAContainer(String),

    /// The byte stream starts with the magic token of the pre-archive plan
    /// format.
    #[error(
        "the given plan file was created by an earlier version of Terraform; \
         plan files before Terraform 0.12 are not compatible"
    )]
    LegacyFormatUnsupported,

    /// The container parsed, but it does not carry the mandatory plan entry.
    #[error("the given file is not a valid plan file")]
    InvalidContainer,

    /// A named entry is absent from the container.
    #[error("entry `{0}` not found in plan file")]
    EntryNotFound(String),

    /// A named entry is present but could not be opened or read.
    #[error("entry `{name}` is corrupted: {reason}")]
    EntryCorrupt { name: String, reason: String },

    /// The plan file carries no state under the given entry name.
    ///
    /// This is an expected condition: not every plan embeds state.
    #[error("no state embedded in plan file (entry `{0}`)")]
    NoStateEmbedded(String),

    /// An entry was read but its contents could not be decoded.
    #[error("failed to decode {artifact}: {reason}")]
    Decode {
        artifact: &'static str,
        reason: String,
    },

    /// An artifact was decoded but declares a format version this crate
    /// does not understand.
    #[error("unsupported {artifact} format version {found} (expected {expected})")]
    UnsupportedVersion {
        artifact: &'static str,
        found: u64,
        expected: u64,
    },

    /// The configuration snapshot is structurally inconsistent.
    #[error("invalid configuration snapshot: {0}")]
    Snapshot(String),

    /// Loading the configuration produced at least one error diagnostic.
    #[error("{0}")]
    Config(Diagnostics),

    /// Encoding an artifact while writing an archive failed.
    #[error("failed to encode {artifact}: {reason}")]
    Encode {
        artifact: &'static str,
        reason: String,
    },

    /// Underlying I/O failure on the supplied reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure from one stage of a multi-step read, labelled with that
    /// stage.
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PlanFileError>,
    },
}

impl PlanFileError {
    /// Wrap this error with a stage label.
    pub fn at(self, stage: &'static str) -> Self {
        PlanFileError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through every stage label.
    pub fn root_cause(&self) -> &PlanFileError {
        let mut current = self;
        while let PlanFileError::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// Whether this error (at any stage depth) reports an absent state.
    pub fn is_no_state(&self) -> bool {
        matches!(self.root_cause(), PlanFileError::NoStateEmbedded(_))
    }
}
