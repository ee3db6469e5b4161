//! Error types for sandbox construction and validation runs.
//!
//! Script-engine errors are carried as rendered strings: the engine's own
//! error values hold script data and are not `Send`.

use planwarden_planfile::PlanFileError;
use rhai::{EvalAltResult, Position};
use serde::Serialize;

pub(crate) type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Raise a runtime error inside the running script.
pub(crate) fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into().into(), Position::NONE).into()
}

/// Failures while building a sandbox. A sandbox is never returned half-built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// A configured standard library name is not in the catalog.
    #[error("failed to open standard library `{0}`: no such library")]
    UnknownLibrary(String),

    /// A preloaded module was registered under an unusable name.
    #[error("failed to preload module {0:?}: module names must be non-empty")]
    PreloadModule(String),

    /// A user module does not compile.
    #[error("failed to load user module '{name}': {reason}")]
    UserModule { name: String, reason: String },

    /// The main policy script does not compile.
    #[error("invalid validation script: {reason}")]
    InvalidScript { reason: String },
}

/// Outcome of one validation run other than a clean pass.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The plan archive could not be turned into a bundle.
    #[error("failed to load plan file: {0}")]
    PlanLoad(#[from] PlanFileError),

    /// The policy script raised an error while running.
    #[error("policy script failed: {0}")]
    ScriptFailed(String),

    /// The policy script ran and reported at least one issue.
    #[error("validation failed: {}", .issues.join("; "))]
    ValidationFailed { issues: Vec<String> },
}

impl ValidationError {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ValidationError::PlanLoad(_) => OutcomeKind::PlanLoadFailed,
            ValidationError::ScriptFailed(_) => OutcomeKind::ScriptFailed,
            ValidationError::ValidationFailed { .. } => OutcomeKind::ValidationFailed,
        }
    }

    /// Issues reported by the policy; empty for engine failures.
    pub fn issues(&self) -> &[String] {
        match self {
            ValidationError::ValidationFailed { issues } => issues,
            _ => &[],
        }
    }
}

/// Classification of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    ValidationFailed,
    ScriptFailed,
    PlanLoadFailed,
}

/// Serializable summary of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub outcome: OutcomeKind,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn from_result(result: &Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self {
                outcome: OutcomeKind::Passed,
                issues: Vec::new(),
                error: None,
            },
            Err(ValidationError::ValidationFailed { issues }) => Self {
                outcome: OutcomeKind::ValidationFailed,
                issues: issues.clone(),
                error: None,
            },
            Err(e) => Self {
                outcome: e.kind(),
                issues: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_is_distinguishable_from_engine_failures() {
        let failed = ValidationError::ValidationFailed {
            issues: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(failed.kind(), OutcomeKind::ValidationFailed);
        assert_eq!(failed.issues(), ["a", "b"]);
        insta::assert_snapshot!(failed.to_string(), @"validation failed: a; b");

        let broken = ValidationError::ScriptFailed("boom".to_string());
        assert_eq!(broken.kind(), OutcomeKind::ScriptFailed);
        assert!(broken.issues().is_empty());
    }

    #[test]
    fn report_carries_issues_or_error() {
        let report = ValidationReport::from_result(&Err(ValidationError::ValidationFailed {
            issues: vec!["x".to_string()],
        }));
        assert_eq!(report.outcome, OutcomeKind::ValidationFailed);
        assert_eq!(report.issues, vec!["x"]);
        assert!(report.error.is_none());

        let report = ValidationReport::from_result(&Err(PlanFileError::InvalidContainer.into()));
        assert_eq!(report.outcome, OutcomeKind::PlanLoadFailed);
        assert_eq!(
            report.error.as_deref(),
            Some("failed to load plan file: the given file is not a valid plan file")
        );

        assert_eq!(ValidationReport::from_result(&Ok(())).outcome, OutcomeKind::Passed);
    }
}
