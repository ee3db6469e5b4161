//! Artifact encodings.
//!
//! The reader never interprets artifact bytes itself; it hands them to a
//! [`PlanFormat`]. [`JsonPlanFormat`] is the encoding written by
//! [`crate::PlanArchiveWriter`].

use crate::error::PlanFileError;
use crate::plan::{PLAN_FORMAT_VERSION, Plan};
use crate::state::{STATE_FORMAT_VERSION, State};

/// Decoder for plan and state artifacts.
pub trait PlanFormat {
    fn decode_plan(&self, bytes: &[u8]) -> Result<Plan, PlanFileError>;

    fn decode_state(&self, bytes: &[u8]) -> Result<State, PlanFileError>;
}

/// JSON encoding of plans and states, with version checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPlanFormat;

impl JsonPlanFormat {
    pub fn encode_plan(&self, plan: &Plan) -> Result<Vec<u8>, PlanFileError> {
        serde_json::to_vec_pretty(plan).map_err(|e| PlanFileError::Encode {
            artifact: "plan",
            reason: e.to_string(),
        })
    }

    pub fn encode_state(&self, state: &State) -> Result<Vec<u8>, PlanFileError> {
        serde_json::to_vec_pretty(state).map_err(|e| PlanFileError::Encode {
            artifact: "state",
            reason: e.to_string(),
        })
    }
}

impl PlanFormat for JsonPlanFormat {
    fn decode_plan(&self, bytes: &[u8]) -> Result<Plan, PlanFileError> {
        let plan: Plan = serde_json::from_slice(bytes).map_err(|e| PlanFileError::Decode {
            artifact: "plan",
            reason: e.to_string(),
        })?;
        if plan.format_version != PLAN_FORMAT_VERSION {
            return Err(PlanFileError::UnsupportedVersion {
                artifact: "plan",
                found: plan.format_version,
                expected: PLAN_FORMAT_VERSION,
            });
        }
        Ok(plan)
    }

    fn decode_state(&self, bytes: &[u8]) -> Result<State, PlanFileError> {
        let state: State = serde_json::from_slice(bytes).map_err(|e| PlanFileError::Decode {
            artifact: "state",
            reason: e.to_string(),
        })?;
        if state.version != STATE_FORMAT_VERSION {
            return Err(PlanFileError::UnsupportedVersion {
                artifact: "state",
                found: state.version,
                expected: STATE_FORMAT_VERSION,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_plan_versions() {
        let err = JsonPlanFormat
            .decode_plan(br#"{"format_version": 2}"#)
            .expect_err("version 2 is unsupported");
        insta::assert_snapshot!(err.to_string(), @"unsupported plan format version 2 (expected 3)");
    }

    #[test]
    fn malformed_state_is_a_decode_error() {
        let err = JsonPlanFormat
            .decode_state(b"{ not json")
            .expect_err("malformed state");
        assert!(matches!(err, PlanFileError::Decode { artifact: "state", .. }));
    }

    #[test]
    fn decodes_minimal_state() {
        let state = JsonPlanFormat
            .decode_state(br#"{"version": 4, "serial": 7, "lineage": "abc"}"#)
            .expect("minimal state decodes");
        assert_eq!(state.serial, 7);
        assert!(state.resources.is_empty());
    }
}
