//! Interpretation of a policy script's return value.

use rhai::{Array, Dynamic};

pub const VALIDATION_FAILED: &str = "validation failed";

/// Turn the script's return value into issues. No issues means the plan
/// passed.
///
/// | value          | issues                               |
/// |----------------|--------------------------------------|
/// | `()` / `true`  | none                                 |
/// | `false`        | `validation failed`                  |
/// | string         | the string                           |
/// | array          | each element as text                 |
/// | anything else  | `validation failed (<value>)`        |
pub fn classify(value: &Dynamic) -> Vec<String> {
    if value.is_unit() {
        return Vec::new();
    }
    if let Ok(passed) = value.as_bool() {
        return if passed {
            Vec::new()
        } else {
            vec![VALIDATION_FAILED.to_string()]
        };
    }
    if value.is_string() {
        return vec![value.to_string()];
    }
    if let Some(items) = value.clone().try_cast::<Array>() {
        return items.iter().map(ToString::to_string).collect();
    }
    vec![format!("{VALIDATION_FAILED} ({value})")]
}
