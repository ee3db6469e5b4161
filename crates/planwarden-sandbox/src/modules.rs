//! Native modules preloaded into every sandbox by default.
//!
//! Scripts reach them only through `import "<name>" as <alias>;`.

use crate::error::{ScriptResult, runtime_error};
use crate::options::NativeModule;
use chrono::DateTime;
use chrono::format::{Item, StrftimeItems};
use md5::Md5;
use regex::Regex;
use rhai::{Array, Dynamic, INT, ImmutableString, Module};
use sha2::{Digest, Sha256, Sha512};
use std::time::Duration;

/// Every built-in module, sorted by name.
pub fn default_modules() -> Vec<NativeModule> {
    vec![
        NativeModule::new("crypto", crypto_module),
        NativeModule::new("humanize", humanize_module),
        NativeModule::new("inspect", inspect_module),
        NativeModule::new("json", json_module),
        NativeModule::new("regexp", regexp_module),
        NativeModule::new("time", time_module),
        NativeModule::new("yaml", yaml_module),
    ]
}

pub fn native_module(name: &str) -> Option<NativeModule> {
    default_modules().into_iter().find(|m| m.name == name)
}

fn json_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("encode", |value: Dynamic| -> ScriptResult<String> {
        let json: serde_json::Value = rhai::serde::from_dynamic(&value)?;
        serde_json::to_string(&json).map_err(|e| runtime_error(format!("json.encode: {e}")))
    });
    module.set_native_fn("pretty", |value: Dynamic| -> ScriptResult<String> {
        let json: serde_json::Value = rhai::serde::from_dynamic(&value)?;
        serde_json::to_string_pretty(&json).map_err(|e| runtime_error(format!("json.pretty: {e}")))
    });
    module.set_native_fn("decode", |text: ImmutableString| -> ScriptResult<Dynamic> {
        let json: serde_json::Value = serde_json::from_str(text.as_str())
            .map_err(|e| runtime_error(format!("json.decode: {e}")))?;
        rhai::serde::to_dynamic(json)
    });
    module
}

fn yaml_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("encode", |value: Dynamic| -> ScriptResult<String> {
        let yaml: serde_yaml::Value = rhai::serde::from_dynamic(&value)?;
        serde_yaml::to_string(&yaml).map_err(|e| runtime_error(format!("yaml.encode: {e}")))
    });
    module.set_native_fn("decode", |text: ImmutableString| -> ScriptResult<Dynamic> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text.as_str())
            .map_err(|e| runtime_error(format!("yaml.decode: {e}")))?;
        rhai::serde::to_dynamic(yaml)
    });
    module
}

fn crypto_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("md5", |text: ImmutableString| -> ScriptResult<String> {
        Ok(hex::encode(Md5::digest(text.as_bytes())))
    });
    module.set_native_fn("sha256", |text: ImmutableString| -> ScriptResult<String> {
        Ok(hex::encode(Sha256::digest(text.as_bytes())))
    });
    module.set_native_fn("sha512", |text: ImmutableString| -> ScriptResult<String> {
        Ok(hex::encode(Sha512::digest(text.as_bytes())))
    });
    module
}

fn compile(pattern: &str) -> ScriptResult<Regex> {
    Regex::new(pattern).map_err(|e| runtime_error(format!("invalid regular expression: {e}")))
}

fn regexp_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn(
        "is_match",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<bool> {
            Ok(compile(&pattern)?.is_match(&text))
        },
    );
    module.set_native_fn(
        "find_all",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<Array> {
            Ok(compile(&pattern)?
                .find_iter(&text)
                .map(|m| Dynamic::from(m.as_str().to_string()))
                .collect())
        },
    );
    module.set_native_fn(
        "replace_all",
        |pattern: ImmutableString,
         text: ImmutableString,
         replacement: ImmutableString|
         -> ScriptResult<String> {
            Ok(compile(&pattern)?
                .replace_all(&text, replacement.as_str())
                .into_owned())
        },
    );
    // Groups of the first match; unmatched groups are `()`.
    module.set_native_fn(
        "captures",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<Array> {
            let re = compile(&pattern)?;
            let Some(caps) = re.captures(&text) else {
                return Ok(Array::new());
            };
            Ok(caps
                .iter()
                .map(|group| match group {
                    Some(m) => Dynamic::from(m.as_str().to_string()),
                    None => Dynamic::UNIT,
                })
                .collect())
        },
    );
    module
}

fn inspect_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("inspect", |value: Dynamic| -> ScriptResult<String> {
        Ok(format!("{value:?}"))
    });
    module.set_native_fn("type_name", |value: Dynamic| -> ScriptResult<String> {
        Ok(value.type_name().to_string())
    });
    module
}

const SI_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
const IEC_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

fn humanize_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("bytes", |size: INT| -> ScriptResult<String> {
        format_size(size, 1000.0, &SI_UNITS)
    });
    module.set_native_fn("ibytes", |size: INT| -> ScriptResult<String> {
        format_size(size, 1024.0, &IEC_UNITS)
    });
    module.set_native_fn("time", |seconds: INT| -> ScriptResult<String> {
        Ok(relative_time(seconds, chrono::Utc::now().timestamp()))
    });
    module
}

/// One decimal below ten units, none above; "82854982" is "83 MB".
fn format_size(size: INT, base: f64, units: &[&str]) -> ScriptResult<String> {
    if size < 0 {
        return Err(runtime_error(format!("size {size} is negative")));
    }
    if size < 10 {
        return Ok(format!("{size} B"));
    }
    let size = size as f64;
    let exponent = (size.ln() / base.ln()).floor() as usize;
    let exponent = exponent.min(units.len() - 1);
    let value = (size / base.powi(exponent as i32) * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        Ok(format!("{value:.1} {}", units[exponent]))
    } else {
        Ok(format!("{value:.0} {}", units[exponent]))
    }
}

fn relative_time(seconds: INT, now: INT) -> String {
    let delta = now.saturating_sub(seconds);
    let span = humantime::format_duration(Duration::from_secs(delta.unsigned_abs()));
    match delta {
        0 => "now".to_string(),
        d if d > 0 => format!("{span} ago"),
        _ => format!("{span} from now"),
    }
}

fn time_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("now", || -> ScriptResult<INT> {
        Ok(chrono::Utc::now().timestamp())
    });
    module.set_native_fn("rfc3339", |seconds: INT| -> ScriptResult<String> {
        Ok(timestamp(seconds)?.to_rfc3339())
    });
    module.set_native_fn(
        "format",
        |seconds: INT, pattern: ImmutableString| -> ScriptResult<String> {
            let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(runtime_error(format!("invalid time format {:?}", pattern.as_str())));
            }
            Ok(timestamp(seconds)?.format_with_items(items.into_iter()).to_string())
        },
    );
    module
}

fn timestamp(seconds: INT) -> ScriptResult<DateTime<chrono::Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| runtime_error(format!("timestamp {seconds} is out of range")))
}
