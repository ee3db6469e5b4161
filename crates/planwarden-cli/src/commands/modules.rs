use crate::support::print_json;
use planwarden_sandbox::libs::CATALOG;
use planwarden_sandbox::{BASE_LIB, SandboxConfig, default_modules};
use serde_json::json;

pub fn run(json_output: bool) {
    let defaults = SandboxConfig::default();
    let is_default = |name: &str| name == BASE_LIB || defaults.libs.iter().any(|l| l == name);
    let modules: Vec<String> = default_modules().into_iter().map(|m| m.name).collect();

    if json_output {
        let libs: Vec<_> = CATALOG
            .iter()
            .map(|lib| {
                json!({
                    "name": lib.name,
                    "description": lib.description,
                    "default": is_default(lib.name),
                })
            })
            .collect();
        print_json(&json!({ "libs": libs, "modules": modules }));
    } else {
        println!("planwarden modules");
        println!("  Standard libraries:");
        for lib in CATALOG {
            let marker = if is_default(lib.name) { " (default)" } else { "" };
            println!("    - {}: {}{marker}", lib.name, lib.description);
        }
        println!("  Preloadable modules (import \"<name>\" as <alias>):");
        for name in &modules {
            println!("    - {name}");
        }
    }
}
