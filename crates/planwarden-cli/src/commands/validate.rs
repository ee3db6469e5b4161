use crate::config::PolicyFile;
use crate::support::{
    EXIT_ERROR, EXIT_VALIDATION_FAILED, fail, print_json, print_list_block, read_text_or_exit,
};
use planwarden_sandbox::{OutcomeKind, SandboxConfig, SandboxOptions, ValidationReport, Warden};
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Args {
    pub plan: String,
    pub policy: Option<String>,
    pub script: Option<String>,
    pub libs: Vec<String>,
    pub max_operations: Option<u64>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = SandboxConfig::from_options(collect_options(&args));
    if config.script.trim().is_empty() {
        fail("no policy script given (use --script or a policy file with `script`)");
    }
    let warden = Warden::from_config(config).unwrap_or_else(|e| fail(e));

    let result = warden.validate_path(&args.plan);
    let report = ValidationReport::from_result(&result);

    if args.json {
        print_json(&json!({
            "plan": args.plan,
            "outcome": report.outcome,
            "issues": report.issues,
            "error": report.error,
        }));
    } else {
        println!("planwarden validate {}", args.plan);
        println!("  Outcome: {}", outcome_label(report.outcome));
        if let Some(error) = &report.error {
            println!("  Error: {error}");
        }
        print_list_block("Issues", &report.issues);
    }

    match report.outcome {
        OutcomeKind::Passed => {}
        OutcomeKind::ValidationFailed => std::process::exit(EXIT_VALIDATION_FAILED),
        OutcomeKind::ScriptFailed | OutcomeKind::PlanLoadFailed => std::process::exit(EXIT_ERROR),
    }
}

/// Policy file first, then flags, so flags win.
fn collect_options(args: &Args) -> Vec<SandboxOptions> {
    let mut options = Vec::new();
    if let Some(policy) = &args.policy {
        options.push(PolicyFile::load(Path::new(policy)).unwrap_or_else(|e| fail(e)));
    }

    let mut flags = SandboxOptions {
        max_operations: args.max_operations,
        ..SandboxOptions::default()
    };
    if let Some(script) = &args.script {
        flags.script = Some(read_text_or_exit(script, "policy script"));
    }
    if !args.libs.is_empty() {
        flags = flags.with_libs(args.libs.iter().cloned());
    }
    options.push(flags);
    options
}

fn outcome_label(outcome: OutcomeKind) -> &'static str {
    match outcome {
        OutcomeKind::Passed => "passed",
        OutcomeKind::ValidationFailed => "validation failed",
        OutcomeKind::ScriptFailed => "script failed",
        OutcomeKind::PlanLoadFailed => "plan load failed",
    }
}
