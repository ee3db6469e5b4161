use crate::support::{fail, print_json, print_list_block};
use planwarden_planfile::{PlanArchiveReader, load_plan_path};
use serde_json::json;
use std::fs::File;

pub fn run(plan: String, json_output: bool) {
    let entries = entry_names(&plan);
    let bundle = load_plan_path(&plan).unwrap_or_else(|e| fail(e));

    let changes: Vec<String> = bundle
        .plan
        .changes
        .resources
        .iter()
        .map(|rc| format!("{} ({})", rc.addr, rc.change.action.as_str()))
        .collect();
    let prior_serial = bundle.prior_state.as_ref().map(|s| s.serial);
    let prev_serial = bundle.prev_run_state.as_ref().map(|s| s.serial);

    if json_output {
        print_json(&json!({
            "plan": plan,
            "entries": entries,
            "terraform_version": bundle.plan.terraform_version,
            "resource_changes": changes,
            "output_changes": bundle.plan.changes.outputs.len(),
            "prior_state_serial": prior_serial,
            "prev_run_state_serial": prev_serial,
            "config_module_count": bundle.config.module_count(),
        }));
    } else {
        println!("planwarden inspect {plan}");
        println!("  Entries: {}", entries.len());
        println!("  Resource changes: {}", changes.len());
        println!("  Output changes: {}", bundle.plan.changes.outputs.len());
        println!("  Prior state: {}", serial_label(prior_serial));
        println!("  Previous-run state: {}", serial_label(prev_serial));
        println!("  Config modules: {}", bundle.config.module_count());
        print_list_block("Changes", &changes);
    }
}

fn entry_names(plan: &str) -> Vec<String> {
    let file = File::open(plan).unwrap_or_else(|e| fail(format!("failed to open plan file: {e}")));
    let size = file
        .metadata()
        .unwrap_or_else(|e| fail(format!("failed to retrieve plan file information: {e}")))
        .len();
    PlanArchiveReader::open(file, size)
        .unwrap_or_else(|e| fail(format!("failed to open plan file: {e}")))
        .entry_names()
}

fn serial_label(serial: Option<u64>) -> String {
    match serial {
        Some(serial) => format!("serial {serial}"),
        None => "absent".to_string(),
    }
}
