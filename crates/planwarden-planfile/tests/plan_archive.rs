//! Integration tests: plan archives written to disk and loaded back through
//! the public entry points.

use planwarden_planfile::{
    Change, ChangeAction, Changes, ConfigSnapshot, InstanceKey, PlanArchiveReader,
    PlanArchiveWriter, PlanFileError, Plan, ResourceInstanceAddr, ResourceInstanceChange, State,
    SnapshotModule, load_plan_file, load_plan_path,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::{self, File};

fn instance(resource_type: &str, name: &str, index: Option<i64>) -> ResourceInstanceChange {
    let mut addr = ResourceInstanceAddr::managed(resource_type, name);
    addr.index = index.map(InstanceKey::Int);
    ResourceInstanceChange {
        addr,
        deposed_key: None,
        provider_addr: "provider[\"registry.terraform.io/hashicorp/aws\"]".to_string(),
        change: Change {
            action: ChangeAction::Create,
            before: Value::Null,
            after: json!({"instance_type": "t3.micro"}),
        },
    }
}

fn sample_plan() -> Plan {
    Plan::new(Changes {
        resources: vec![
            instance("aws_instance", "multiple_resource", Some(0)),
            instance("aws_instance", "single_resource", None),
            instance("aws_s3_bucket", "logs", None),
        ],
        outputs: Vec::new(),
    })
}

fn sample_config() -> ConfigSnapshot {
    let mut root_files = BTreeMap::new();
    root_files.insert("main.tf".to_string(), b"module \"network\" {}".to_vec());
    let mut snapshot = ConfigSnapshot::root(".", root_files);

    let mut network_files = BTreeMap::new();
    network_files.insert("vpc.tf".to_string(), b"resource \"aws_vpc\" \"main\" {}".to_vec());
    snapshot.modules.insert(
        "network".to_string(),
        SnapshotModule {
            dir: "modules/network".to_string(),
            source_addr: "./modules/network".to_string(),
            version: None,
            files: network_files,
        },
    );
    snapshot
}

#[test]
fn loads_full_bundle_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tfplan.zip");
    PlanArchiveWriter::new(sample_plan())
        .with_prior_state(State::new("lineage-a", 3))
        .with_prev_run_state(State::new("lineage-a", 2))
        .with_config(sample_config())
        .write_to_path(&path)
        .expect("archive written");

    let bundle = load_plan_path(&path).expect("bundle loads");
    assert_eq!(bundle.plan.changes.resources.len(), 3);
    assert_eq!(bundle.prior_state.as_ref().map(|s| s.serial), Some(3));
    assert_eq!(bundle.prev_run_state.as_ref().map(|s| s.serial), Some(2));

    let network = bundle.config.module("network").expect("network module");
    assert_eq!(network.source_addr, "./modules/network");
    assert_eq!(network.files["vpc.tf"], "resource \"aws_vpc\" \"main\" {}");

    let mut file = File::open(&path).expect("reopen archive");
    let again = load_plan_file(&mut file).expect("bundle loads from file handle");
    assert_eq!(again, bundle);
}

#[test]
fn legacy_plan_file_on_disk_is_rejected_with_actionable_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("old.tfplan");
    fs::write(&path, b"tfplan\x00\x00\x00\x02opaque legacy body").expect("write legacy file");

    let err = load_plan_path(&path).expect_err("legacy plan");
    assert!(matches!(err.root_cause(), PlanFileError::LegacyFormatUnsupported));
    assert!(err.to_string().contains("plan files before Terraform 0.12"));
}

#[test]
fn empty_file_is_not_a_container() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty");
    fs::write(&path, b"").expect("write empty file");

    let err = load_plan_path(&path).expect_err("empty file");
    assert!(matches!(err.root_cause(), PlanFileError::NotAContainer(_)));
}

#[test]
fn reader_reads_artifacts_independently() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tfplan.zip");
    PlanArchiveWriter::new(sample_plan())
        .with_prev_run_state(State::new("lineage-b", 9))
        .with_config(sample_config())
        .write_to_path(&path)
        .expect("archive written");

    let file = File::open(&path).expect("open archive");
    let size = file.metadata().expect("metadata").len();
    let mut reader = PlanArchiveReader::open(file, size).expect("archive opens");

    assert!(reader.entry_names().iter().any(|n| n == "tfplan"));
    assert!(reader.read_state().expect_err("no prior state").is_no_state());
    assert_eq!(reader.read_previous_state().expect("previous state").serial, 9);

    let snapshot = reader.read_config_snapshot().expect("snapshot");
    assert_eq!(snapshot.modules.len(), 2);
}
