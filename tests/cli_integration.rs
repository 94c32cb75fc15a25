//! The `servicecut` binary end to end.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn servicecut(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("servicecut").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_init_writes_config_once() {
    let temp_dir = TempDir::new().unwrap();
    servicecut(temp_dir.path()).arg("init").assert().success();
    assert!(temp_dir.path().join("servicecut.toml").exists());

    servicecut(temp_dir.path()).arg("init").assert().failure();
    servicecut(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_cluster_writes_report() {
    let temp_dir = TempDir::new().unwrap();
    let report = temp_dir.path().join("out").join("report.json");

    servicecut(temp_dir.path())
        .arg("cluster")
        .arg(fixture("shop_classes.json"))
        .args(["--algorithm", "density", "--alpha", "1", "--epsilon", "0.5,1.0"])
        .args(["--min-samples", "1", "--quiet", "-o"])
        .arg(&report)
        .assert()
        .success();

    let json = read_json(&report);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["algorithm"], "density");
    assert_eq!(records[0]["epsilon"], 0.5);
    assert_eq!(
        records[0]["microservices"],
        serde_json::json!([[0], [0], [1], [1]])
    );
    for key in ["SM", "ICP", "IFN", "NED"] {
        assert!(records[0][key].is_number(), "missing {key}");
    }
}

#[test]
fn test_cluster_rejects_invalid_configuration() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("servicecut.toml"),
        "algorithm = \"fuzzy\"\nhard = true\nthreshold = 0.2\n",
    )
    .unwrap();

    let output = servicecut(temp_dir.path())
        .arg("cluster")
        .arg(fixture("shop_classes.json"))
        .args(["--metrics", "SM,Precision"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    for field in ["hard", "n_clusters", "evaluation.ground_truth"] {
        assert!(stderr.contains(field), "{field} not reported: {stderr}");
    }
}

#[test]
fn test_evaluate_scores_ground_truth() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("truth_scores.json");

    servicecut(temp_dir.path())
        .arg("evaluate")
        .arg(fixture("shop_classes.json"))
        .arg("--ground-truth")
        .arg(fixture("shop_truth.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let json = read_json(&output);
    assert_eq!(json["classes"], 4);
    assert_eq!(json["groups"], 2);
    assert_eq!(json["unassigned"], 0);
    assert_eq!(json["SM"], 0.5);
    assert_eq!(json["ICP"], 0.0);
}

#[test]
fn test_rescore_adds_ground_truth_metrics() {
    let temp_dir = TempDir::new().unwrap();
    let report = temp_dir.path().join("report.json");
    servicecut(temp_dir.path())
        .arg("cluster")
        .arg(fixture("shop_classes.json"))
        .args(["--algorithm", "density", "--alpha", "1", "--epsilon", "0.5"])
        .args(["--min-samples", "1", "--metrics", "SM", "-o"])
        .arg(&report)
        .assert()
        .success();

    let rescored = temp_dir.path().join("rescored.json");
    servicecut(temp_dir.path())
        .arg("rescore")
        .arg(fixture("shop_classes.json"))
        .arg(&report)
        .arg("--ground-truth")
        .arg(fixture("shop_truth.json"))
        .args(["--metrics", "NED,Precision,SR@10", "-o"])
        .arg(&rescored)
        .assert()
        .success();

    let json = read_json(&rescored);
    let record = &json[0];
    assert!(record.get("SM").is_none());
    assert_eq!(record["NED"], 1.0);
    assert_eq!(record["Precision"], 1.0);
    assert_eq!(record["SR@10"], 1.0);
    assert_eq!(record["microservices"], read_json(&report)[0]["microservices"]);
}

#[test]
fn test_rescore_handles_sparse_group_ids() {
    let temp_dir = TempDir::new().unwrap();
    let report = temp_dir.path().join("external.json");
    fs::write(
        &report,
        r#"[
            {"algorithm": "density", "microservices": [[0], [0], [1], [1]]},
            {"algorithm": "density", "microservices": [[0], [0], [7], [7]]},
            {"algorithm": "density", "microservices": [[1000000000000], [1000000000000], [3], [3]]}
        ]"#,
    )
    .unwrap();

    servicecut(temp_dir.path())
        .arg("rescore")
        .arg(fixture("shop_classes.json"))
        .arg(&report)
        .args(["--metrics", "SM,ICP,IFN,NED"])
        .assert()
        .success();

    let json = read_json(&report);
    let scores: Vec<&Value> = json.as_array().unwrap().iter().map(|r| &r["SM"]).collect();
    assert_eq!(scores, vec![&Value::from(0.5); 3]);
    assert_eq!(json[2]["microservices"][0][0], 1_000_000_000_000u64);
}
