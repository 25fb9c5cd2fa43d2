#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// `mes` running inside `dir`, with the database and model directory kept
/// inside it.
fn mes(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mes").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("MES_CONFIG")
        .env_remove("RUST_LOG")
        .env("MES_DB", dir.path().join("mes.db"))
        .env("MES_MODELS", dir.path().join("models"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

/// On time when due ahead of creation; defect rate is a flat 2.26.
fn write_models(dir: &Path) {
    let models = dir.join("models");
    std::fs::create_dir_all(&models).unwrap();
    let files = [
        (
            "dnn_delivery_quality_info.json",
            serde_json::json!({
                "format_version": 1,
                "features": ["product_encoded", "planned_qty", "month", "day_of_week", "days_to_due"],
            }),
        ),
        (
            "dnn_delivery_quality_label.json",
            serde_json::json!({ "classes": ["P001", "P002", "P003", "P004", "P005"] }),
        ),
        (
            "dnn_delivery_quality_scaler.json",
            serde_json::json!({ "mean": [0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1] }),
        ),
        (
            "dnn_delivery_quality_model.json",
            serde_json::json!({
                "delivery_head": [{
                    "weights": [[0.0], [0.0], [0.0], [0.0], [1.0]],
                    "bias": [0.0],
                    "activation": "sigmoid"
                }],
                "defect_head": [{
                    "weights": [[0.0], [0.0], [0.0], [0.0], [0.0]],
                    "bias": [2.26],
                    "activation": "linear"
                }]
            }),
        ),
    ];
    for (name, value) in files {
        std::fs::write(models.join(name), value.to_string()).unwrap();
    }
}

fn create_order(dir: &TempDir) -> String {
    let json = json_stdout(mes(dir).args([
        "order", "create", "--product", "P002", "--qty", "30", "--due", "2099-06-01", "--json",
    ]));
    json["order_id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// mes init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_and_database() {
    let dir = TempDir::new().unwrap();
    mes(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: mes.yaml"));

    assert!(dir.path().join("mes.yaml").exists());
    assert!(dir.path().join("mes.db").exists());

    let raw = std::fs::read_to_string(dir.path().join("mes.yaml")).unwrap();
    let cfg: serde_yaml::Value = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(cfg["progress"]["ordering"].as_str(), Some("lenient"));
}

#[test]
fn init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("mes.yaml"), "server:\n  port: 9001\n").unwrap();
    mes(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));

    let raw = std::fs::read_to_string(dir.path().join("mes.yaml")).unwrap();
    assert!(raw.contains("9001"));
}

// ---------------------------------------------------------------------------
// mes order
// ---------------------------------------------------------------------------

#[test]
fn order_lifecycle_without_models() {
    let dir = TempDir::new().unwrap();
    let id = create_order(&dir);

    let list = json_stdout(mes(&dir).args(["order", "list", "--json"]));
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["status"], "S0_PLANNED");
    assert!(list[0]["pred_delivery"].is_null());

    for (seq, label) in [("1", "S1_READY"), ("2", "S2_ASSEMBLY")] {
        let out = json_stdout(mes(&dir).args(["order", "advance", &id, seq, "--json"]));
        assert_eq!(out["order"]["status"], label);
    }

    let shown = json_stdout(mes(&dir).args(["order", "show", &id, "--json"]));
    assert_eq!(shown["order"]["status"], "S2_ASSEMBLY");
    assert_eq!(shown["order"]["product_name"], "Motor Controller Board");
    assert_eq!(shown["results"].as_array().unwrap().len(), 2);
}

#[test]
fn order_create_attaches_predictions() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());
    let json = json_stdout(mes(&dir).args([
        "order", "create", "--product", "P001", "--qty", "10", "--due", "2099-01-01", "--json",
    ]));
    assert_eq!(json["pred_delivery"], true);
    assert_eq!(json["pred_defect_rate"], 2.3);
}

#[test]
fn order_advance_rejects_bad_step() {
    let dir = TempDir::new().unwrap();
    let id = create_order(&dir);
    mes(&dir)
        .args(["order", "advance", &id, "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid operation sequence"));
}

#[test]
fn order_advance_strict_config_rejects_skip() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("mes.yaml"),
        "progress:\n  ordering: strict\n",
    )
    .unwrap();
    let id = create_order(&dir);
    mes(&dir)
        .args(["order", "advance", &id, "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("strict ordering"));
}

#[test]
fn order_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    mes(&dir)
        .args(["order", "show", "6f1c1b64-3b52-4c1f-9d55-1a2b3c4d5e6f"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("work order not found"));
}

#[test]
fn order_list_table_output() {
    let dir = TempDir::new().unwrap();
    create_order(&dir);
    mes(&dir)
        .args(["order", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STATUS"))
        .stdout(predicate::str::contains("S0_PLANNED"));
}

// ---------------------------------------------------------------------------
// mes sensor
// ---------------------------------------------------------------------------

#[test]
fn sensor_record_then_list() {
    let dir = TempDir::new().unwrap();
    let stored = json_stdout(mes(&dir).args([
        "sensor", "record", "--equipment", "EQ-002", "--temperature", "61.5", "--rpm", "1200",
        "--abnormal", "--json",
    ]));
    assert_eq!(stored["equipment_id"], "EQ-002");
    assert_eq!(stored["status"], true);

    let list = json_stdout(mes(&dir).args(["sensor", "list", "--json"]));
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["rpm"], 1200);
    assert!(list[0]["pressure"].is_null());
}

#[test]
fn sensor_record_unknown_equipment_fails() {
    let dir = TempDir::new().unwrap();
    mes(&dir)
        .args(["sensor", "record", "--equipment", "EQ-999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("equipment not found"));
}

// ---------------------------------------------------------------------------
// mes predict
// ---------------------------------------------------------------------------

#[test]
fn predict_with_models() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());
    let json = json_stdout(mes(&dir).args([
        "predict",
        "--product",
        "P003",
        "--qty",
        "100",
        "--due",
        "2025-03-10T00:00",
        "--now",
        "2025-02-28T15:00:00Z",
        "--json",
    ]));
    assert_eq!(json["features"]["product_encoded"], 2.0);
    assert_eq!(json["features"]["month"], 3);
    assert_eq!(json["features"]["day_of_week"], 5);
    assert_eq!(json["features"]["days_to_due"], 9);
    assert_eq!(json["pred_delivery"], true);
}

#[test]
fn predict_without_models_fails() {
    let dir = TempDir::new().unwrap();
    mes(&dir)
        .args(["predict", "--product", "P001", "--qty", "1", "--due", "2099-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unavailable"));
}

// ---------------------------------------------------------------------------
// mes serve
// ---------------------------------------------------------------------------

#[test]
fn serve_refuses_to_start_when_required_models_are_missing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("mes.yaml"), "models:\n  required: true\n").unwrap();
    mes(&dir)
        .args(["serve", "--port", "0", "--bind", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("models"));
}
