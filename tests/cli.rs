// ABOUTME: Integration tests for the hoist CLI commands.
// ABOUTME: Validates --help output, init scaffolding and offline request description.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn hoist_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("hoist"))
}

const REQUEST: &str = r#"
id: req-cli-1
image_name: billing
tag: v3
issuer: ops@example.com
instance_config:
  prefix: prod
  environment:
    - "DB_PASSWORD|hunter2"
container_config:
  name: api
  ports:
    - internal: 8080
      external: 80
  expose:
    public: true
"#;

#[test]
fn help_shows_commands() {
    hoist_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("hoist.yml");

    hoist_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--node-name", "edge-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created hoist.yml"));

    assert!(config_path.exists(), "hoist.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("node_name: edge-1"));
    assert!(content.contains("failure_policy: abort"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("hoist.yml");

    fs::write(&config_path, "node_name: existing\n").unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "node_name: existing\n");
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("hoist.yml");
    fs::write(&config_path, "node_name: existing\n").unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("node_name: node-1"));
}

#[test]
fn describe_prints_description_without_secrets() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("hoist.yml"),
        "node_name: edge-2\ningress_root_domain: apps.example.com\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("request.yml"), REQUEST).unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .args(["describe", "request.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployment target: edge-2"))
        .stdout(predicate::str::contains("Image: billing:v3"))
        .stdout(predicate::str::contains("Instance prefix: prod"))
        .stdout(predicate::str::contains("Instance environment: DB_PASSWORD"))
        .stdout(predicate::str::contains("Ports: 80->8080"))
        .stdout(predicate::str::contains("Expose: http://prod-api.apps.example.com"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn describe_json_emits_line_events() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("agent.yml");
    fs::write(&config_path, "node_name: edge-3\n").unwrap();
    fs::write(temp_dir.path().join("request.yml"), REQUEST).unwrap();

    let assert = hoist_cmd()
        .current_dir(temp_dir.path())
        .arg("--json")
        .arg("--config")
        .arg(&config_path)
        .args(["describe", "request.yml"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let first: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert_eq!(first["event"], "line");
    assert_eq!(first["text"], "Deployment target: edge-3");
}

#[test]
fn describe_reports_invalid_request() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("request.yml"),
        "id: req-1\nimage_name: \"nginx:1.25\"\ncontainer_config:\n  name: web\n",
    )
    .unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .args(["describe", "request.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid image name: nginx:1.25"));
}

#[test]
fn quiet_and_json_conflict() {
    hoist_cmd()
        .args(["--quiet", "--json", "init"])
        .assert()
        .failure();
}
