//! End-to-end tests for argument handling and the offline command paths.
//! Nothing in here talks to a real PostgreSQL server.

use assert_cmd::prelude::*; // Add methods on commands
use assert_fs::prelude::*;
use predicates::prelude::*; // Used for writing assertions
use std::process::Command;

fn pgvitals() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("pgvitals-cli")?;
    // Hermetic runs: no stray PGVITALS_* variables, no pgvitals.toml
    // picked up from the working directory.
    cmd.env_clear();
    Ok(cmd)
}

#[test]
fn no_args_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn version_flag_works() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = pgvitals()?;

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pgvitals"));

    Ok(())
}

#[test]
fn ls_lists_every_diagnostic() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("ls").current_dir(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("invalid_indexes"))
        .stdout(predicate::str::contains("duplicated_indexes"))
        .stdout(predicate::str::contains("intersected_indexes"))
        .stdout(predicate::str::contains("unused_indexes"))
        .stdout(predicate::str::contains("foreign_keys_without_index"))
        .stdout(predicate::str::contains("tables_with_missing_indexes"))
        .stdout(predicate::str::contains("tables_without_primary_key"))
        .stdout(predicate::str::contains("indexes_with_null_values"));

    Ok(())
}

#[test]
fn ls_json_is_parseable() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("ls").arg("--json").current_dir(temp.path());
    let output = cmd.assert().success().get_output().stdout.clone();

    let entries: serde_json::Value = serde_json::from_slice(&output)?;
    let entries = entries.as_array().expect("expected a JSON array");
    assert_eq!(entries.len(), 8);
    for entry in entries {
        assert!(entry.get("name").is_some());
        assert!(entry.get("description").is_some());
        assert!(entry.get("runs_on").is_some());
        assert!(entry.get("supports_size_filter").is_some());
    }

    Ok(())
}

#[test]
fn check_requires_a_diagnostic_or_all() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check").current_dir(temp.path());
    cmd.assert().failure().stderr(predicate::str::contains(
        "the following required arguments were not provided:",
    ));

    Ok(())
}

#[test]
fn all_conflicts_with_named_diagnostics() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .arg("--all")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    Ok(())
}

#[test]
fn object_conflicts_with_min_size() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .arg("--object")
        .arg("accounts")
        .arg("--min-size")
        .arg("1024")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    Ok(())
}

#[test]
fn unknown_diagnostic_lists_the_valid_names() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check").arg("nonsense").current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown diagnostic 'nonsense'"))
        .stderr(predicate::str::contains("unused_indexes"));

    Ok(())
}

#[test]
fn size_filter_is_rejected_before_any_connection() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    // No cluster is configured; the filter mismatch must win.
    cmd.arg("check")
        .arg("invalid_indexes")
        .arg("--min-size")
        .arg("100")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("minimum-size filter"));

    Ok(())
}

#[test]
fn malformed_timeout_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .arg("--timeout")
        .arg("soon")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));

    Ok(())
}

#[test]
fn unknown_policy_lists_the_valid_names() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .arg("--policy")
        .arg("yolo")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown failure policy"))
        .stderr(predicate::str::contains("require-primary"));

    Ok(())
}

#[test]
fn check_without_any_cluster_fails_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No cluster configured"));

    Ok(())
}

#[test]
fn replica_url_without_url_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("ping")
        .arg("--replica-url")
        .arg("postgres://postgres@replica:5432/app")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--replica-url requires --url"));

    Ok(())
}

#[test]
fn malformed_primary_url_fails_before_connecting() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("check")
        .arg("unused_indexes")
        .arg("--url")
        .arg("this is not a connection string")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to reach the cluster"));

    Ok(())
}

#[test]
fn missing_config_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = pgvitals()?;

    cmd.arg("--config")
        .arg("/definitely/not/here/pgvitals.toml")
        .arg("ls")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));

    Ok(())
}

#[test]
fn malformed_config_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("pgvitals.toml").write_str("checks = [broken")?;
    let mut cmd = pgvitals()?;

    cmd.arg("--config")
        .arg(temp.child("pgvitals.toml").path())
        .arg("ls")
        .current_dir(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));

    Ok(())
}

#[test]
fn valid_config_file_is_accepted_by_offline_commands() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("pgvitals.toml").write_str(
        r#"
[cluster]
primary = "postgres://postgres@db-1:5432/app"

[checks]
schema = "billing"
failure_policy = "strict"
"#,
    )?;
    let mut cmd = pgvitals()?;

    cmd.arg("--config")
        .arg(temp.child("pgvitals.toml").path())
        .arg("ls")
        .current_dir(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("unused_indexes"));

    Ok(())
}
