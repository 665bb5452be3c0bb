#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn bagit() -> Command {
    let mut cmd = Command::cargo_bin("bagit").expect("cargo bin");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn sample_directory() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("a.txt"), b"hello").expect("write a.txt");
    fs::create_dir(dir.path().join("sub")).expect("mkdir sub");
    fs::write(dir.path().join("sub/b.txt"), b"world").expect("write b.txt");
    dir
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    bagit()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn bag_then_validate() {
    let dir = sample_directory();

    bagit()
        .arg("--checksum-algorithm")
        .arg("sha256")
        .arg("--bag")
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("manifest-sha256.txt").is_file());

    bagit()
        .arg("--is-valid")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));

    bagit()
        .arg("--is-complete")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("is complete"));
}

#[test]
fn invalid_bag_exits_non_zero() {
    let dir = sample_directory();
    bagit().arg("--bag").arg(dir.path()).assert().success();
    fs::write(dir.path().join("data/a.txt"), b"tampered").unwrap();

    bagit()
        .arg("--is-valid")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("data/a.txt"));
}

#[test]
fn batch_continues_after_failure() {
    let good = sample_directory();
    let bad = sample_directory();
    bagit().arg("--bag").arg(good.path()).arg(bad.path()).assert().success();
    fs::remove_file(bad.path().join("bagit.txt")).unwrap();

    bagit()
        .arg("--is-complete")
        .arg(bad.path())
        .arg(good.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("is not complete"))
        .stdout(predicate::str::contains("is complete"));
}

#[test]
fn dry_run_leaves_directory_alone() {
    let dir = sample_directory();

    bagit()
        .arg("-d")
        .arg("--bag")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Would move"));

    assert!(!dir.path().join("data").exists());
    assert!(dir.path().join("a.txt").is_file());
}

#[test]
fn rebagging_fails() {
    let dir = sample_directory();
    bagit().arg("--bag").arg(dir.path()).assert().success();

    bagit()
        .arg("--bag")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already bagged"));
}

#[test]
fn unknown_algorithm_is_usage_error() {
    let dir = sample_directory();

    bagit()
        .arg("--checksum-algorithm")
        .arg("crc32")
        .arg("--bag")
        .arg(dir.path())
        .assert()
        .code(2);
    assert!(!dir.path().join("data").exists());
}

#[test]
fn unknown_algorithm_in_config_fails_without_bagging() {
    let dir = sample_directory();
    let config_dir = TempDir::new().expect("tempdir");
    let config_path = config_dir.path().join("bagit.toml");
    fs::write(&config_path, "[bag]\nchecksum_algorithm = \"crc32\"\n").expect("write config");

    bagit()
        .arg("--config")
        .arg(&config_path)
        .arg("--bag")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("crc32"));
    assert!(!dir.path().join("data").exists());
    assert!(dir.path().join("a.txt").is_file());
}

#[test]
fn dry_run_plan_and_errors_are_reported_once() {
    let dir = sample_directory();

    let output = bagit()
        .env("RUST_LOG", "info")
        .arg("--dryrun")
        .arg("--bag")
        .arg(dir.path())
        .output()
        .expect("run bagit");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stdout.matches("Would move").count(), 2);
    assert!(!stderr.contains("Would"));

    bagit().arg("--bag").arg(dir.path()).assert().success();
    let output = bagit()
        .env("RUST_LOG", "info")
        .arg("--bag")
        .arg(dir.path())
        .output()
        .expect("run bagit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("already bagged").count(), 1);
}
