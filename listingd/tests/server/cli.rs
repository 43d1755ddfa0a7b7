use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_serve_command() {
    Command::cargo_bin("listingd")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn no_command_prints_a_hint() {
    Command::cargo_bin("listingd")
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("command required"));
}

#[test]
fn file_store_without_data_dir_fails_at_startup() {
    Command::cargo_bin("listingd")
        .unwrap()
        .args(["serve", "--object-store", "file"])
        .env_remove("LISTINGD_DATA_DIR")
        .assert()
        .failure()
        .stderr(predicate::str::contains("data directory is required"));
}

#[test]
fn unknown_store_type_is_rejected_by_clap() {
    Command::cargo_bin("listingd")
        .unwrap()
        .args(["serve", "--object-store", "cloud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
