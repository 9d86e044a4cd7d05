//! Very basic smoke tests that just confirm that the `dsfetch` binary is able to run and reject bad
//! input
use crate::utils::DsFetch;
use predicates::prelude::*;

/// Basic test, that `dsfetch` runs at all, and that `--help` at least looks vaguely right.
#[test]
fn test_help_output() {
    let mut dsfetch = DsFetch::find();

    dsfetch
        .cmd
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dsfetch"))
        .stdout(predicate::str::contains("download"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_version_output() {
    let mut dsfetch = DsFetch::find();

    dsfetch
        .cmd
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^dsfetch \d+\.\d+\.\d+\n$").unwrap());
}

/// A malformed dataset reference is a usage error, caught before any config is read.
#[test]
fn test_bad_dataset_ref() {
    let mut dsfetch = DsFetch::find();

    dsfetch
        .cmd
        .args(["download", "mnist:1:2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid dataset reference"));
}

#[test]
fn test_unknown_provider() {
    let mut dsfetch = DsFetch::with_config(
        r#"
        [[providers]]
        name = "shared"
        type = "local"
        "#,
    );

    dsfetch
        .cmd
        .args(["list", "nas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provider 'nas' is not configured"))
        .stderr(predicate::str::contains("shared"));
}

#[test]
fn test_invalid_provider_config() {
    let mut dsfetch = DsFetch::with_config(
        r#"
        [[providers]]
        name = "nas"
        type = "webdav"
        "#,
    );

    dsfetch
        .cmd
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires the 'url' setting"));
}
