//! `dsfetch remove` on local trees and remote caches
use crate::utils::DsFetch;
use predicates::prelude::*;

const NAS: &str = r#"
[[providers]]
name = "nas"
type = "webdav"
url = "https://nas.invalid/datasets/"
"#;

#[test]
fn test_remove_one_version_from_remote_cache() {
    let mut dsfetch = DsFetch::with_config(NAS);
    let cache = dsfetch.test_fs().cache_dir().join("nas");
    dsfetch
        .test_fs()
        .populate(&cache, &[("mnist", "1.0.2"), ("mnist", "1.0.3")]);

    dsfetch
        .cmd
        .args(["remove", "mnist:1.0.2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed dataset mnist 1.0.2"));

    assert!(!cache.join("mnist").join("1.0.2").exists());
    assert!(cache.join("mnist").join("1.0.3").exists());
}

#[test]
fn test_remove_bare_name_removes_every_version() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    dsfetch
        .test_fs()
        .populate(&cache, &[("mnist", "1.0.2"), ("mnist", "2.0.4"), ("cifar", "1.0.0")]);

    dsfetch.cmd.args(["remove", "mnist"]).assert().success();

    assert!(!cache.join("mnist").exists());
    assert!(cache.join("cifar").join("1.0.0").exists());
}

#[test]
fn test_remove_all() {
    let mut dsfetch = DsFetch::with_config(NAS);
    let cache = dsfetch.test_fs().cache_dir().join("nas");
    dsfetch
        .test_fs()
        .populate(&cache, &[("mnist", "1.0.2"), ("cifar", "1.0.0")]);

    dsfetch.cmd.args(["remove", "--all"]).assert().success();

    assert!(!cache.join("mnist").exists());
    assert!(!cache.join("cifar").exists());

    // Nothing left, so a second run is a no-op
    let mut dsfetch = dsfetch.reset();
    dsfetch
        .cmd
        .args(["remove", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_remove_missing_dataset_fails_but_continues() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    dsfetch.test_fs().populate(&cache, &[("cifar", "1.0.0")]);

    dsfetch
        .cmd
        .args(["remove", "imagenet", "cifar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing removed for imagenet"))
        .stderr(predicate::str::contains("1 of 2 requested datasets could not be removed"));

    assert!(!cache.join("cifar").exists());
}

#[test]
fn test_remove_rejects_paths_as_names() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    let outside = dsfetch.test_fs().root.path().join("outside");
    dsfetch.test_fs().populate(&cache, &[("mnist", "1.0.0")]);
    dsfetch.test_fs().populate(&outside, &[("keep", "1.0.0")]);

    dsfetch
        .cmd
        .args(["remove", "../outside"])
        .arg(outside.as_os_str())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid dataset reference"));

    assert!(outside.join("keep").join("1.0.0").exists());
    assert!(cache.join("mnist").join("1.0.0").exists());
}
