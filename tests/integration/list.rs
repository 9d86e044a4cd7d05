//! `dsfetch list` against local trees and remote caches
use crate::utils::DsFetch;
use predicates::prelude::*;

fn shared_provider(dsfetch: &DsFetch) -> std::path::PathBuf {
    dsfetch.test_fs().root.path().join("shared")
}

#[test]
fn test_list_local_provider() {
    let mut dsfetch = DsFetch::with_config(
        r#"
        [[providers]]
        name = "shared"
        type = "local"
        root_folder = "shared"
        "#,
    );
    // A relative root folder resolves against the working directory, which is the temp root
    let shared = shared_provider(&dsfetch);
    dsfetch.test_fs().populate(
        &shared,
        &[("mnist", "1.0.2"), ("mnist", "2.0.4"), ("mnist", "1.0.10"), ("cifar", "1.0.0")],
    );

    dsfetch
        .cmd
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Listing datasets of 'shared' at shared:"))
        .stdout(predicate::str::contains("  cifar: 1.0.0 [latest]\n"))
        .stdout(predicate::str::contains("  mnist: 2.0.4 [latest], 1.0.10, 1.0.2\n"));
}

#[test]
fn test_list_ignores_hidden_entries() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    dsfetch
        .test_fs()
        .populate(&cache, &[("mnist", "1.0.0"), (".staging-x", "1.0.0"), ("mnist", ".download-y")]);

    dsfetch
        .cmd
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Listing datasets of 'default'"))
        .stdout(predicate::str::contains("  mnist: 1.0.0 [latest]\n"))
        .stdout(predicate::str::contains("staging").not())
        .stdout(predicate::str::contains("download").not());
}

/// `--local` on a remote provider reads its cache and never touches the network.
#[test]
fn test_list_remote_cache() {
    let mut dsfetch = DsFetch::with_config(
        r#"
        [[providers]]
        name = "nas"
        type = "webdav"
        url = "https://nas.invalid/datasets/"
        "#,
    );
    let cache = dsfetch.test_fs().cache_dir().join("nas");
    dsfetch.test_fs().populate(&cache, &[("mnist", "1.0.3")]);

    dsfetch
        .cmd
        .args(["list", "nas", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains(cache.display().to_string()))
        .stdout(predicate::str::contains("  mnist: 1.0.3 [latest]\n"));
}
