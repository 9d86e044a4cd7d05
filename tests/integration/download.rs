//! `dsfetch download` from local and HTTP providers
use crate::utils::DsFetch;
use httpmock::prelude::*;
use predicates::prelude::*;

fn http_provider(url: &str) -> String {
    format!(
        r#"
        [[providers]]
        name = "eurosat"
        type = "http"
        url = "{url}"
        dataset_name = "eurosat"
        "#
    )
}

#[test]
fn test_download_from_local_provider() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    dsfetch
        .test_fs()
        .populate(&cache, &[("mnist", "1.0.2"), ("mnist", "1.0.10"), ("mnist", "2.0.4")]);

    dsfetch
        .cmd
        .args(["download", "mnist:1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset mnist 1.0.10 loaded from 'default'"))
        .stdout(predicate::str::contains(
            cache.join("mnist").join("1.0.10").display().to_string(),
        ));
}

#[test]
fn test_download_from_http_once() {
    let server = MockServer::start();
    let file = server.mock(|when, then| {
        when.method(GET).path("/files/EuroSAT.csv");
        then.status(200).body("label,path\nforest,Forest_1.jpg\n");
    });

    let mut dsfetch = DsFetch::with_config(&http_provider(&server.url("/files/EuroSAT.csv")));
    let entry = dsfetch.test_fs().cache_dir().join("eurosat").join("eurosat").join("1.0.0");

    dsfetch
        .cmd
        .args(["download", "eurosat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset eurosat 1.0.0 loaded from 'eurosat'"));

    assert_eq!(
        std::fs::read_to_string(entry.join("EuroSAT.csv")).unwrap(),
        "label,path\nforest,Forest_1.jpg\n"
    );

    // Already cached, so the second run must not download again
    let mut dsfetch = dsfetch.reset();
    dsfetch
        .cmd
        .args(["download", "eurosat:1.0.0"])
        .assert()
        .success();

    file.assert_calls(1);
}

#[test]
fn test_download_falls_through_to_next_provider() {
    let server = MockServer::start();
    let any = server.mock(|_, then| {
        then.status(200);
    });

    let config = format!(
        r#"{}
        [[providers]]
        name = "shared"
        type = "local"
        root_folder = "shared"
        "#,
        http_provider(&server.url("/files/EuroSAT.csv"))
    );
    let mut dsfetch = DsFetch::with_config(&config);
    let shared = dsfetch.test_fs().root.path().join("shared");
    dsfetch.test_fs().populate(&shared, &[("mnist", "1.0.0")]);

    dsfetch
        .cmd
        .args(["download", "mnist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset mnist 1.0.0 loaded from 'shared'"));

    any.assert_calls(0);
}

#[test]
fn test_download_reports_every_failure() {
    let mut dsfetch = DsFetch::with_config("");
    let cache = dsfetch.test_fs().cache_dir();
    dsfetch.test_fs().populate(&cache, &[("mnist", "1.0.0")]);

    dsfetch
        .cmd
        .args(["download", "imagenet", "mnist", "mnist:3.*"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Dataset mnist 1.0.0 loaded"))
        .stderr(predicate::str::contains("Failed to download imagenet"))
        .stderr(predicate::str::contains("Failed to download mnist:3.*"))
        .stderr(predicate::str::contains("2 of 3 requested datasets could not be downloaded"));
}

#[test]
fn test_download_http_error_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/EuroSAT.csv");
        then.status(404);
    });

    let mut dsfetch = DsFetch::with_config(&http_provider(&server.url("/files/EuroSAT.csv")));

    dsfetch
        .cmd
        .args(["download", "eurosat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("returned status 404"));

    assert!(
        !dsfetch
            .test_fs()
            .cache_dir()
            .join("eurosat")
            .join("eurosat")
            .exists()
    );
}

#[test]
fn test_json_messages() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/EuroSAT.csv");
        then.status(200).body("label,path\n");
    });

    let mut dsfetch = DsFetch::with_config(&http_provider(&server.url("/files/EuroSAT.csv")));

    dsfetch
        .cmd
        .args(["--message-format", "json", "download", "eurosat"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"cache""#))
        .stdout(predicate::str::contains(r#""event":"cache_miss""#))
        .stdout(predicate::str::contains(r#""event":"published""#));
}
