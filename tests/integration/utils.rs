//! Utility functions to help run our CLI as part of a test
use assert_cmd::Command;
use assert_fs::TempDir;
use std::path::{Path, PathBuf};

/// Isolated directories for one test invocation of `dsfetch`.
pub(crate) struct TestFs {
    pub(crate) root: TempDir,
}

impl TestFs {
    fn new() -> Self {
        Self {
            root: TempDir::with_prefix("dsfetch-").unwrap(),
        }
    }

    pub(crate) fn config_path(&self) -> PathBuf {
        self.root.path().join("dsfetch.toml")
    }

    /// The cache directory named in the generated config file.
    pub(crate) fn cache_dir(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    /// Lay out `<dir>/<name>/<version>/data.txt` for each entry.
    pub(crate) fn populate(&self, dir: &Path, entries: &[(&str, &str)]) {
        for (name, version) in entries {
            let entry = dir.join(name).join(version);
            std::fs::create_dir_all(&entry).unwrap();
            std::fs::write(entry.join("data.txt"), format!("{name} {version}")).unwrap();
        }
    }
}

/// Represents the `dsfetch` binary for use in tests.
///
/// The `cmd` field provides helpers for running the binary and asserting on its output.
pub(crate) struct DsFetch {
    pub(crate) cmd: Command,
    pub(crate) test_fs: Option<TestFs>,
}

impl DsFetch {
    /// Creates a new `DsFetch` that locates the bin
    pub(crate) fn find() -> Self {
        let mut cmd = Command::cargo_bin("dsfetch").expect("Failed to find dsfetch binary");

        // Never let the host's settings leak into a test
        cmd.env_remove("DSFETCH_CONFIG")
            .env_remove("DSFETCH_LOG")
            .env_remove("RUST_LOG");

        Self { cmd, test_fs: None }
    }

    /// Run against a config file in a fresh temp dir.
    ///
    /// `providers` is TOML appended after the generated `cache_dir` setting, typically a list of
    /// `[[providers]]` tables.
    pub(crate) fn with_config(providers: &str) -> Self {
        let mut me = Self::find();
        let test_fs = TestFs::new();

        let config = format!(
            "cache_dir = {:?}\n\n[http]\nretries = 0\n\n{}",
            test_fs.cache_dir().display().to_string(),
            providers
        );
        std::fs::write(test_fs.config_path(), config).unwrap();

        me.cmd.arg("--config").arg(test_fs.config_path());
        me.cmd.current_dir(test_fs.root.path());
        me.test_fs = Some(test_fs);
        me
    }

    /// Clear all arguments that may have been set on the command and start again, keeping the
    /// config file and temp dirs of [`Self::with_config`].
    pub(crate) fn reset(self) -> Self {
        // the `Command` struct doesn't have a way to clear args, so we just recreate it.
        let mut me = Self::find();

        if let Some(test_fs) = self.test_fs {
            me.cmd.arg("--config").arg(test_fs.config_path());
            me.cmd.current_dir(test_fs.root.path());
            me.test_fs = Some(test_fs);
        }

        me
    }

    pub(crate) fn test_fs(&self) -> &TestFs {
        self.test_fs.as_ref().expect("test_fs not set")
    }
}
