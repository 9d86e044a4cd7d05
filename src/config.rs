use crate::{Result, cli::CliArgs, error, providers::ProviderKind};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

/// Name of the config file looked up in the user's config directory.
const CONFIG_FILE_NAME: &str = "dsfetch.toml";

/// Prefix of environment variables that override config file settings.
const ENV_PREFIX: &str = "DSFETCH_";

/// Name of the provider used when the configuration does not list any.
pub const DEFAULT_PROVIDER_NAME: &str = "default";

/// Configuration settings for dsfetch.
///
/// Loaded from built-in defaults, then the config file, then `DSFETCH_*` environment variables,
/// each layer overriding the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which provider caches live unless a provider sets its own `root_folder`.
    pub cache_dir: PathBuf,

    /// Log filter expression, used when neither `-v` nor `DSFETCH_LOG`/`RUST_LOG` is given.
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub http: HttpConfig,

    /// Configured providers, in precedence order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Settings for every HTTP-based transport (single-file HTTP and WebDAV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall timeout for one request, including reading the body.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// How many times a failed request is retried.
    pub retries: usize,

    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,

    /// Proxy URL for all requests (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
            proxy: None,
        }
    }
}

/// One `[[providers]]` entry of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name used to select this provider on the command line.
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// Local directory holding (or caching) this provider's datasets.
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Remote location, required for every provider type except `local`.
    #[serde(default)]
    pub url: Option<String>,

    /// Name under which a single-file HTTP provider exposes its one dataset.
    #[serde(default)]
    pub dataset_name: Option<String>,

    /// FTP control port, overriding the one in the URL.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl ProviderConfig {
    /// A local provider rooted at `root_folder`.
    pub fn local(name: impl Into<String>, root_folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::Local,
            root_folder: Some(root_folder.into()),
            url: None,
            dataset_name: None,
            port: None,
            auth: None,
        }
    }
}

/// Raw `auth` table of a provider.
///
/// Kept loosely typed so that an unknown `method` is reported as a provider construction error
/// naming the provider, see [`crate::providers::Authenticator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub method: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Load the configuration, honoring the config file named on the command line (or in
    /// `DSFETCH_CONFIG`).
    pub fn load(args: &CliArgs) -> Result<Self> {
        use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};

        let strategy = choose_app_strategy(AppStrategyArgs {
            top_level_domain: "org".to_string(),
            author: "dsfetch".to_string(),
            app_name: "dsfetch".to_string(),
        })
        .context(error::HomeDirSnafu)?;

        let defaults = Self::with_cache_dir(strategy.cache_dir());

        match &args.config {
            Some(path) => Self::load_from(defaults, Some(path), None),
            None => Self::load_from(defaults, None, Some(&strategy.in_config_dir(CONFIG_FILE_NAME))),
        }
    }

    /// Built-in defaults, with the given cache directory and no providers.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            log_level: None,
            http: HttpConfig::default(),
            providers: Vec::new(),
        }
    }

    /// Layer `explicit_file` (which must exist) or `optional_file` (read only if present) and the
    /// environment on top of `defaults`.
    pub(crate) fn load_from(
        defaults: Self,
        explicit_file: Option<&Path>,
        optional_file: Option<&Path>,
    ) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(defaults));

        if let Some(path) = explicit_file {
            tracing::debug!("Reading config file {}", path.display());
            figment = figment.merge(Toml::file_exact(path));
        } else if let Some(path) = optional_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["config", "log"])
                .split("__"),
        );

        let mut config: Self = figment.extract().context(error::ConfigLoadSnafu)?;
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// The configured providers in precedence order, or the single default local provider when
    /// none are configured.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        if self.providers.is_empty() {
            vec![ProviderConfig::local(DEFAULT_PROVIDER_NAME, &self.cache_dir)]
        } else {
            self.providers.clone()
        }
    }

    /// The local directory a provider stores its datasets in.
    ///
    /// An explicit `root_folder` wins.  Otherwise a local provider uses the cache directory itself
    /// and a remote provider gets its own subdirectory, so that two remotes never share a cache.
    pub fn root_folder_for(&self, provider: &ProviderConfig) -> PathBuf {
        match (&provider.root_folder, provider.kind) {
            (Some(root), _) => root.clone(),
            (None, ProviderKind::Local) => self.cache_dir.clone(),
            (None, _) => self.cache_dir.join(&provider.name),
        }
    }

    fn expand_paths(&mut self) {
        self.cache_dir = expand_tilde(&self.cache_dir);
        for provider in &mut self.providers {
            if let Some(root) = &provider.root_folder {
                provider.root_folder = Some(expand_tilde(root));
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return error::DuplicateProviderSnafu {
                    name: provider.name.clone(),
                }
                .fail();
            }
        }
        Ok(())
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
pub(crate) fn create_test_env() -> (tempfile::TempDir, Config) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::with_cache_dir(temp_dir.path().join("cache"));
    (temp_dir, config)
}
