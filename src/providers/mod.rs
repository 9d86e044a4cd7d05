//! Dataset providers: a uniform catalog-and-cache contract over several transports.
//!
//! Every provider exposes the same operations ([`Provider`]).  The [`LocalProvider`] reads a
//! pre-populated directory tree.  The remote providers ([`HttpSingleFileProvider`],
//! [`WebDavProvider`], [`FtpProvider`]) share one download/cache/extract flow in
//! [`RemoteProvider`] and each own a [`LocalProvider`] as their cache.

mod auth;
mod ftp;
mod http;
mod local;
mod remote;
mod webdav;

pub use auth::Authenticator;
pub use ftp::{FtpProvider, FtpTransport};
pub use http::{HttpSingleFileProvider, HttpSingleFileTransport};
pub use local::LocalProvider;
pub use remote::RemoteProvider;
pub use webdav::{WebDavProvider, WebDavTransport};

pub use crate::cache::CachedDataset;

use crate::{
    Result,
    config::{Config, ProviderConfig},
    error,
    messages::MessageReporter,
    version::{self, Version, VersionSelector},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, path::Path};

/// The closed set of provider backends.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Http,
    Ftp,
    WebDav,
}

impl ProviderKind {
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Operations every dataset provider supports.
pub trait Provider: Debug + Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Human readable location of the catalog: a directory or a URL.
    fn location(&self) -> String;

    /// Names of every dataset in the catalog.
    ///
    /// Never fails with [`DatasetNotFound`](error::Error::DatasetNotFound).
    fn list_datasets(&self) -> Result<Vec<String>>;

    /// Versions of `name` in the catalog, in no particular order.
    ///
    /// Fails with [`DatasetNotFound`](error::Error::DatasetNotFound) if the catalog has no such
    /// dataset.
    fn list_versions(&self, name: &str) -> Result<Vec<Version>>;

    /// Resolve `selector` and make that version of `name` available locally, downloading it unless
    /// it is already cached or `force_update` is set.
    fn get_folder(&self, name: &str, selector: &VersionSelector, force_update: bool) -> Result<CachedDataset>;

    /// Remove one cached version.  Removing a version that is not cached is a no-op.
    fn del_folder(&self, name: &str, version: &Version) -> Result<()>;

    /// The local directory tree behind this provider, if it is a cache of a remote catalog.
    ///
    /// Operations that only ever touch local data (removal, `list --local`) go through this view.
    fn local_view(&self) -> Option<&LocalProvider> {
        None
    }

    /// Resolve `selector` among `versions` without fetching anything.
    fn get_version(&self, name: &str, selector: &VersionSelector, versions: &[Version]) -> Result<Version> {
        version::resolve(name, selector, versions)
    }
}

/// The catalog and byte transfer of one remote backend.
///
/// [`RemoteProvider`] builds the full [`Provider`] contract on top of this, so a new backend only
/// needs to know how to list directories and copy files.
pub trait Transport: Debug + Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn location(&self) -> String;

    fn list_datasets(&self) -> Result<Vec<String>>;

    /// Raw version names of `name`, or [`DatasetNotFound`](error::Error::DatasetNotFound).
    fn list_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Download every artifact of `name` at `version` into `dest`, each verified complete, and
    /// return their paths.
    fn fetch(&self, name: &str, version: &Version, dest: &Path) -> Result<Vec<std::path::PathBuf>>;
}

/// A configured provider together with the name it was configured under.
#[derive(Debug)]
pub struct NamedProvider {
    pub name: String,
    pub provider: Box<dyn Provider>,
}

/// Build the provider described by `provider_config`.
///
/// Configuration mistakes (missing URL, unknown authentication method, ...) fail here, before any
/// network access.
pub fn make_provider(
    provider_config: &ProviderConfig,
    config: &Config,
    reporter: &MessageReporter,
) -> Result<Box<dyn Provider>> {
    let root = config.root_folder_for(provider_config);
    let name = provider_config.name.as_str();
    let kind = provider_config.kind;

    tracing::debug!(
        "Creating {} provider '{}' with root folder {}",
        kind,
        name,
        root.display()
    );

    let provider: Box<dyn Provider> = match kind {
        ProviderKind::Local => Box::new(LocalProvider::new(root)),
        ProviderKind::Http => {
            let url = required_setting(provider_config, "url", provider_config.url.as_deref())?;
            let dataset_name = required_setting(
                provider_config,
                "dataset_name",
                provider_config.dataset_name.as_deref(),
            )?;
            let transport = HttpSingleFileTransport::new(url, dataset_name, &config.http)?;
            Box::new(RemoteProvider::new(transport, LocalProvider::new(root), reporter.clone()))
        }
        ProviderKind::WebDav => {
            let url = required_setting(provider_config, "url", provider_config.url.as_deref())?;
            let auth = Authenticator::from_config(name, provider_config.auth.as_ref())?;
            let transport = WebDavTransport::new(url, auth, &config.http)?;
            Box::new(RemoteProvider::new(transport, LocalProvider::new(root), reporter.clone()))
        }
        ProviderKind::Ftp => {
            let url = required_setting(provider_config, "url", provider_config.url.as_deref())?;
            let auth = Authenticator::from_config(name, provider_config.auth.as_ref())?;
            let transport = FtpTransport::new(url, provider_config.port, auth, config.http.timeout)?;
            Box::new(RemoteProvider::new(transport, LocalProvider::new(root), reporter.clone()))
        }
    };

    Ok(provider)
}

fn required_setting<'a>(
    provider_config: &ProviderConfig,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str> {
    value.ok_or_else(|| error::Error::MissingProviderSetting {
        provider: provider_config.name.clone(),
        kind: provider_config.kind.to_string(),
        field,
    })
}
