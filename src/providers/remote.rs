use super::{CachedDataset, LocalProvider, Provider, ProviderKind, Transport};
use crate::{
    Result, archive, cache, error,
    messages::{CacheMessage, FetchMessage, MessageReporter},
    version::{self, Version, VersionSelector},
};
use snafu::ResultExt;
use std::{
    fs,
    time::{Duration, Instant},
};

const SCRATCH_PREFIX: &str = ".download-";

/// A remote catalog fronted by a local cache.
///
/// The transport `T` knows how to list and copy files; this type implements everything else:
/// version resolution, the cache-hit short-circuit, offline fallback, and the download, extract and
/// publish sequence.
#[derive(Debug)]
pub struct RemoteProvider<T> {
    transport: T,
    cache: LocalProvider,
    reporter: MessageReporter,
}

impl<T: Transport> RemoteProvider<T> {
    pub fn new(transport: T, cache: LocalProvider, reporter: MessageReporter) -> Self {
        Self {
            transport,
            cache,
            reporter,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `selector` against the remote catalog.
    ///
    /// When the remote cannot be reached and `force_update` is not set, the local cache is
    /// consulted instead.  If the cache cannot satisfy the selector either, the connection error
    /// is returned.  A remote that answers with an error, such as rejected credentials, is never
    /// bypassed.
    fn resolve_remote(&self, name: &str, selector: &VersionSelector, force_update: bool) -> Result<Version> {
        let kind = self.transport.kind();
        self.reporter
            .report(|| FetchMessage::listing_remote(kind, &self.transport.location(), name));

        let remote_err = match self.list_versions(name) {
            Ok(versions) => return self.get_version(name, selector, &versions),
            Err(e) if e.is_remote_unavailable() && !force_update => e,
            Err(e) => return Err(e),
        };

        let cached = self
            .cache
            .list_versions(name)
            .and_then(|versions| version::resolve(name, selector, &versions));

        match cached {
            Ok(version) => {
                tracing::warn!(
                    "Could not list {} on {}, using cached version {}: {}",
                    name,
                    self.transport.location(),
                    version,
                    remote_err
                );
                self.reporter
                    .report(|| FetchMessage::offline_fallback(kind, name, &remote_err));
                Ok(version)
            }
            Err(_) => Err(remote_err),
        }
    }

    fn download(&self, name: &str, version: &Version, force_update: bool) -> Result<CachedDataset> {
        let kind = self.transport.kind();
        tracing::info!(
            "Downloading {} {} from {}",
            name,
            version,
            self.transport.location()
        );
        self.reporter
            .report(|| FetchMessage::downloading(kind, name, version));

        let root = self.cache.root_folder();
        fs::create_dir_all(root).with_context(|_| error::IoSnafu {
            path: root.to_path_buf(),
        })?;

        // Raw artifacts live next to the cache so that nothing is left in a system temp dir if we
        // are killed, and hidden so they are never mistaken for a dataset
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .with_context(|_| error::TempDirCreationSnafu {
                parent: root.to_path_buf(),
            })?;

        let started = Instant::now();
        let artifacts = self.transport.fetch(name, version, scratch.path())?;
        tracing::info!(
            "Fetched {} artifact(s) of {} {} in {}",
            artifacts.len(),
            name,
            version,
            humantime::format_duration(Duration::from_millis(started.elapsed().as_millis() as u64))
        );

        for artifact in &artifacts {
            let bytes = fs::metadata(artifact).map(|m| m.len()).unwrap_or_default();
            tracing::debug!("Downloaded {} ({} bytes)", artifact.display(), bytes);
            self.reporter
                .report(|| FetchMessage::artifact_downloaded(artifact, bytes));
        }

        let entry = self.cache.publish(name, version, force_update, |staging| {
            for artifact in &artifacts {
                self.reporter.report(|| FetchMessage::extracting(artifact));
                archive::extract_artifact(artifact, staging)?;
            }
            Ok(())
        })?;

        tracing::info!("Published {} {} at {}", name, version, entry.path.display());
        self.reporter
            .report(|| CacheMessage::published(name, version, &entry.path));

        Ok(entry)
    }

    fn cache_hit(&self, name: &str, version: &Version) -> Option<CachedDataset> {
        self.reporter.report(|| CacheMessage::lookup(name, version));

        let hit = self.cache.lookup(name, version)?;
        tracing::debug!("Cache hit for {} {} at {}", name, version, hit.path.display());
        self.reporter
            .report(|| CacheMessage::hit(name, version, &hit.path));
        Some(hit)
    }
}

impl<T: Transport> Provider for RemoteProvider<T> {
    fn kind(&self) -> ProviderKind {
        self.transport.kind()
    }

    fn location(&self) -> String {
        self.transport.location()
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        self.transport.list_datasets()
    }

    fn list_versions(&self, name: &str) -> Result<Vec<Version>> {
        cache::check_name(name)?;
        Ok(version::parse_versions(self.transport.list_versions(name)?))
    }

    fn get_folder(&self, name: &str, selector: &VersionSelector, force_update: bool) -> Result<CachedDataset> {
        cache::check_name(name)?;

        // An exact version that is already cached needs no catalog at all
        if !force_update {
            if let Some(hit) = selector.as_version().and_then(|v| self.cache_hit(name, &v)) {
                return Ok(hit);
            }
        }

        let version = self.resolve_remote(name, selector, force_update)?;

        if force_update {
            tracing::debug!("Forced refresh of {} {}", name, version);
            self.reporter
                .report(|| CacheMessage::forced_refresh(name, &version));
        } else if let Some(hit) = self.cache_hit(name, &version) {
            return Ok(hit);
        } else {
            tracing::debug!("Cache miss for {} {}", name, version);
            self.reporter.report(|| CacheMessage::miss(name, &version));
        }

        self.download(name, &version, force_update)
    }

    fn del_folder(&self, name: &str, version: &Version) -> Result<()> {
        cache::check_name(name)?;
        let path = self.cache.entry_path(name, version);
        let existed = path.is_dir();

        self.cache.del_folder(name, version)?;

        if existed {
            self.reporter
                .report(|| CacheMessage::removed(name, version, &path));
        }
        Ok(())
    }

    fn local_view(&self) -> Option<&LocalProvider> {
        Some(&self.cache)
    }
}
