use super::{CachedDataset, Provider, ProviderKind};
use crate::{
    Result, cache, error,
    version::{self, Version, VersionSelector},
};
use snafu::ResultExt;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// A catalog that is a directory tree on local disk: `<root>/<name>/<version>/...`.
///
/// Used directly for pre-populated dataset folders, and by every remote provider as its cache.
/// Never touches the network.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root_folder: PathBuf,
}

impl LocalProvider {
    pub fn new(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
        }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Path of the cache entry for `name` at `version`, whether or not it exists.
    pub fn entry_path(&self, name: &str, version: &Version) -> PathBuf {
        cache::entry_path(&self.root_folder, name, version)
    }

    /// The cached entry for exactly `version`, if present.
    pub fn lookup(&self, name: &str, version: &Version) -> Option<CachedDataset> {
        if !cache::is_valid_name(name) {
            return None;
        }
        let path = self.entry_path(name, version);
        path.is_dir().then(|| CachedDataset {
            name: name.to_string(),
            version: version.clone(),
            path,
        })
    }

    /// Build the entry for `name` at `version` with `fill` and publish it atomically.
    pub(crate) fn publish<F>(&self, name: &str, version: &Version, force: bool, fill: F) -> Result<CachedDataset>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let path = cache::publish(&self.root_folder, name, version, force, fill)?;
        Ok(CachedDataset {
            name: name.to_string(),
            version: version.clone(),
            path,
        })
    }

    /// Names of the visible subdirectories of `dir`, or `None` if `dir` does not exist.
    fn subdirectories(dir: &Path) -> Result<Option<Vec<String>>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(error::IoSnafu { path: dir.to_path_buf() }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|_| error::IoSnafu { path: dir.to_path_buf() })?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if cache::is_hidden(&file_name) || !entry.path().is_dir() {
                continue;
            }
            names.push(file_name);
        }

        names.sort();
        Ok(Some(names))
    }
}

impl Provider for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn location(&self) -> String {
        self.root_folder.display().to_string()
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        Ok(Self::subdirectories(&self.root_folder)?.unwrap_or_default())
    }

    fn list_versions(&self, name: &str) -> Result<Vec<Version>> {
        cache::check_name(name)?;
        if cache::is_hidden(name) {
            return error::DatasetNotFoundSnafu {
                name,
                location: self.location(),
            }
            .fail();
        }

        match Self::subdirectories(&self.root_folder.join(name))? {
            Some(raw) => Ok(version::parse_versions(raw)),
            None => error::DatasetNotFoundSnafu {
                name,
                location: self.location(),
            }
            .fail(),
        }
    }

    fn get_folder(&self, name: &str, selector: &VersionSelector, _force_update: bool) -> Result<CachedDataset> {
        let versions = self.list_versions(name)?;
        let version = self.get_version(name, selector, &versions)?;
        let path = self.entry_path(name, &version);

        tracing::debug!("Found {} {} at {}", name, version, path.display());

        Ok(CachedDataset {
            name: name.to_string(),
            version,
            path,
        })
    }

    fn del_folder(&self, name: &str, version: &Version) -> Result<()> {
        cache::check_name(name)?;
        let path = self.entry_path(name, version);

        match fs::remove_dir_all(&path) {
            Ok(()) => tracing::info!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Nothing to remove at {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(e).context(error::IoSnafu { path }),
        }

        // Drop the dataset directory along with its last version so it stops being listed
        let dataset_dir = self.root_folder.join(name);
        if matches!(Self::subdirectories(&dataset_dir), Ok(Some(ref rest)) if rest.is_empty()) {
            if let Err(e) = fs::remove_dir(&dataset_dir) {
                tracing::debug!("Keeping {}: {}", dataset_dir.display(), e);
            }
        }

        Ok(())
    }
}
