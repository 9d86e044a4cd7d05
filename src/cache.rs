//! The on-disk layout of a provider's cache and the atomic publish of new entries.
//!
//! A cache entry is the directory `<root>/<name>/<version>`.  Its presence is the only signal that
//! a version is cached, so it must never be visible half-written: new entries are assembled in a
//! hidden staging directory next to their final location and renamed into place.

use crate::{Result, error, version::Version};
use serde::Serialize;
use snafu::ResultExt;
use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

const STAGING_PREFIX: &str = ".staging-";
const STALE_PREFIX: &str = ".stale-";

/// A dataset version that is materialized in a local cache directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CachedDataset {
    pub name: String,

    /// The version the selector resolved to
    pub version: Version,

    /// `<root>/<name>/<version>`
    pub path: PathBuf,
}

/// Path of the cache entry for `name` at `version` under `root`.
pub(crate) fn entry_path(root: &Path, name: &str, version: &Version) -> PathBuf {
    root.join(name).join(version.as_str())
}

/// A dataset name must be exactly one ordinary path component, so that `<root>/<name>` never
/// leaves `root`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        error::InvalidDatasetNameSnafu { name }.fail()
    }
}

/// Entries whose name starts with a dot are staging areas, leftovers or unrelated files, never
/// datasets or versions.
pub(crate) fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// Build a new cache entry for `name` at `version` with `fill` and make it visible atomically.
///
/// `fill` receives an empty staging directory on the same filesystem as the entry.  If it fails
/// (or panics) the staging directory is removed and any existing entry is left untouched.  A
/// dataset directory created just for this entry is removed again on failure.
///
/// Without `force`, an entry that appears while `fill` runs (another process won the race) is
/// kept and ours discarded.  With `force`, an existing entry is moved aside, replaced, and only
/// then deleted.
pub(crate) fn publish<F>(root: &Path, name: &str, version: &Version, force: bool, fill: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    check_name(name)?;

    let entry = entry_path(root, name, version);
    let parent = root.join(name);

    fs::create_dir_all(&parent).with_context(|_| error::IoSnafu { path: parent.clone() })?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)
        .with_context(|_| error::TempDirCreationSnafu { parent: parent.clone() })?;

    if let Err(e) = fill(staging.path()) {
        drop(staging);
        // Only succeeds if no other version of the dataset is cached
        let _ = fs::remove_dir(&parent);
        return Err(e);
    }

    if force && entry.exists() {
        return replace_entry(staging, &entry, &parent);
    }

    // Use keep() to take over cleanup of the staging directory from here on
    let staging_path = staging.keep();

    match fs::rename(&staging_path, &entry) {
        Ok(()) => Ok(entry),
        Err(e) if is_lost_race(&e) => {
            tracing::debug!(
                "Cache entry {} appeared while downloading; keeping the existing one",
                entry.display()
            );
            let _ = fs::remove_dir_all(&staging_path);
            Ok(entry)
        }
        Err(e) => {
            let _ = fs::remove_dir_all(&staging_path);
            Err(e).with_context(|_| error::RenameFileSnafu {
                src: staging_path.clone(),
                dst: entry.clone(),
            })
        }
    }
}

/// Swap a freshly staged directory in for an existing entry.
///
/// The old entry moves into a hidden holding directory which is deleted when it goes out of scope,
/// after the new entry is in place.  If the second rename fails the old entry is moved back.
fn replace_entry(staging: tempfile::TempDir, entry: &Path, parent: &Path) -> Result<PathBuf> {
    let stale = tempfile::Builder::new()
        .prefix(STALE_PREFIX)
        .tempdir_in(parent)
        .with_context(|_| error::TempDirCreationSnafu {
            parent: parent.to_path_buf(),
        })?;
    let stale_entry = stale.path().join("entry");

    fs::rename(entry, &stale_entry).with_context(|_| error::RenameFileSnafu {
        src: entry.to_path_buf(),
        dst: stale_entry.clone(),
    })?;

    let staging_path = staging.keep();

    if let Err(e) = fs::rename(&staging_path, entry) {
        let _ = fs::remove_dir_all(&staging_path);
        if let Err(restore) = fs::rename(&stale_entry, entry) {
            tracing::warn!(
                "Failed to restore {} after a failed refresh: {}",
                entry.display(),
                restore
            );
        }
        return Err(e).with_context(|_| error::RenameFileSnafu {
            src: staging_path.clone(),
            dst: entry.to_path_buf(),
        });
    }

    if let Err(e) = stale.close() {
        tracing::warn!("Failed to remove the previous copy of {}: {}", entry.display(), e);
    }

    Ok(entry.to_path_buf())
}

fn is_lost_race(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty)
}
