use super::Message;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Messages related to the local dataset cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheMessage {
    CacheLookup { name: String, version: String },
    CacheHit { name: String, version: String, path: PathBuf },
    CacheMiss { name: String, version: String },
    ForcedRefresh { name: String, version: String },
    Published { name: String, version: String, path: PathBuf },
    Removed { name: String, version: String, path: PathBuf },
}

impl CacheMessage {
    pub fn lookup(name: &str, version: &Version) -> Self {
        Self::CacheLookup {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn hit(name: &str, version: &Version, path: &Path) -> Self {
        Self::CacheHit {
            name: name.to_string(),
            version: version.to_string(),
            path: path.to_path_buf(),
        }
    }

    pub fn miss(name: &str, version: &Version) -> Self {
        Self::CacheMiss {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn forced_refresh(name: &str, version: &Version) -> Self {
        Self::ForcedRefresh {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn published(name: &str, version: &Version, path: &Path) -> Self {
        Self::Published {
            name: name.to_string(),
            version: version.to_string(),
            path: path.to_path_buf(),
        }
    }

    pub fn removed(name: &str, version: &Version, path: &Path) -> Self {
        Self::Removed {
            name: name.to_string(),
            version: version.to_string(),
            path: path.to_path_buf(),
        }
    }
}

impl From<CacheMessage> for Message {
    fn from(msg: CacheMessage) -> Self {
        Message::Cache(msg)
    }
}
