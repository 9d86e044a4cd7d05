use super::Message;
use crate::{providers::ProviderKind, version::Version};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Messages related to talking to a remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FetchMessage {
    ListingRemote {
        provider: ProviderKind,
        location: String,
        name: String,
    },
    OfflineFallback {
        provider: ProviderKind,
        name: String,
        error: String,
    },
    Downloading {
        provider: ProviderKind,
        name: String,
        version: String,
    },
    ArtifactDownloaded {
        path: PathBuf,
        bytes: u64,
    },
    Extracting {
        path: PathBuf,
    },
}

impl FetchMessage {
    pub fn listing_remote(provider: ProviderKind, location: &str, name: &str) -> Self {
        Self::ListingRemote {
            provider,
            location: location.to_string(),
            name: name.to_string(),
        }
    }

    pub fn offline_fallback(provider: ProviderKind, name: &str, error: &crate::Error) -> Self {
        Self::OfflineFallback {
            provider,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    pub fn downloading(provider: ProviderKind, name: &str, version: &Version) -> Self {
        Self::Downloading {
            provider,
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn artifact_downloaded(path: &Path, bytes: u64) -> Self {
        Self::ArtifactDownloaded {
            path: path.to_path_buf(),
            bytes,
        }
    }

    pub fn extracting(path: &Path) -> Self {
        Self::Extracting {
            path: path.to_path_buf(),
        }
    }
}

impl From<FetchMessage> for Message {
    fn from(msg: FetchMessage) -> Self {
        Message::Fetch(msg)
    }
}
