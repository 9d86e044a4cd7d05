use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    // Catalog errors
    #[snafu(display("Dataset '{name}' not found at {location}"))]
    DatasetNotFound { name: String, location: String },

    #[snafu(display("No version of dataset '{name}' matches '{selector}'"))]
    VersionNotFound { name: String, selector: String },

    #[snafu(display("Dataset '{name}' exists but has no version '{version}'"))]
    DatasetVersionNotFound { name: String, version: String },

    // Input errors
    #[snafu(display("Invalid dataset reference '{token}': expected NAME or NAME:VERSION"))]
    InvalidDatasetRef { token: String },

    #[snafu(display("Invalid dataset name '{name}': must be a single directory name"))]
    InvalidDatasetName { name: String },

    #[snafu(display(
        "Invalid version selector '{selector}': expected 'latest' or dot-separated numbers and '*'"
    ))]
    InvalidSelector { selector: String },

    #[snafu(display("Invalid version '{version}': expected dot-separated numbers"))]
    InvalidVersion { version: String },

    // Configuration errors
    #[snafu(display("Failed to load configuration: {source}"))]
    ConfigLoad {
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },

    #[snafu(display("Unable to determine the home directory: {source}"))]
    HomeDir { source: etcetera::HomeDirError },

    #[snafu(display("Provider '{name}' is configured more than once"))]
    DuplicateProvider { name: String },

    #[snafu(display("Unsupported authentication method '{method}' for provider '{provider}'"))]
    UnsupportedAuthMethod { provider: String, method: String },

    #[snafu(display("Authentication method '{method}' for provider '{provider}' requires '{field}'"))]
    MissingCredential {
        provider: String,
        method: String,
        field: &'static str,
    },

    #[snafu(display("Provider '{provider}' of type '{kind}' requires the '{field}' setting"))]
    MissingProviderSetting {
        provider: String,
        kind: String,
        field: &'static str,
    },

    #[snafu(display("Invalid URL '{url}': {source}"))]
    InvalidUrl { url: String, source: url::ParseError },

    #[snafu(display("URL '{url}' must use one of the schemes: {}", expected.join(", ")))]
    UnsupportedUrlScheme { url: String, expected: Vec<&'static str> },

    #[snafu(display(
        "Provider '{name}' is not configured. Configured providers: {}",
        available.join(", ")
    ))]
    UnknownProvider { name: String, available: Vec<String> },

    #[snafu(display("Failed to build HTTP client: {message}"))]
    HttpClientBuild { message: String },

    // Transport errors
    #[snafu(display("HTTP request to {url} failed: {source}"))]
    HttpRequest { url: String, source: reqwest::Error },

    #[snafu(display("HTTP request to {url} returned status {status}"))]
    HttpRetryableStatus { url: String, status: u16 },

    #[snafu(display("HTTP request to {url} returned status {status}"))]
    HttpStatus { url: String, status: u16 },

    #[snafu(display("FTP operation '{operation}' on {url} failed: {source}"))]
    Ftp {
        url: String,
        operation: String,
        source: suppaftp::FtpError,
    },

    #[snafu(display("Malformed listing from {url}: {message}"))]
    MalformedListing { url: String, message: String },

    #[snafu(display("Incomplete download of {url}: expected {expected} bytes, got {actual}"))]
    IncompleteDownload { url: String, expected: u64, actual: u64 },

    // Local filesystem errors
    #[snafu(display("{}: {}", path.display(), source))]
    Io { path: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to rename {} to {}: {}", src.display(), dst.display(), source))]
    RenameFile {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create temporary directory in {}: {}", parent.display(), source))]
    TempDirCreation { parent: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to extract archive {}: {source}", path.display()))]
    ArchiveExtractionFailed {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Batch outcome
    #[snafu(display("{failed} of {total} requested datasets could not be {action}"))]
    BatchFailed {
        action: &'static str,
        failed: usize,
        total: usize,
    },
}

impl Error {
    /// True if this error means "this provider does not have the dataset", which is the only
    /// outcome that lets a multi-provider operation move on to the next provider.
    pub fn is_dataset_not_found(&self) -> bool {
        matches!(self, Self::DatasetNotFound { .. })
    }

    /// True for both flavours of "no such version": a selector that matched nothing, and an exact
    /// version that the catalog does not contain.
    pub fn is_version_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. } | Self::DatasetVersionNotFound { .. }
        )
    }

    /// The remote could not be reached at all: connection failures, timeouts, 429 and 5xx.
    ///
    /// Remote providers fall back to their local cache on these when resolving a selector.
    /// Rejected credentials, other 4xx statuses and unreadable listings are not included, since
    /// the server answered.
    pub fn is_remote_unavailable(&self) -> bool {
        match self {
            Self::HttpRequest { .. } | Self::HttpRetryableStatus { .. } => true,
            Self::Ftp { source, .. } => matches!(source, suppaftp::FtpError::ConnectionError(_)),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
