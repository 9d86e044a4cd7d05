use super::{Authenticator, ProviderKind, RemoteProvider, Transport};
use crate::{Result, config::HttpConfig, error, http::HttpClient, version::Version};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use url::Url;

/// The only version a single-file HTTP catalog ever has.
const SINGLE_VERSION: &str = "1.0.0";

/// File name used when the URL path does not end in one.
const FALLBACK_FILE_NAME: &str = "download";

/// A provider exposing one file at a URL as a single dataset with a single version.
pub type HttpSingleFileProvider = RemoteProvider<HttpSingleFileTransport>;

/// A degenerate catalog: one dataset, one version, one artifact (the URL itself).
#[derive(Debug)]
pub struct HttpSingleFileTransport {
    url: Url,
    dataset_name: String,
    client: HttpClient,
}

impl HttpSingleFileTransport {
    pub fn new(url: &str, dataset_name: &str, http_config: &HttpConfig) -> Result<Self> {
        let url = Url::parse(url).context(error::InvalidUrlSnafu { url })?;
        if !matches!(url.scheme(), "http" | "https") {
            return error::UnsupportedUrlSchemeSnafu {
                url: url.to_string(),
                expected: vec!["http", "https"],
            }
            .fail();
        }

        Ok(Self {
            url,
            dataset_name: dataset_name.to_string(),
            client: HttpClient::new(http_config)?,
        })
    }

    /// Name of the downloaded file: the last segment of the URL path.
    ///
    /// The extension decides how the artifact is extracted, so it must survive.
    fn file_name(&self) -> String {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                percent_encoding::percent_decode_str(segment)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name == self.dataset_name {
            Ok(())
        } else {
            error::DatasetNotFoundSnafu {
                name,
                location: self.location(),
            }
            .fail()
        }
    }
}

impl Transport for HttpSingleFileTransport {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Http
    }

    fn location(&self) -> String {
        self.url.to_string()
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        Ok(vec![self.dataset_name.clone()])
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        self.check_name(name)?;
        Ok(vec![SINGLE_VERSION.to_string()])
    }

    fn fetch(&self, name: &str, _version: &Version, dest: &Path) -> Result<Vec<PathBuf>> {
        self.check_name(name)?;

        let path = dest.join(self.file_name());
        let bytes = self
            .client
            .download_to(self.url.as_str(), &Authenticator::None, &path)?;
        tracing::debug!("Fetched {} ({} bytes) from {}", name, bytes, self.url);

        Ok(vec![path])
    }
}
