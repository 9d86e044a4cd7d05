use super::{Authenticator, ProviderKind, RemoteProvider, Transport};
use crate::{
    Result, cache,
    config::HttpConfig,
    error,
    http::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, HttpClient, Method},
    version::Version,
};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use url::Url;

/// A provider whose catalog is a tree of WebDAV collections: `<url>/<name>/<version>/<files>`.
pub type WebDavProvider = RemoteProvider<WebDavTransport>;

const DAV_NAMESPACE: &str = "DAV:";

/// Properties requested for every member of a collection.
const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
  </d:prop>
</d:propfind>"#;

/// Characters escaped when a dataset, version or file name becomes a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One member of a collection, as reported by `PROPFIND`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DavEntry {
    name: String,
    is_collection: bool,
    size: Option<u64>,
}

#[derive(Debug)]
pub struct WebDavTransport {
    base: Url,
    auth: Authenticator,
    client: HttpClient,
}

impl WebDavTransport {
    pub fn new(url: &str, auth: Authenticator, http_config: &HttpConfig) -> Result<Self> {
        let mut base = Url::parse(url).context(error::InvalidUrlSnafu { url })?;
        if !matches!(base.scheme(), "http" | "https") {
            return error::UnsupportedUrlSchemeSnafu {
                url: base.to_string(),
                expected: vec!["http", "https"],
            }
            .fail();
        }

        // Relative joins only descend into the base if it ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            auth,
            client: HttpClient::new(http_config)?,
        })
    }

    /// URL of the collection (or file) reached by descending through `segments`.
    fn url_for(&self, segments: &[&str], collection: bool) -> Result<Url> {
        let mut relative = segments
            .iter()
            .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        if collection && !relative.is_empty() {
            relative.push('/');
        }

        self.base
            .join(&relative)
            .context(error::InvalidUrlSnafu { url: relative.clone() })
    }

    /// Members of the collection at `url`, or `None` if there is no such collection.
    fn propfind(&self, url: &Url) -> Result<Option<Vec<DavEntry>>> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("depth"), HeaderValue::from_static("1"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/xml; charset=utf-8"),
        );

        // Method names are valid tokens, this cannot fail
        let method = Method::from_bytes(b"PROPFIND").map_err(|e| error::Error::HttpClientBuild {
            message: e.to_string(),
        })?;

        tracing::debug!("PROPFIND {}", url);
        let response = self
            .client
            .send(method, url.as_str(), &headers, &self.auth, Some(PROPFIND_BODY))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return error::HttpStatusSnafu {
                url: url.as_str(),
                status: status.as_u16(),
            }
            .fail();
        }

        let body = response
            .text()
            .with_context(|_| error::HttpRequestSnafu { url: url.as_str() })?;

        parse_multistatus(url, &body).map(Some)
    }

    fn dataset_not_found(&self, name: &str) -> error::Error {
        error::Error::DatasetNotFound {
            name: name.to_string(),
            location: self.location(),
        }
    }
}

impl Transport for WebDavTransport {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WebDav
    }

    fn location(&self) -> String {
        self.base.to_string()
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        let entries = self.propfind(&self.base)?.ok_or_else(|| error::Error::HttpStatus {
            url: self.base.to_string(),
            status: 404,
        })?;

        Ok(collection_names(entries))
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let url = self.url_for(&[name], true)?;
        let entries = self
            .propfind(&url)?
            .ok_or_else(|| self.dataset_not_found(name))?;

        Ok(collection_names(entries))
    }

    fn fetch(&self, name: &str, version: &Version, dest: &Path) -> Result<Vec<PathBuf>> {
        let url = self.url_for(&[name, version.as_str()], true)?;
        let entries = self
            .propfind(&url)?
            .ok_or_else(|| error::Error::DatasetVersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })?;

        let mut artifacts = Vec::new();
        for entry in entries.into_iter().filter(|e| !e.is_collection) {
            if cache::is_hidden(&entry.name) {
                continue;
            }

            let file_url = self.url_for(&[name, version.as_str(), &entry.name], false)?;
            let path = dest.join(&entry.name);
            let bytes = self.client.download_to(file_url.as_str(), &self.auth, &path)?;

            // The listing is a second opinion on the size, for servers that stream without a
            // Content-Length
            if let Some(expected) = entry.size {
                if expected != bytes {
                    return error::IncompleteDownloadSnafu {
                        url: file_url.as_str(),
                        expected,
                        actual: bytes,
                    }
                    .fail();
                }
            }

            artifacts.push(path);
        }

        if artifacts.is_empty() {
            tracing::warn!("{} {} on {} contains no files", name, version, self.location());
        }

        Ok(artifacts)
    }
}

/// Names of the visible sub-collections, sorted.
fn collection_names(entries: Vec<DavEntry>) -> Vec<String> {
    let mut names: Vec<String> = entries
        .into_iter()
        .filter(|e| e.is_collection && !cache::is_hidden(&e.name))
        .map(|e| e.name)
        .collect();
    names.sort();
    names
}

/// Parse a `207 Multi-Status` body into the members of the collection at `request_url`.
///
/// The response also describes the collection itself; that entry is dropped.
fn parse_multistatus(request_url: &Url, body: &str) -> Result<Vec<DavEntry>> {
    let malformed = |message: String| error::Error::MalformedListing {
        url: request_url.to_string(),
        message,
    };

    let doc = roxmltree::Document::parse(body).map_err(|e| malformed(e.to_string()))?;

    let root = doc.root_element();
    if !root.has_tag_name((DAV_NAMESPACE, "multistatus")) {
        return Err(malformed(format!(
            "expected a DAV multistatus document, found <{}>",
            root.tag_name().name()
        )));
    }

    let own_path = decoded_path(request_url.path());
    let mut entries = Vec::new();

    for response in root
        .children()
        .filter(|n| n.has_tag_name((DAV_NAMESPACE, "response")))
    {
        let href = response
            .children()
            .find(|n| n.has_tag_name((DAV_NAMESPACE, "href")))
            .and_then(|n| n.text())
            .map(str::trim)
            .ok_or_else(|| malformed("response without href".to_string()))?;

        // Servers answer with either an absolute URL or an absolute path
        let href_path = match Url::parse(href) {
            Ok(absolute) => absolute.path().to_string(),
            Err(_) => href.to_string(),
        };
        let path = decoded_path(&href_path);
        if path == own_path {
            continue;
        }

        let Some(name) = path.rsplit('/').next().filter(|n| !n.is_empty()) else {
            continue;
        };

        let is_collection = response
            .descendants()
            .any(|n| n.has_tag_name((DAV_NAMESPACE, "collection")))
            || href_path.ends_with('/');

        let size = response
            .descendants()
            .find(|n| n.has_tag_name((DAV_NAMESPACE, "getcontentlength")))
            .and_then(|n| n.text())
            .and_then(|t| t.trim().parse().ok());

        entries.push(DavEntry {
            name: name.to_string(),
            is_collection,
            size,
        });
    }

    Ok(entries)
}

/// Percent-decoded path without its trailing slash, for comparisons and names.
fn decoded_path(path: &str) -> String {
    percent_decode_str(path.trim_end_matches('/'))
        .decode_utf8_lossy()
        .into_owned()
}
