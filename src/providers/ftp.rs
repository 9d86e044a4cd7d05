use super::{Authenticator, ProviderKind, RemoteProvider, Transport};
use crate::{Result, cache, error, version::Version};
use snafu::ResultExt;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
    time::Duration,
};
use suppaftp::{FtpError, FtpStream, Status, types::FileType};
use url::Url;

/// A provider whose catalog is a tree of FTP directories: `<url>/<name>/<version>/<files>`.
pub type FtpProvider = RemoteProvider<FtpTransport>;

const DEFAULT_PORT: u16 = 21;
const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Talks to an FTP server, opening one control connection per catalog or fetch operation.
#[derive(Debug)]
pub struct FtpTransport {
    host: String,
    port: u16,
    /// Directory holding the datasets, without a trailing slash (`""` for the server root)
    root_path: String,
    auth: Authenticator,
    timeout: Duration,
}

impl FtpTransport {
    /// `port`, when given, overrides the port in `url`.
    pub fn new(url: &str, port: Option<u16>, auth: Authenticator, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(url).context(error::InvalidUrlSnafu { url })?;
        if parsed.scheme() != "ftp" {
            return error::UnsupportedUrlSchemeSnafu {
                url,
                expected: vec!["ftp"],
            }
            .fail();
        }

        let host = parsed
            .host_str()
            .ok_or(url::ParseError::EmptyHost)
            .context(error::InvalidUrlSnafu { url })?
            .to_string();

        let root_path = percent_encoding::percent_decode_str(parsed.path().trim_end_matches('/'))
            .decode_utf8_lossy()
            .into_owned();

        Ok(Self {
            host,
            port: port.or(parsed.port()).unwrap_or(DEFAULT_PORT),
            root_path,
            auth,
            timeout,
        })
    }

    /// Server path reached by descending from the root through `segments`.
    fn remote_path(&self, segments: &[&str]) -> String {
        let mut path = self.root_path.clone();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    fn url_of(&self, path: &str) -> String {
        format!("ftp://{}:{}{}", self.host, self.port, path)
    }

    fn ftp_error(&self, operation: &str, path: &str, source: FtpError) -> error::Error {
        error::Error::Ftp {
            url: self.url_of(path),
            operation: operation.to_string(),
            source,
        }
    }

    /// Run `f` on a fresh, logged-in, binary-mode session and close it afterwards.
    fn with_session<T>(&self, f: impl FnOnce(&mut FtpStream) -> Result<T>) -> Result<T> {
        let mut ftp = self.connect()?;
        let result = f(&mut ftp);
        if let Err(e) = ftp.quit() {
            tracing::debug!("Error closing FTP session with {}: {}", self.host, e);
        }
        result
    }

    fn connect(&self) -> Result<FtpStream> {
        let root = self.remote_path(&[]);

        let addr: SocketAddr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "host name resolved to no address")
                })
            })
            .map_err(|e| self.ftp_error("connect", &root, FtpError::ConnectionError(e)))?;

        tracing::debug!("Connecting to FTP server {} ({})", self.host, addr);
        let mut ftp = FtpStream::connect_timeout(addr, self.timeout)
            .map_err(|e| self.ftp_error("connect", &root, e))?;

        let (user, password) = match &self.auth {
            Authenticator::None => (ANONYMOUS_USER, ANONYMOUS_PASSWORD),
            Authenticator::Simple { username, password } => (username.as_str(), password.as_str()),
        };
        ftp.login(user, password)
            .map_err(|e| self.ftp_error("login", &root, e))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| self.ftp_error("TYPE I", &root, e))?;

        Ok(ftp)
    }

    /// Names in the directory at `path`, or `Ok(None)` if the server says it does not exist.
    fn list_names(&self, ftp: &mut FtpStream, path: &str) -> Result<Option<Vec<String>>> {
        match ftp.nlst(Some(path)) {
            Ok(raw) => Ok(Some(normalize_names(raw))),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(self.ftp_error("NLST", path, e)),
        }
    }

    fn download(&self, ftp: &mut FtpStream, remote: &str, dest: &Path) -> Result<u64> {
        // Not every server implements SIZE; without it only the transfer itself can fail
        let expected = match ftp.size(remote) {
            Ok(size) => Some(size as u64),
            Err(e) => {
                tracing::debug!("SIZE {} not available: {}", remote, e);
                None
            }
        };

        let mut file = std::fs::File::create(dest).with_context(|_| error::IoSnafu {
            path: dest.to_path_buf(),
        })?;

        let mut stream = ftp
            .retr_as_stream(remote)
            .map_err(|e| self.ftp_error("RETR", remote, e))?;
        let copied = std::io::copy(&mut stream, &mut file).with_context(|_| error::IoSnafu {
            path: dest.to_path_buf(),
        });
        ftp.finalize_retr_stream(stream)
            .map_err(|e| self.ftp_error("RETR", remote, e))?;
        let written = copied?;

        file.sync_all().with_context(|_| error::IoSnafu {
            path: dest.to_path_buf(),
        })?;

        match expected {
            Some(expected) if expected != written => error::IncompleteDownloadSnafu {
                url: self.url_of(remote),
                expected,
                actual: written,
            }
            .fail(),
            _ => Ok(written),
        }
    }
}

impl Transport for FtpTransport {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ftp
    }

    fn location(&self) -> String {
        self.url_of(&self.remote_path(&[]))
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        let root = self.remote_path(&[]);
        self.with_session(|ftp| {
            self.list_names(ftp, &root)?
                .ok_or_else(|| error::Error::MalformedListing {
                    url: self.url_of(&root),
                    message: "the dataset directory does not exist".to_string(),
                })
        })
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let path = self.remote_path(&[name]);
        self.with_session(|ftp| {
            self.list_names(ftp, &path)?
                .ok_or_else(|| error::Error::DatasetNotFound {
                    name: name.to_string(),
                    location: self.location(),
                })
        })
    }

    fn fetch(&self, name: &str, version: &Version, dest: &Path) -> Result<Vec<PathBuf>> {
        let dir = self.remote_path(&[name, version.as_str()]);

        self.with_session(|ftp| {
            let files = self
                .list_names(ftp, &dir)?
                .ok_or_else(|| error::Error::DatasetVersionNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                })?;

            let mut artifacts = Vec::with_capacity(files.len());
            for file in files {
                let remote = self.remote_path(&[name, version.as_str(), &file]);
                let path = dest.join(&file);
                let bytes = self.download(ftp, &remote, &path)?;
                tracing::debug!("Retrieved {} ({} bytes)", remote, bytes);
                artifacts.push(path);
            }

            Ok(artifacts)
        })
    }
}

/// `550 Requested action not taken`: what servers answer for a directory that is not there.
fn is_missing(e: &FtpError) -> bool {
    matches!(e, FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable)
}

/// Reduce `NLST` output to bare, visible entry names.
///
/// Depending on the server, entries come back as bare names or as paths including the listed
/// directory.
fn normalize_names(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = raw
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim_end_matches(['\r', '/']);
            let name = entry.rsplit('/').next().unwrap_or(entry);
            (!name.is_empty() && !cache::is_hidden(name)).then(|| name.to_string())
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
