pub use reqwest::{
    Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};

use crate::{Result, config::HttpConfig, error, providers::Authenticator};
use backon::{BlockingRetryable, ExponentialBuilder};
use reqwest::blocking::{Client, RequestBuilder, Response};
use snafu::ResultExt;
use std::{path::Path, time::Duration};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client wrapper with retry, user agent, proxy, and timeout support.
///
/// Shared by the single-file HTTP provider and the WebDAV provider.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Build a new [`HttpClient`] with the given configuration.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let user_agent = format!("dsfetch/{}", env!("CARGO_PKG_VERSION"));

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| error::Error::HttpClientBuild {
                message: format!("invalid proxy URL '{}': {}", proxy_url, e),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| error::Error::HttpClientBuild {
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Perform a GET request with retry on transient errors.
    ///
    /// Retries on 429 (rate limit), 5xx (server errors), and connection errors.
    /// Returns the response on success (including 4xx responses other than 429).
    pub fn get(&self, url: &str, auth: &Authenticator) -> Result<Response> {
        self.send(Method::GET, url, &HeaderMap::new(), auth, None)
    }

    /// Perform a request with an arbitrary method, headers and optional body, retrying on
    /// transient errors exactly like [`Self::get`].
    pub fn send(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        auth: &Authenticator,
        body: Option<&str>,
    ) -> Result<Response> {
        let backoff = self.build_backoff();

        let operation = || {
            let mut request = self.client.request(method.clone(), url).headers(headers.clone());
            if let Some(body) = body {
                request = request.body(body.to_string());
            }
            let request = apply_auth(request, auth);

            let response = request
                .send()
                .with_context(|_| error::HttpRequestSnafu { url: url.to_string() })?;

            Self::classify_response(response, url)
        };

        operation
            .retry(backoff)
            .notify(|err, dur| {
                tracing::debug!("HTTP {} failed, retrying in {:?}: {:?}", method, dur, err);
            })
            .call()
    }

    /// Stream the body at `url` into the file at `dest`, returning the number of bytes written.
    ///
    /// Any non-success status is an error.  When the server announced a `Content-Length`, a body
    /// of a different size fails with [`IncompleteDownload`](error::Error::IncompleteDownload).
    pub fn download_to(&self, url: &str, auth: &Authenticator, dest: &Path) -> Result<u64> {
        let mut response = self.get(url, auth)?;

        if !response.status().is_success() {
            return error::HttpStatusSnafu {
                url,
                status: response.status().as_u16(),
            }
            .fail();
        }

        let expected = response.content_length();

        let mut file = std::fs::File::create(dest).with_context(|_| error::IoSnafu {
            path: dest.to_path_buf(),
        })?;
        let written = response
            .copy_to(&mut file)
            .with_context(|_| error::HttpRequestSnafu { url: url.to_string() })?;
        file.sync_all().with_context(|_| error::IoSnafu {
            path: dest.to_path_buf(),
        })?;

        match expected {
            Some(expected) if expected != written => error::IncompleteDownloadSnafu {
                url,
                expected,
                actual: written,
            }
            .fail(),
            _ => Ok(written),
        }
    }

    fn build_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.backoff_base)
            .with_max_delay(self.config.backoff_max)
            .with_max_times(self.config.retries)
            .with_jitter()
    }

    fn classify_response(response: Response, url: &str) -> Result<Response> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return error::HttpRetryableStatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }

        Ok(response)
    }
}

fn apply_auth(request: RequestBuilder, auth: &Authenticator) -> RequestBuilder {
    match auth {
        Authenticator::None => request,
        Authenticator::Simple { username, password } => request.basic_auth(username, Some(password)),
    }
}

#[cfg(test)]
pub(crate) fn fast_retry_config() -> HttpConfig {
    HttpConfig {
        retries: 2,
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(10),
        ..Default::default()
    }
}
