use std::{path::Path, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest_cookie_store::CookieStoreMutex;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::config::{Config, UserAgentPolicy, BROWSER_USER_AGENTS, DEFAULT_USER_AGENT};

/// Receives the size of every chunk written by [`Transport::download_file`].
pub type Progress<'a> = &'a (dyn Fn(u64) + Send + Sync);

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Everything the pipeline needs from the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;

    /// Streams `url` into `path`, returning the number of bytes written.
    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        progress: Progress<'_>,
    ) -> Result<u64, DownloadError>;
}

pub struct HttpClient {
    pub client: ClientWithMiddleware,
    pub cookies: Arc<CookieStoreMutex>,
    user_agent: UserAgent,
    request_timeout: std::time::Duration,
    stream_timeout: std::time::Duration,
}

enum UserAgent {
    Fixed(HeaderValue),
    Random(Mutex<StdRng>),
}

impl UserAgent {
    fn from_policy(policy: &UserAgentPolicy) -> Self {
        match policy {
            UserAgentPolicy::Fixed(ua) => Self::Fixed(
                HeaderValue::from_str(ua)
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
            ),
            UserAgentPolicy::Random => Self::Random(Mutex::new(StdRng::from_entropy())),
        }
    }

    fn next(&self) -> HeaderValue {
        match self {
            Self::Fixed(ua) => ua.clone(),
            Self::Random(rng) => {
                let picked = match rng.lock() {
                    Ok(mut rng) => BROWSER_USER_AGENTS.choose(&mut *rng).copied(),
                    Err(_) => None,
                };
                HeaderValue::from_static(picked.unwrap_or(DEFAULT_USER_AGENT))
            }
        }
    }
}

impl HttpClient {
    pub fn new(config: &Config) -> reqwest::Result<HttpClient> {
        let cookies = Arc::new(CookieStoreMutex::default());
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        // The site rejects requests without a referer from its own origin
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(crate::REFERER_URL));

        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .default_headers(headers)
            .connect_timeout(config.request_timeout)
            .build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient {
            client,
            cookies,
            user_agent: UserAgent::from_policy(&config.user_agent),
            request_timeout: config.request_timeout,
            stream_timeout: config.stream_timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.next())
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;

        resp.text().await.map_err(|e| e.into())
    }

    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        progress: Progress<'_>,
    ) -> Result<u64, DownloadError> {
        debug!("GET {} -> {}", url, path.display());
        let mut resp = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.next())
            .timeout(self.stream_timeout)
            .send()
            .await?
            .error_for_status()?;

        let mut file = File::create(path).await?;
        let mut size = 0;

        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
            progress(chunk.len() as u64);
        }

        file.flush().await?;

        Ok(size)
    }
}

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// Like [`sanitize_filename`], but never yields a name that resolves outside
/// of its parent directory.
pub fn sanitize_dirname(title: &str) -> String {
    let name = sanitize_filename(title);
    match name.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let mut bytes = bytes as f64;
    let mut suffix = "B";

    if bytes > 1024.0 {
        bytes /= 1024.0;
        suffix = "KiB";
    }
    if bytes > 1024.0 {
        bytes /= 1024.0;
        suffix = "MiB";
    }
    if bytes > 1024.0 {
        bytes /= 1024.0;
        suffix = "GiB";
    }
    if bytes > 1024.0 {
        bytes /= 1024.0;
        suffix = "TiB";
    }

    format!("{:.2} {}", bytes, suffix)
}
