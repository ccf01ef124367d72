use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    ffmpeg::{FfmpegError, Muxer},
    util::{DownloadError, Progress, Transport},
};

/// In-memory site. Pages are keyed by URL with the cache-busting `t` query
/// parameter removed.
#[derive(Default)]
pub struct FakeTransport {
    pages: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    broken_files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

fn strip_timestamp(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) if parsed.query().is_some() => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "t")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(strip_timestamp(url), body.to_string());
        self
    }

    pub fn file(mut self, url: &str, body: &[u8]) -> Self {
        self.files.insert(url.to_string(), body.to_vec());
        self
    }

    /// Writes `partial` to disk and then fails.
    pub fn broken_file(mut self, url: &str, partial: &[u8]) -> Self {
        self.broken_files.insert(url.to_string(), partial.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
    }
}

fn not_found(url: &str) -> DownloadError {
    DownloadError::IoError(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such url: {}", url),
    ))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.record(url);
        self.pages
            .get(&strip_timestamp(url))
            .cloned()
            .ok_or_else(|| not_found(url))
    }

    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        progress: Progress<'_>,
    ) -> Result<u64, DownloadError> {
        self.record(url);
        if let Some(partial) = self.broken_files.get(url) {
            tokio::fs::write(path, partial).await?;
            progress(partial.len() as u64);
            return Err(DownloadError::IoError(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }

        let body = self.files.get(url).ok_or_else(|| not_found(url))?;
        tokio::fs::write(path, body).await?;
        progress(body.len() as u64);
        Ok(body.len() as u64)
    }
}

pub struct FakeMuxer {
    available: bool,
    fail: bool,
    pub merged: Mutex<Vec<PathBuf>>,
}

impl FakeMuxer {
    pub fn working() -> Self {
        Self {
            available: true,
            fail: false,
            merged: Mutex::default(),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::working()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), FfmpegError> {
        let mut data = tokio::fs::read(video).await?;
        data.extend(tokio::fs::read(audio).await?);

        if self.fail {
            // Leave a truncated output behind like a crashed muxer would
            tokio::fs::write(output, &data[..data.len() / 2]).await?;
            return Err(FfmpegError::IoError(io::Error::new(
                io::ErrorKind::Other,
                "muxer crashed",
            )));
        }

        tokio::fs::write(output, data).await?;
        self.merged.lock().unwrap().push(output.to_path_buf());
        Ok(())
    }
}
