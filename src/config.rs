use std::{path::PathBuf, time::Duration};

use crate::streams::Quality;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36 Edg/135.0.0.0";

/// Browser strings the random policy picks from.
pub const BROWSER_USER_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:136.0) Gecko/20100101 Firefox/136.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:135.0) Gecko/20100101 Firefox/135.0",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAgentPolicy {
    Fixed(String),
    /// Pick one of [`BROWSER_USER_AGENTS`] per request.
    Random,
}

impl Default for UserAgentPolicy {
    fn default() -> Self {
        Self::Random
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub user_agent: UserAgentPolicy,
    pub request_timeout: Duration,
    pub stream_timeout: Duration,
    pub max_retries: u32,
    /// Pause before each catalog page after the first.
    pub page_delay: Duration,
    /// Pause between top-level videos of a batch.
    pub batch_delay: Duration,
    pub ffmpeg_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            quality: Quality::P720,
            user_agent: UserAgentPolicy::default(),
            request_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(30 * 60),
            max_retries: 3,
            page_delay: Duration::from_millis(500),
            batch_delay: Duration::from_secs(1),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}
