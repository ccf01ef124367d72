use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use crate::util;

const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Byte counters for the video and audio downloads of one acquisition.
/// Updated concurrently from both transfers.
pub struct DownloadStatistics {
    pub video_bytes: AtomicU64,
    pub audio_bytes: AtomicU64,
    last_report: Mutex<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DownloadStatistics {
    pub fn new() -> Self {
        Self {
            video_bytes: AtomicU64::new(0),
            audio_bytes: AtomicU64::new(0),
            last_report: Mutex::new(Instant::now()),
        }
    }

    pub fn add(&self, kind: StreamKind, bytes: u64) {
        match kind {
            StreamKind::Video => self.video_bytes.fetch_add(bytes, Ordering::Relaxed),
            StreamKind::Audio => self.audio_bytes.fetch_add(bytes, Ordering::Relaxed),
        };

        let due = match self.last_report.try_lock() {
            Ok(mut last) if last.elapsed() >= REPORT_INTERVAL => {
                *last = Instant::now();
                true
            }
            _ => false,
        };
        if due {
            self.print();
        }
    }

    pub fn total(&self) -> u64 {
        self.video_bytes.load(Ordering::Relaxed) + self.audio_bytes.load(Ordering::Relaxed)
    }

    pub fn print(&self) {
        info!(
            "downloaded video {}, audio {}",
            util::format_bytes(self.video_bytes.load(Ordering::Relaxed)),
            util::format_bytes(self.audio_bytes.load(Ordering::Relaxed)),
        );
    }
}

impl Default for DownloadStatistics {
    fn default() -> Self {
        Self::new()
    }
}
