use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum FfmpegError {
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Combines a video-only and an audio-only file into one container.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Whether the tool can be run at all.
    async fn is_available(&self) -> bool;

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), FfmpegError>;
}

pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Muxer for Ffmpeg {
    async fn is_available(&self) -> bool {
        let status = tokio::process::Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("{} -version failed: {}", self.program.display(), e);
                false
            }
        }
    }

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), FfmpegError> {
        let mut child = tokio::process::Command::new(&self.program);

        // Video is copied as-is, only audio is re-encoded
        child
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("aac")
            .arg(output)
            .stdin(Stdio::null());

        let out = child.output().await?;
        if !out.status.success() {
            return Err(FfmpegError::Failed {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
