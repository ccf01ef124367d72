use std::path::{Path, PathBuf};

use crate::{
    ffmpeg::{FfmpegError, Muxer},
    id::VideoId,
    stats::{DownloadStatistics, StreamKind},
    streams::{self, NoStreamAvailable, Quality, TierSelection},
    util::{self, DownloadError, Transport},
};

#[derive(thiserror::Error, Debug)]
pub enum AcquireError {
    #[error("could not resolve streams")]
    StreamsUnavailable,
    #[error(transparent)]
    NoStreamAvailable(#[from] NoStreamAvailable),
    #[error("{kind} download failed: {source}")]
    Download {
        kind: StreamKind,
        source: DownloadError,
    },
    #[error("merge failed: {0}")]
    MergeFailed(FfmpegError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Merged(PathBuf),
    /// Written when no muxer is available.
    Split { video: PathBuf, audio: PathBuf },
}

impl Output {
    pub fn path(&self) -> &Path {
        match self {
            Output::Merged(path) => path,
            Output::Split { video, .. } => video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub selection: TierSelection,
    pub output: Output,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionResult {
    pub succeeded: bool,
    pub output_path: Option<PathBuf>,
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {}", path.display(), e);
        }
    }
}

pub struct Downloader<'a> {
    transport: &'a dyn Transport,
    muxer: &'a dyn Muxer,
    output_dir: PathBuf,
}

impl<'a> Downloader<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        muxer: &'a dyn Muxer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            muxer,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn acquire(&self, id: &VideoId, quality: Quality, title: &str) -> AcquisitionResult {
        self.acquire_into(&self.output_dir, id, quality, title).await
    }

    /// Downloads `id` into `dir`. Failures are logged and reported as an
    /// unsuccessful result.
    pub async fn acquire_into(
        &self,
        dir: &Path,
        id: &VideoId,
        quality: Quality,
        title: &str,
    ) -> AcquisitionResult {
        match self.try_acquire_into(dir, id, quality, title).await {
            Ok(acquired) => AcquisitionResult {
                succeeded: true,
                output_path: Some(acquired.output.path().to_path_buf()),
            },
            Err(e) => {
                error!("ac{} ({}): {}", id, title, e);
                AcquisitionResult::default()
            }
        }
    }

    pub async fn try_acquire_into(
        &self,
        dir: &Path,
        id: &VideoId,
        quality: Quality,
        title: &str,
    ) -> Result<Acquired, AcquireError> {
        let streams = streams::resolve_streams(self.transport, id)
            .await
            .ok_or(AcquireError::StreamsUnavailable)?;

        let selection = streams::select_tier(&streams, quality)?;
        if selection.is_substitute() {
            warn!(
                "ac{}: {} is not available, using {} instead",
                id, selection.requested, selection.selected
            );
        }

        tokio::fs::create_dir_all(dir).await?;

        // Unique per call so concurrent acquisitions never share temp files
        let token = format!("{:08x}", rand::random::<u32>());
        let temp_video = dir.join(format!("temp_video_{}", token));
        let temp_audio = dir.join(format!("temp_audio_{}", token));

        let stats = DownloadStatistics::new();
        let on_video = |n| stats.add(StreamKind::Video, n);
        let on_audio = |n| stats.add(StreamKind::Audio, n);

        // Both transfers run to completion even if one fails
        let (res_video, res_audio) = tokio::join!(
            self.transport
                .download_file(&selection.stream.video_url, &temp_video, &on_video),
            self.transport
                .download_file(&selection.stream.audio_url, &temp_audio, &on_audio),
        );

        let mut failures: Vec<_> = [
            (StreamKind::Video, res_video),
            (StreamKind::Audio, res_audio),
        ]
        .into_iter()
        .filter_map(|(kind, res)| res.err().map(|e| (kind, e)))
        .collect();
        for (kind, e) in &failures {
            warn!("ac{}: {} download failed: {}", id, kind, e);
        }
        if !failures.is_empty() {
            remove_quietly(&temp_video).await;
            remove_quietly(&temp_audio).await;
            let (kind, source) = failures.remove(0);
            return Err(AcquireError::Download { kind, source });
        }
        stats.print();

        let safe_title = util::sanitize_filename(title);

        if !self.muxer.is_available().await {
            warn!("ffmpeg is not available, keeping video and audio as separate files");
            let video = dir.join(format!("{}_video.mp4", safe_title));
            let audio = dir.join(format!("{}_audio.m4a", safe_title));

            let renamed = async {
                tokio::fs::rename(&temp_video, &video).await?;
                tokio::fs::rename(&temp_audio, &audio).await
            }
            .await;
            if let Err(e) = renamed {
                remove_quietly(&video).await;
                remove_quietly(&temp_video).await;
                remove_quietly(&temp_audio).await;
                return Err(e.into());
            }

            info!("saved {} and {}", video.display(), audio.display());
            return Ok(Acquired {
                selection,
                output: Output::Split { video, audio },
            });
        }

        let output = dir.join(format!("{}.mp4", safe_title));
        info!("merging into {}", output.display());
        if let Err(e) = self.muxer.merge(&temp_video, &temp_audio, &output).await {
            remove_quietly(&output).await;
            warn!(
                "ac{}: merge failed, downloaded streams kept at {} and {}",
                id,
                temp_video.display(),
                temp_audio.display()
            );
            return Err(AcquireError::MergeFailed(e));
        }

        remove_quietly(&temp_video).await;
        remove_quietly(&temp_audio).await;

        info!("saved {}", output.display());
        Ok(Acquired {
            selection,
            output: Output::Merged(output),
        })
    }
}
