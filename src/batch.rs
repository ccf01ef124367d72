use crate::{
    catalog::Throttle,
    downloader::Downloader,
    extractor::Extractor,
    id::VideoId,
    metadata::{MultiPart, PartMetadata, VideoMetadata},
    streams::Quality,
    util::{self, Transport},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
}

/// Downloads videos one after another. A failed video or part is logged and
/// the batch moves on.
pub struct BatchController<'a> {
    extractor: Extractor<'a>,
    downloader: &'a Downloader<'a>,
    throttle: &'a dyn Throttle,
}

impl<'a> BatchController<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        downloader: &'a Downloader<'a>,
        throttle: &'a dyn Throttle,
    ) -> Self {
        Self {
            extractor: Extractor::new(transport),
            downloader,
            throttle,
        }
    }

    /// Resolves `id` and downloads it with all of its parts.
    pub async fn download_video(&self, id: &VideoId, quality: Quality) -> bool {
        match self.extractor.resolve_video(id).await {
            Ok(video) => self.download_resolved(&video, quality).await,
            Err(e) => {
                error!("ac{}: could not resolve video: {}", id, e);
                false
            }
        }
    }

    /// Downloads a video that may come from a catalog listing, resolving its
    /// parts first when they are not known yet.
    pub async fn download_metadata(&self, video: &VideoMetadata, quality: Quality) -> bool {
        if video.multi_part.is_some() {
            return self.download_resolved(video, quality).await;
        }

        match self.extractor.resolve_video(&video.id).await {
            Ok(resolved) => self.download_resolved(&resolved, quality).await,
            Err(e) => {
                error!("ac{} ({}): could not resolve video: {}", video.id, video.title, e);
                false
            }
        }
    }

    async fn download_resolved(&self, video: &VideoMetadata, quality: Quality) -> bool {
        match &video.multi_part {
            Some(MultiPart {
                has_parts: true,
                parts,
            }) => self.download_parts(video, parts, quality).await,
            _ => {
                self.downloader
                    .acquire(&video.id, quality, &video.title)
                    .await
                    .succeeded
            }
        }
    }

    /// Every part is attempted; the video only succeeds if all parts do.
    async fn download_parts(
        &self,
        video: &VideoMetadata,
        parts: &[PartMetadata],
        quality: Quality,
    ) -> bool {
        info!("{} has {} parts", video.title, parts.len());
        let dir = self
            .downloader
            .output_dir()
            .join(util::sanitize_dirname(&video.title));

        let mut all_ok = true;
        for (idx, part) in parts.iter().enumerate() {
            info!("part {}/{}: {}", idx + 1, parts.len(), part.title);
            let title = format!("{}_p{}_{}", video.title, idx + 1, part.title);
            let res = self
                .downloader
                .acquire_into(&dir, &part.id, quality, &title)
                .await;
            if !res.succeeded {
                warn!("ac{}: part {} failed", video.id, idx + 1);
                all_ok = false;
            }
        }

        all_ok
    }

    /// Downloads the first `max_count` videos (all if `None`) in order.
    pub async fn acquire_many(
        &self,
        videos: &[VideoMetadata],
        max_count: Option<usize>,
        quality: Quality,
    ) -> BatchSummary {
        let videos = &videos[..max_count.unwrap_or(videos.len()).min(videos.len())];
        let mut summary = BatchSummary::default();

        for (idx, video) in videos.iter().enumerate() {
            if idx > 0 {
                self.throttle.wait().await;
            }

            info!("[{}/{}] {}", idx + 1, videos.len(), video.title);
            summary.attempted += 1;
            if self.download_metadata(video, quality).await {
                summary.succeeded += 1;
            } else {
                warn!("[{}/{}] ac{} failed", idx + 1, videos.len(), video.id);
            }
        }

        info!(
            "batch finished: {}/{} succeeded",
            summary.succeeded, summary.attempted
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        catalog::FixedDelay,
        downloader::tests::stream_page,
        id::UploaderId,
        metadata::Uploader,
        test_util::{FakeMuxer, FakeTransport},
    };

    fn vid(s: &str) -> VideoId {
        VideoId::new(s).unwrap()
    }

    fn single(id: &str, title: &str) -> VideoMetadata {
        VideoMetadata {
            id: vid(id),
            title: title.into(),
            cover_url: String::new(),
            uploader: Uploader {
                id: UploaderId::unknown(),
                display_name: "up".into(),
            },
            published_at: None,
            multi_part: Some(MultiPart::single()),
        }
    }

    fn with_streams(transport: FakeTransport, id: &str) -> FakeTransport {
        transport
            .page(&vid(id).page_url(), &stream_page(&["720p"]))
            .file("https://cdn.test/720p.mp4", b"VIDEO")
            .file("https://cdn.test/audio.m4a", b"AUDIO")
    }

    const MULTI_PART_PAGE: &str = r#"
        <h1 class="title">合集</h1>
        <div class="part"><ul>
            <li class="single-p" data-href="/v/ac5_1" title="上">上</li>
            <li class="single-p" data-href="/v/ac5_2" title="下">下</li>
        </ul></div>
    "#;

    #[tokio::test]
    async fn counts_successes_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let transport = with_streams(with_streams(FakeTransport::new(), "1"), "3")
            .page(&vid("2").page_url(), "<html>no streams</html>");
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, dir.path());
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        let videos = [single("1", "a"), single("2", "b"), single("3", "c")];
        let summary = batch.acquire_many(&videos, None, Quality::P720).await;

        assert_eq!(
            summary,
            BatchSummary {
                attempted: 3,
                succeeded: 2
            }
        );
        assert!(dir.path().join("a.mp4").exists());
        assert!(!dir.path().join("b.mp4").exists());
        assert!(dir.path().join("c.mp4").exists());
    }

    #[tokio::test]
    async fn max_count_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let transport = with_streams(with_streams(FakeTransport::new(), "1"), "2");
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, dir.path());
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        let videos = [single("1", "a"), single("2", "b"), single("3", "c")];
        let summary = batch.acquire_many(&videos, Some(2), Quality::P720).await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 2);
        let pages: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|u| u.contains("/v/ac"))
            .collect();
        assert_eq!(
            pages,
            ["https://www.acfun.cn/v/ac1", "https://www.acfun.cn/v/ac2"]
        );

        let summary = batch.acquire_many(&videos, Some(10), Quality::P720).await;
        assert_eq!(summary.attempted, 3);
    }

    #[tokio::test]
    async fn catalog_entry_with_parts() {
        let dir = tempfile::tempdir().unwrap();
        let transport = with_streams(
            with_streams(FakeTransport::new(), "5_1").page(&vid("5").page_url(), MULTI_PART_PAGE),
            "5_2",
        );
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, dir.path());
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        let mut entry = single("5", "合集");
        entry.multi_part = None;
        let summary = batch.acquire_many(&[entry], None, Quality::P720).await;

        assert_eq!(summary.succeeded, 1);
        let part_dir = dir.path().join("合集");
        assert!(part_dir.join("合集_p1_上.mp4").exists());
        assert!(part_dir.join("合集_p2_下.mp4").exists());

        let pages: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|u| u.contains("/v/ac"))
            .collect();
        assert_eq!(
            pages,
            [
                "https://www.acfun.cn/v/ac5",
                "https://www.acfun.cn/v/ac5_1",
                "https://www.acfun.cn/v/ac5_2",
            ]
        );
    }

    #[tokio::test]
    async fn failed_part_fails_video_but_others_run() {
        let dir = tempfile::tempdir().unwrap();
        let transport = with_streams(FakeTransport::new(), "5_2")
            .page(&vid("5").page_url(), MULTI_PART_PAGE);
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, dir.path());
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        assert!(!batch.download_video(&vid("5"), Quality::P720).await);
        assert!(dir.path().join("合集").join("合集_p2_下.mp4").exists());
    }

    #[tokio::test]
    async fn dot_title_stays_in_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        let transport = with_streams(
            with_streams(
                FakeTransport::new().page(
                    &vid("5").page_url(),
                    &MULTI_PART_PAGE.replace("合集", ".."),
                ),
                "5_1",
            ),
            "5_2",
        );
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, &out);
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        assert!(batch.download_video(&vid("5"), Quality::P720).await);
        assert!(out.join("_").join(".._p1_上.mp4").exists());
        assert!(out.join("_").join(".._p2_下.mp4").exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unresolvable_video() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new();
        let muxer = FakeMuxer::working();
        let downloader = Downloader::new(&transport, &muxer, dir.path());
        let throttle = FixedDelay(Duration::ZERO);
        let batch = BatchController::new(&transport, &downloader, &throttle);

        assert!(!batch.download_video(&vid("404"), Quality::P720).await);
    }
}
