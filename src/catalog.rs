use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    extractor::{ExtractionError, Extractor, PAGE_SIZE},
    id::UploaderId,
    metadata::Catalog,
    util::Transport,
};

/// Rate limit applied before every catalog request after the first.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn wait(&self);
}

pub struct FixedDelay(pub Duration);

#[async_trait]
impl Throttle for FixedDelay {
    async fn wait(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Number of catalog pages needed for `total_count` videos. Always at least
/// one, the landing page.
pub fn total_pages(total_count: usize) -> usize {
    total_count.div_ceil(PAGE_SIZE).max(1)
}

pub struct Paginator<'a> {
    extractor: Extractor<'a>,
    throttle: &'a dyn Throttle,
}

impl<'a> Paginator<'a> {
    pub fn new(transport: &'a dyn Transport, throttle: &'a dyn Throttle) -> Self {
        Self {
            extractor: Extractor::new(transport),
            throttle,
        }
    }

    /// The uploader's videos in catalog order. Pages after the first are only
    /// requested when `all_pages` is set; a failing page is logged and left
    /// out.
    pub async fn resolve_full_catalog(
        &self,
        uploader_id: &UploaderId,
        all_pages: bool,
    ) -> Result<Catalog, ExtractionError> {
        let first = self.extractor.resolve_catalog_page(uploader_id).await?;
        info!(
            "uploader {} ({}): {} videos",
            first.uploader.display_name, first.uploader.id, first.total_count
        );

        let uploader = first.uploader;
        let mut videos = first.page_videos;

        if !all_pages {
            return Ok(Catalog { uploader, videos });
        }

        let pages = total_pages(first.total_count);
        let mut last_timestamp = 0;

        for page in 2..=pages {
            self.throttle.wait().await;

            // Cache buster, strictly increasing between requests
            let timestamp = Utc::now().timestamp_millis().max(last_timestamp + 1);
            last_timestamp = timestamp;

            info!("fetching catalog page {}/{}", page, pages);
            match self
                .extractor
                .fetch_catalog_page(&uploader, page, timestamp)
                .await
            {
                Ok(page_videos) => videos.extend(page_videos),
                Err(e) => warn!(
                    "uploader {}: catalog page {}/{} failed, skipping it: {}",
                    uploader.id, page, pages, e
                ),
            }
        }

        Ok(Catalog { uploader, videos })
    }
}
