//! Projection of AcFun video and uploader pages into [`crate::metadata`]
//! records.
//!
//! Every field is looked up on its own and falls back to a fixed default when
//! the markup does not contain it, so a page layout change degrades single
//! fields instead of failing the whole extraction.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::{
    id::{UploaderId, VideoId},
    metadata::{
        CatalogPage, MultiPart, PartMetadata, Uploader, VideoMetadata, UNKNOWN_TITLE,
        UNKNOWN_UPLOADER,
    },
    util::{DownloadError, Transport},
};

pub const PAGE_SIZE: usize = 20;

const FETCH_STREAM_MARKER: &str = "/*<!-- fetch-stream -->*/";
const PUBLISHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CATALOG_DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("network error: {0}")]
    Network(#[from] DownloadError),
    #[error("parse error: {0}")]
    Parse(String),
}

fn part_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ac(\d+_\d+)").expect("part id pattern"))
}

fn video_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ac(\d+)").expect("video id pattern"))
}

fn uploader_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/u/(\d+)").expect("uploader id pattern"))
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn text_of(el: ElementRef) -> Option<String> {
    let text = el.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn attr_of(el: ElementRef, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)?.get(1).map(|m| m.as_str().to_string())
}

fn ensure_usable(body: &str) -> Result<(), ExtractionError> {
    if body.trim().is_empty() {
        return Err(ExtractionError::Parse("empty document".into()));
    }
    Ok(())
}

/// Video page projection. Only `id` is taken from the caller, every other
/// field comes from the markup or its default.
pub fn parse_video_page(id: &VideoId, html: &str) -> VideoMetadata {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let title = select_first(root, "h1.title")
        .and_then(text_of)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let uploader = parse_video_uploader(root);

    let published_at = select_first(root, ".video-info-main time")
        .and_then(text_of)
        .and_then(|s| NaiveDateTime::parse_from_str(&s, PUBLISHED_FORMAT).ok())
        .unwrap_or_else(|| Local::now().naive_local());

    let cover_url = select_first(root, ".video-cover img")
        .and_then(|img| attr_of(img, "src"))
        .unwrap_or_default();

    VideoMetadata {
        id: id.clone(),
        title,
        cover_url,
        uploader,
        published_at: Some(published_at),
        multi_part: Some(parse_multi_part(root, id)),
    }
}

fn parse_video_uploader(root: ElementRef) -> Uploader {
    let link = select_first(root, ".up-info .up-name");

    let display_name = link
        .and_then(text_of)
        .unwrap_or_else(|| UNKNOWN_UPLOADER.to_string());
    let id = link
        .and_then(|a| attr_of(a, "href"))
        .and_then(|href| capture(uploader_id_re(), &href))
        .and_then(|uid| UploaderId::new(uid).ok())
        .unwrap_or_else(UploaderId::unknown);

    Uploader { id, display_name }
}

fn parse_multi_part(root: ElementRef, id: &VideoId) -> MultiPart {
    let Some(region) = select_first(root, "div.part") else {
        return MultiPart::single();
    };

    let mut parts = Vec::new();
    for (idx, li) in select_all(region, "li.single-p").into_iter().enumerate() {
        let title = attr_of(li, "title")
            .or_else(|| text_of(li))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let part_id = attr_of(li, "data-href")
            .and_then(|href| capture(part_id_re(), &href))
            .and_then(|pid| VideoId::new(pid).ok());

        match part_id {
            Some(part_id) => parts.push(PartMetadata { id: part_id, title }),
            None => warn!(
                "ac{}: part {} ({}) has no usable id, skipping it",
                id,
                idx + 1,
                title
            ),
        }
    }

    MultiPart::from_parts(parts)
}

/// Uploader name and declared video count from the landing page.
fn parse_uploader_header(root: ElementRef, uploader_id: &UploaderId) -> (Uploader, usize) {
    let display_name = select_first(root, "span.name > span.text-overflow")
        .and_then(|el| attr_of(el, "title").or_else(|| text_of(el)))
        .unwrap_or_else(|| UNKNOWN_UPLOADER.to_string());

    let total_count = select_first(root, "div.wp > div.tab > ul > li.active > span")
        .and_then(text_of)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    (
        Uploader {
            id: uploader_id.clone(),
            display_name,
        },
        total_count,
    )
}

/// Video entries of one catalog listing, in page order. Part detection is
/// left to per-video resolution.
fn parse_catalog_entries(root: ElementRef, uploader: &Uploader) -> Vec<VideoMetadata> {
    let mut videos = Vec::new();

    for item in select_all(root, "a.ac-space-video") {
        let title = select_first(item, "p.title")
            .and_then(text_of)
            .unwrap_or_default();

        let cover_url = select_first(item, "figure img")
            .and_then(|img| attr_of(img, "src"))
            .map(|src| src.split('?').next().unwrap_or_default().to_string())
            .unwrap_or_default();

        let published_at = select_first(item, ".date")
            .and_then(text_of)
            .and_then(|s| NaiveDate::parse_from_str(&s, CATALOG_DATE_FORMAT).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0));

        let href = attr_of(item, "href").unwrap_or_default();
        let Some(id) = capture(video_id_re(), &href).and_then(|v| VideoId::new(v).ok()) else {
            warn!(
                "uploader {}: catalog entry {:?} has no video id in {:?}, skipping it",
                uploader.id, title, href
            );
            continue;
        };

        videos.push(VideoMetadata {
            id,
            title,
            cover_url,
            uploader: uploader.clone(),
            published_at,
            multi_part: None,
        });
    }

    videos
}

pub fn parse_uploader_page(uploader_id: &UploaderId, html: &str) -> CatalogPage {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let (uploader, total_count) = parse_uploader_header(root, uploader_id);
    let page_videos = parse_catalog_entries(root, &uploader);

    CatalogPage {
        uploader,
        total_count,
        page_videos,
    }
}

#[derive(Deserialize)]
struct CatalogFragment {
    #[serde(default)]
    html: String,
}

/// Body of a paged catalog request: a JSON object carrying an HTML fragment,
/// followed by a streaming marker.
pub fn parse_catalog_fragment(
    uploader: &Uploader,
    body: &str,
) -> Result<Vec<VideoMetadata>, ExtractionError> {
    let json = body.split(FETCH_STREAM_MARKER).next().unwrap_or_default();
    let fragment: CatalogFragment = serde_json::from_str(json.trim())
        .map_err(|e| ExtractionError::Parse(format!("catalog fragment: {}", e)))?;

    let doc = Html::parse_fragment(&fragment.html);
    Ok(parse_catalog_entries(doc.root_element(), uploader))
}

pub fn catalog_page_url(
    uploader_id: &UploaderId,
    page: usize,
    timestamp_ms: i64,
) -> Result<reqwest::Url, ExtractionError> {
    let page = page.to_string();
    let page_size = PAGE_SIZE.to_string();
    let timestamp = timestamp_ms.to_string();

    reqwest::Url::parse_with_params(
        &uploader_id.page_url(),
        &[
            ("quickViewId", "ac-space-video-list"),
            ("reqID", page.as_str()),
            ("ajaxpipe", "1"),
            ("type", "video"),
            ("order", "newest"),
            ("page", page.as_str()),
            ("pageSize", page_size.as_str()),
            ("t", timestamp.as_str()),
        ],
    )
    .map_err(|e| ExtractionError::Parse(format!("catalog url: {}", e)))
}

pub struct Extractor<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Extractor<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// One request to the video page. Network failures are not retried here.
    pub async fn resolve_video(&self, id: &VideoId) -> Result<VideoMetadata, ExtractionError> {
        let html = self.transport.fetch_text(&id.page_url()).await?;
        ensure_usable(&html)?;
        Ok(parse_video_page(id, &html))
    }

    pub async fn resolve_catalog_page(
        &self,
        uploader_id: &UploaderId,
    ) -> Result<CatalogPage, ExtractionError> {
        let html = self.transport.fetch_text(&uploader_id.page_url()).await?;
        ensure_usable(&html)?;
        Ok(parse_uploader_page(uploader_id, &html))
    }

    /// Catalog page `page` (2 and up) of an uploader.
    pub async fn fetch_catalog_page(
        &self,
        uploader: &Uploader,
        page: usize,
        timestamp_ms: i64,
    ) -> Result<Vec<VideoMetadata>, ExtractionError> {
        let url = catalog_page_url(&uploader.id, page, timestamp_ms)?;
        let body = self.transport.fetch_text(url.as_str()).await?;
        parse_catalog_fragment(uploader, &body)
    }
}
