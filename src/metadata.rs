use chrono::NaiveDateTime;
use serde::Serialize;

use crate::id::{UploaderId, VideoId};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_UPLOADER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uploader {
    pub id: UploaderId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartMetadata {
    pub id: VideoId,
    pub title: String,
}

/// Multi-part listing of a video. `parts` is empty unless `has_parts` is set,
/// in which case it holds at least two entries in on-page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultiPart {
    pub has_parts: bool,
    pub parts: Vec<PartMetadata>,
}

impl MultiPart {
    pub fn single() -> Self {
        Self::default()
    }

    /// A listing with a single entry is the video itself.
    pub fn from_parts(parts: Vec<PartMetadata>) -> Self {
        if parts.len() > 1 {
            Self {
                has_parts: true,
                parts,
            }
        } else {
            Self::single()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub id: VideoId,
    pub title: String,
    pub cover_url: String,
    pub uploader: Uploader,
    pub published_at: Option<NaiveDateTime>,
    /// `None` for catalog entries, which are not checked for parts.
    pub multi_part: Option<MultiPart>,
}

impl VideoMetadata {
    pub fn is_multi_part(&self) -> bool {
        self.multi_part.as_ref().map(|mp| mp.has_parts).unwrap_or(false)
    }
}

/// First page of an uploader's catalog together with its declared size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub uploader: Uploader,
    pub total_count: usize,
    pub page_videos: Vec<VideoMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub uploader: Uploader,
    pub videos: Vec<VideoMetadata>,
}
