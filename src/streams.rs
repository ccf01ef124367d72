use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Deserialize;
use serde_aux::prelude::*;

use crate::{
    id::VideoId,
    util::{DownloadError, Transport},
};

/// Quality tiers, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Quality {
    #[value(name = "1080p")]
    P1080,
    #[value(name = "720p")]
    P720,
    #[value(name = "480p")]
    P480,
    #[value(name = "360p")]
    P360,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::P1080, Quality::P720, Quality::P480, Quality::P360];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
        }
    }

    /// Unrecognized labels mean 720p.
    pub fn from_label_or_default(label: &str) -> Self {
        label.parse().unwrap_or(Quality::P720)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::P720
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unknown quality label: {0}")]
pub struct UnknownQuality(String);

impl FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownQuality(s.to_string()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPair {
    pub video_url: String,
    pub audio_url: String,
}

/// Available tiers of one video. Every tier has both a video and an audio
/// location.
pub type StreamSet = BTreeMap<Quality, StreamPair>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSelection {
    pub requested: Quality,
    pub selected: Quality,
    pub stream: StreamPair,
}

impl TierSelection {
    pub fn is_substitute(&self) -> bool {
        self.requested != self.selected
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("no stream available")]
pub struct NoStreamAvailable;

/// Picks the requested tier, else the closest lower tier, else the closest
/// higher tier.
pub fn select_tier(
    streams: &StreamSet,
    requested: Quality,
) -> Result<TierSelection, NoStreamAvailable> {
    let i = requested.index();
    let lower = Quality::ALL[i..].iter();
    let higher = Quality::ALL[..i].iter().rev();

    let (selected, stream) = lower
        .chain(higher)
        .find_map(|q| streams.get(q).map(|s| (*q, s.clone())))
        .ok_or(NoStreamAvailable)?;

    Ok(TierSelection {
        requested,
        selected,
        stream,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("could not download video page")]
    DownloadVideoPage(#[from] DownloadError),
    #[error("could not find video info")]
    NoVideoInfo,
    #[error("could not parse video info")]
    ParseVideoInfo(#[from] serde_json::Error),
    #[error("video info lists no usable streams")]
    NoStreams,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoInfo {
    #[serde(default)]
    video_list: Vec<VideoEntry>,
    audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoEntry {
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    id: String,
    #[serde(default, alias = "qualityType")]
    quality: Option<String>,
    #[serde(default)]
    url: Option<String>,
    audio_url: Option<String>,
}

const VIDEO_INFO_STR: &str = "window.videoInfo";

/// The page text starting at the opening brace of the video info object.
fn get_video_info_str(html: &str) -> Option<&str> {
    let idx = html.find(VIDEO_INFO_STR)? + VIDEO_INFO_STR.len();
    let rest = html[idx..].trim_start().strip_prefix('=')?;
    let idx_start = rest.find('{')?;

    // Only whitespace may sit between `=` and the object
    if !rest[..idx_start].trim().is_empty() {
        return None;
    }

    Some(&rest[idx_start..])
}

fn decode_video_info(html: &str) -> Result<VideoInfo, StreamError> {
    let blob = get_video_info_str(html).ok_or(StreamError::NoVideoInfo)?;

    // Trailing script text after the object is ignored
    let mut de = serde_json::Deserializer::from_str(blob);
    Ok(VideoInfo::deserialize(&mut de)?)
}

pub fn parse_streams(html: &str) -> Result<StreamSet, StreamError> {
    let info = decode_video_info(html)?;
    let mut streams = StreamSet::new();

    for entry in info.video_list {
        let (Some(label), Some(video_url)) = (entry.quality, entry.url) else {
            debug!("skipping incomplete stream entry {}", entry.id);
            continue;
        };
        let Ok(quality) = label.parse::<Quality>() else {
            debug!("skipping stream {} with quality {:?}", entry.id, label);
            continue;
        };
        let Some(audio_url) = entry.audio_url.or_else(|| info.audio_url.clone()) else {
            debug!("skipping {} stream {} without audio", quality, entry.id);
            continue;
        };

        streams.entry(quality).or_insert(StreamPair {
            video_url,
            audio_url,
        });
    }

    if streams.is_empty() {
        return Err(StreamError::NoStreams);
    }

    Ok(streams)
}

/// Available tiers of `id`, or `None` if the page has no usable stream info.
pub async fn resolve_streams(transport: &dyn Transport, id: &VideoId) -> Option<StreamSet> {
    let res: Result<StreamSet, StreamError> = async {
        let html = transport.fetch_text(&id.page_url()).await?;
        parse_streams(&html)
    }
    .await;

    match res {
        Ok(streams) => Some(streams),
        Err(e) => {
            warn!("ac{}: could not resolve streams: {}", id, e);
            None
        }
    }
}
