//! # acfun-dl
//!
//! This crate resolves AcFun video and uploader pages into typed metadata and
//! downloads the media behind them. Video and audio are fetched as separate
//! streams and muxed with `ffmpeg` when it is installed; without it the two
//! files are kept side by side.
//!
//! ## Usage
//!
//! ```no_run
//! use acfun_dl::{
//!     batch::BatchController, catalog::FixedDelay, config::Config, downloader::Downloader,
//!     ffmpeg::Ffmpeg, id::VideoId, util,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!
//!     // HttpClient sends the referer and user agent the site expects
//!     let client = util::HttpClient::new(&config).unwrap();
//!     let ffmpeg = Ffmpeg::default();
//!
//!     let downloader = Downloader::new(&client, &ffmpeg, &config.output_dir);
//!     let throttle = FixedDelay(config.batch_delay);
//!     let batch = BatchController::new(&client, &downloader, &throttle);
//!
//!     let id: VideoId = "ac41502955".parse().unwrap();
//!     if batch.download_video(&id, config.quality).await {
//!         println!("Done");
//!     }
//! }
//! ```
//!
//! Multi-part videos are downloaded part by part into a directory named after
//! the video. Uploader catalogs are listed with [`catalog::Paginator`].

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod batch;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod extractor;
pub mod ffmpeg;
pub mod id;
pub mod metadata;
pub mod stats;
pub mod streams;
pub mod util;

#[cfg(test)]
mod test_util;

pub const BASE_URL: &str = "https://www.acfun.cn";
pub const REFERER_URL: &str = "https://www.acfun.cn/";
