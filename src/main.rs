#[macro_use]
extern crate log;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use env_logger::Env;

use acfun_dl::{
    batch::BatchController,
    catalog::{FixedDelay, Paginator},
    config::{Config, UserAgentPolicy, DEFAULT_USER_AGENT},
    downloader::Downloader,
    extractor::Extractor,
    ffmpeg::Ffmpeg,
    id::{UploaderId, VideoId},
    streams::Quality,
    util::HttpClient,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Download videos from AcFun", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
    #[arg(short, long, global = true, default_value = "./downloads")]
    /// Directory downloads are written to
    output: PathBuf,
    #[arg(short, long, global = true, value_enum, default_value_t = Quality::P720)]
    /// Preferred quality, the closest available one is used otherwise
    quality: Quality,
    #[arg(long, global = true)]
    /// Always send the same browser user agent
    fixed_user_agent: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Download a single video")]
    Video {
        /// Video id, with or without the `ac` prefix
        vid: VideoId,
    },
    #[command(about = "Download the videos of an uploader")]
    Up {
        /// Uploader id
        uid: UploaderId,
        #[arg(long)]
        /// Download at most this many videos
        max: Option<usize>,
        #[arg(long)]
        /// List every catalog page instead of only the first one
        all_pages: bool,
    },
    #[command(about = "Show video information without downloading")]
    Info {
        /// Video id, with or without the `ac` prefix
        vid: VideoId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = Config {
        output_dir: args.output,
        quality: args.quality,
        user_agent: if args.fixed_user_agent {
            UserAgentPolicy::Fixed(DEFAULT_USER_AGENT.to_string())
        } else {
            UserAgentPolicy::Random
        },
        ..Config::default()
    };

    let client = match HttpClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("could not create http client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ok = match args.command {
        Command::Video { vid } => download(&config, &client, &vid).await,
        Command::Up {
            uid,
            max,
            all_pages,
        } => download_uploader(&config, &client, &uid, max, all_pages).await,
        Command::Info { vid } => info(&client, &vid).await,
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn ensure_output_dir(config: &Config) -> bool {
    match tokio::fs::create_dir_all(&config.output_dir).await {
        Ok(()) => true,
        Err(e) => {
            error!(
                "could not create output directory {}: {}",
                config.output_dir.display(),
                e
            );
            false
        }
    }
}

async fn download(config: &Config, client: &HttpClient, vid: &VideoId) -> bool {
    if !ensure_output_dir(config).await {
        return false;
    }

    println!("Downloading ac{} ({})", vid, config.quality);
    let ffmpeg = Ffmpeg::new(&config.ffmpeg_path);
    let downloader = Downloader::new(client, &ffmpeg, &config.output_dir);
    let throttle = FixedDelay(config.batch_delay);
    let batch = BatchController::new(client, &downloader, &throttle);

    batch.download_video(vid, config.quality).await
}

async fn download_uploader(
    config: &Config,
    client: &HttpClient,
    uid: &UploaderId,
    max: Option<usize>,
    all_pages: bool,
) -> bool {
    if !ensure_output_dir(config).await {
        return false;
    }

    let page_throttle = FixedDelay(config.page_delay);
    let catalog = match Paginator::new(client, &page_throttle)
        .resolve_full_catalog(uid, all_pages)
        .await
    {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("could not list videos of uploader {}: {}", uid, e);
            return false;
        }
    };

    println!(
        "Uploader {}: {} videos found",
        catalog.uploader.display_name,
        catalog.videos.len()
    );

    let ffmpeg = Ffmpeg::new(&config.ffmpeg_path);
    let downloader = Downloader::new(client, &ffmpeg, &config.output_dir);
    let throttle = FixedDelay(config.batch_delay);
    let batch = BatchController::new(client, &downloader, &throttle);

    let summary = batch
        .acquire_many(&catalog.videos, max, config.quality)
        .await;
    println!(
        "Done: {}/{} downloaded",
        summary.succeeded, summary.attempted
    );

    summary.succeeded > 0
}

async fn info(client: &HttpClient, vid: &VideoId) -> bool {
    let video = match Extractor::new(client).resolve_video(vid).await {
        Ok(video) => video,
        Err(e) => {
            error!("could not resolve ac{}: {}", vid, e);
            return false;
        }
    };

    println!("Title: {}", video.title);
    println!(
        "Uploader: {} (UID: {})",
        video.uploader.display_name, video.uploader.id
    );
    if let Some(published_at) = video.published_at {
        println!("Published: {}", published_at.format("%Y-%m-%d %H:%M:%S"));
    }
    if !video.cover_url.is_empty() {
        println!("Cover: {}", video.cover_url);
    }

    match video.multi_part {
        Some(mp) if mp.has_parts => {
            println!("{} parts", mp.parts.len());
            for (idx, part) in mp.parts.iter().enumerate() {
                println!("  P{}: {} (ac{})", idx + 1, part.title, part.id);
            }
        }
        _ => println!("Single part"),
    }

    true
}
