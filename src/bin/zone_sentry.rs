//! zone_sentry - zone intrusion alerting daemon
//!
//! This binary:
//! 1. Loads configuration (JSON file, environment, CLI flags)
//! 2. Loads the person detector; missing model files abort startup
//! 3. Opens the camera, or stages an uploaded video and opens the copy
//! 4. Runs the frame loop until end of stream or Ctrl-C
//! 5. Releases the capture handle and deletes the staged copy

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use zone_sentry::alert::{AlertChannel, BuzzerChannel, EmailChannel};
use zone_sentry::config::{BackendKind, FeedKind, SentryConfig};
use zone_sentry::{
    load_backend, AlertSession, LogPresenter, Session, SnapshotPresenter, SourceSelector,
    StagedVideo, VideoSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Feed type: camera or file.
    #[arg(long)]
    feed: Option<FeedKind>,
    /// Video to upload when the feed is a file.
    #[arg(long)]
    video: Option<PathBuf>,
    /// Camera index (0 is /dev/video0).
    #[arg(long)]
    camera: Option<u32>,
    /// Detector backend: opencv, tract or stub.
    #[arg(long)]
    backend: Option<BackendKind>,
    /// Directory for annotated snapshots.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    /// Write a snapshot for every frame, not only the alert frame.
    #[arg(long)]
    snapshot_all: bool,
    /// Re-arm the alert once a frame shows no intrusion.
    #[arg(long)]
    rearm_after_clear: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = SentryConfig::load()?;
    apply_args(&mut cfg, &args);
    cfg.validate()?;

    let detector = load_backend(&cfg.detector)?;

    let staged = match cfg.source.feed {
        FeedKind::File => {
            let upload = cfg
                .source
                .video_path
                .as_deref()
                .ok_or_else(|| anyhow!("file feed selected but no video path configured"))?;
            Some(StagedVideo::stage(upload)?)
        }
        FeedKind::Camera => None,
    };
    let selector = match &staged {
        Some(staged) => SourceSelector::File {
            path: staged.path().to_path_buf(),
        },
        None => SourceSelector::Camera {
            index: cfg.source.camera_index,
            target_fps: cfg.source.target_fps,
        },
    };
    let source = VideoSource::open(selector)?;

    let alerts = AlertSession::new(build_channels(&cfg)?).with_policy(cfg.alerts.rearm_policy);
    let mut session = Session::new(source, detector, alerts).with_presenter(Box::new(LogPresenter));
    if let Some(dir) = &cfg.output.snapshot_dir {
        let mut presenter = SnapshotPresenter::new(dir, cfg.output.snapshot_all_frames)?;
        if let Some(font) = &cfg.output.font_path {
            presenter = presenter.with_font(font)?;
        }
        log::info!("writing snapshots to {}", dir.display());
        session = session.with_presenter(Box::new(presenter));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let summary = match staged {
        Some(staged) => session.run_staged(&stop, staged)?,
        None => session.run(&stop)?,
    };

    for report in &summary.alerts {
        for outcome in report.outcomes.iter().filter(|o| !o.succeeded()) {
            log::error!(
                "frame {}: {} alert was not delivered",
                report.frame_index,
                outcome.channel
            );
        }
    }
    log::info!(
        "processed {} frames ({} with intrusion, {} inference failures)",
        summary.frames,
        summary.intrusion_frames,
        summary.inference_failures
    );
    Ok(())
}

fn apply_args(cfg: &mut SentryConfig, args: &Args) {
    if let Some(feed) = args.feed {
        cfg.source.feed = feed;
    }
    if let Some(video) = &args.video {
        cfg.source.video_path = Some(video.clone());
    }
    if let Some(index) = args.camera {
        cfg.source.camera_index = index;
    }
    if let Some(backend) = args.backend {
        cfg.detector.backend = backend;
    }
    if let Some(dir) = &args.snapshot_dir {
        cfg.output.snapshot_dir = Some(dir.clone());
    }
    if args.snapshot_all {
        cfg.output.snapshot_all_frames = true;
    }
    if args.rearm_after_clear {
        cfg.alerts.rearm_policy = zone_sentry::RearmPolicy::AfterClearFrame;
    }
}

fn build_channels(cfg: &SentryConfig) -> Result<Vec<Box<dyn AlertChannel>>> {
    let secrets = cfg.load_secrets()?;
    Ok(vec![
        Box::new(BuzzerChannel::new(&cfg.alerts.buzzer_path)),
        Box::new(EmailChannel::new(cfg.alerts.email.clone(), secrets)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_do_not_read_config_environment() {
        for key in [
            "ZONE_SENTRY_FEED",
            "ZONE_SENTRY_VIDEO",
            "ZONE_SENTRY_BACKEND",
            "ZONE_SENTRY_SNAPSHOT_DIR",
        ] {
            std::env::set_var(key, "not-a-valid-value");
        }
        let args = Args::try_parse_from(["zone_sentry"]).expect("env is left to the config loader");
        assert!(args.feed.is_none());
        assert!(args.video.is_none());
        assert!(args.backend.is_none());
        assert!(args.snapshot_dir.is_none());

        let args = Args::try_parse_from(["zone_sentry", "--backend", "stub", "--feed", "file"])
            .expect("flags parse");
        assert_eq!(args.backend, Some(BackendKind::Stub));
        assert_eq!(args.feed, Some(FeedKind::File));

        for key in [
            "ZONE_SENTRY_FEED",
            "ZONE_SENTRY_VIDEO",
            "ZONE_SENTRY_BACKEND",
            "ZONE_SENTRY_SNAPSHOT_DIR",
        ] {
            std::env::remove_var(key);
        }
    }
}
