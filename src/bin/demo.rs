//! demo - end-to-end synthetic run of the intrusion pipeline
//!
//! Generates frames, scripts a person walking into the zone, and routes the alert
//! to the log instead of the buzzer and mailbox.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::Parser;

use zone_sentry::detect::StubBackend;
use zone_sentry::ingest::SyntheticConfig;
use zone_sentry::{
    AlertChannel, AlertSession, BoundingBox, Detection, LogPresenter, Session, SnapshotPresenter,
    SourceSelector, VideoSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames.
    #[arg(long, default_value_t = 10)]
    frames: u64,
    /// First frame on which the person is inside the zone.
    #[arg(long, default_value_t = 3)]
    enter_at: u64,
    /// Number of frames the person stays inside the zone.
    #[arg(long, default_value_t = 3)]
    stay: u64,
    /// Write annotated snapshots here.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    /// TTF font for labels in snapshots.
    #[arg(long)]
    font: Option<PathBuf>,
}

/// Alert channel that only logs.
struct ConsoleChannel;

impl AlertChannel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    fn fire(&mut self) -> Result<()> {
        log::warn!("ALERT: intrusion detected (demo channel)");
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let source = VideoSource::open(SourceSelector::Synthetic(SyntheticConfig {
        frames: args.frames,
        ..SyntheticConfig::default()
    }))?;

    let mut backend = StubBackend::new();
    for index in 1..=args.frames {
        let mut detections = vec![Detection::person(0.8, BoundingBox::new(20, 150, 90, 330))];
        let walker = if (args.enter_at..args.enter_at + args.stay).contains(&index) {
            BoundingBox::new(400, 140, 480, 360)
        } else {
            BoundingBox::new(120, 140, 200, 360)
        };
        detections.push(Detection::person(0.9, walker));
        detections.push(Detection::new("car", 0.95, BoundingBox::new(500, 300, 620, 420)));
        backend = backend.on_frame(index, detections);
    }

    let alerts = AlertSession::new(vec![Box::new(ConsoleChannel)]);
    let mut session =
        Session::new(source, Box::new(backend), alerts).with_presenter(Box::new(LogPresenter));
    if let Some(dir) = &args.snapshot_dir {
        let mut presenter = SnapshotPresenter::new(dir, true)?;
        if let Some(font) = &args.font {
            presenter = presenter.with_font(font)?;
        }
        session = session.with_presenter(Box::new(presenter));
    }

    let summary = session.run(&AtomicBool::new(false))?;
    log::info!(
        "demo complete: {} frames, {} with intrusion, {} alert(s)",
        summary.frames,
        summary.intrusion_frames,
        summary.alerts.len()
    );
    Ok(())
}
