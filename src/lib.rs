//! Zone Sentry
//!
//! Single-camera zone intrusion alerting: watch a feed, detect people, and raise a
//! one-shot alarm when a person's center enters the monitored zone.
//!
//! # Architecture
//!
//! The pipeline is a synchronous per-frame loop:
//!
//! 1. **Ingest**: a camera or a staged video file produces RGB frames.
//! 2. **Detect**: a MobileNet-SSD backend returns labelled, scored boxes.
//! 3. **Classify**: confident person boxes are split into intruders and
//!    authorized persons by the zone rectangle.
//! 4. **Alert**: the first intrusion frame of a session fires the buzzer and the
//!    email channel exactly once.
//! 5. **Present**: overlays are logged or written as snapshots.
//!
//! # Module Structure
//!
//! - `frame`: RGB frame buffer and working-size resize
//! - `ingest`: frame sources (V4L2 camera, local files, synthetic)
//! - `staging`: temporary copies of uploaded videos
//! - `zone`: zone rectangle geometry
//! - `detect`: detector backends and SSD pre/post-processing
//! - `classify`: confidence filter and zone membership
//! - `alert`: alert latch, buzzer and email channels
//! - `present`: overlays and presenters
//! - `session`: the frame loop
//! - `config`: JSON config, env overrides and secrets

pub mod alert;
pub mod classify;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod present;
pub mod session;
pub mod staging;
pub mod zone;

pub use alert::{AlertChannel, AlertReport, AlertSession, AlertState, RearmPolicy};
pub use classify::{classify, ClassifiedDetection, DisplayLabel, FrameVerdict};
pub use config::SentryConfig;
pub use detect::{load_backend, BoundingBox, Detection, DetectorBackend};
pub use frame::Frame;
pub use ingest::{SourceSelector, VideoSource};
pub use present::{LogPresenter, Overlay, Presenter, SnapshotPresenter};
pub use session::{Session, SessionSummary};
pub use staging::StagedVideo;
pub use zone::{compute_zone, Rect};
