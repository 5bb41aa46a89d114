//! The frame loop.
//!
//! One `Session` is one run from capture open to capture close: read a frame,
//! bring it to the working size, detect, classify against the zone, feed the
//! alert latch, present. The loop is synchronous; it stops at end of stream or
//! when the stop flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::alert::{AlertReport, AlertSession, AlertState};
use crate::classify::{classify, FrameVerdict};
use crate::detect::DetectorBackend;
use crate::frame::Frame;
use crate::ingest::VideoSource;
use crate::present::{Overlay, Presenter};
use crate::staging::StagedVideo;
use crate::zone::compute_zone;

/// Result of processing one frame.
#[derive(Debug)]
pub struct FrameOutcome {
    pub verdict: FrameVerdict,
    pub overlay: Overlay,
    /// Set only on the frame that fired the alert channels.
    pub report: Option<AlertReport>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub intrusion_frames: u64,
    pub inference_failures: u64,
    pub alerts: Vec<AlertReport>,
    /// True when the loop ended because the stop flag was raised.
    pub stopped: bool,
}

pub struct Session {
    source: VideoSource,
    detector: Box<dyn DetectorBackend>,
    alerts: AlertSession,
    presenters: Vec<Box<dyn Presenter>>,
    inference_failures: u64,
}

impl Session {
    pub fn new(
        source: VideoSource,
        detector: Box<dyn DetectorBackend>,
        alerts: AlertSession,
    ) -> Self {
        Self {
            source,
            detector,
            alerts,
            presenters: Vec::new(),
            inference_failures: 0,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenters.push(presenter);
        self
    }

    pub fn alert_state(&self) -> AlertState {
        self.alerts.state()
    }

    /// Run one already-resized frame through detection, classification, alerting
    /// and presentation.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let zone = compute_zone(frame.width, frame.height);

        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                self.inference_failures += 1;
                log::warn!(
                    "frame {}: inference failed, treating as empty: {:#}",
                    frame.index,
                    e
                );
                Vec::new()
            }
        };

        let verdict = classify(&detections, &zone);
        let report = self.alerts.observe(frame.index, verdict.intrusion);
        let overlay = Overlay::build(frame.index, zone, &verdict, report.is_some());

        for presenter in self.presenters.iter_mut() {
            if let Err(e) = presenter.present(frame, &overlay) {
                log::warn!("frame {}: presentation failed: {:#}", frame.index, e);
            }
        }

        FrameOutcome {
            verdict,
            overlay,
            report,
        }
    }

    /// Loop until the source ends or `stop` is set, then release the capture handle.
    pub fn run(mut self, stop: &AtomicBool) -> Result<SessionSummary> {
        log::info!(
            "session started on {} with detector '{}'",
            self.source.description(),
            self.detector.name()
        );
        let mut summary = SessionSummary::default();

        loop {
            if stop.load(Ordering::SeqCst) {
                log::info!("stop requested");
                summary.stopped = true;
                break;
            }

            let frame = match self.next_working_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("frame source failed, ending session: {:#}", e);
                    break;
                }
            };

            let outcome = self.process_frame(&frame);

            summary.frames += 1;
            if outcome.verdict.intrusion {
                summary.intrusion_frames += 1;
            }
            if let Some(report) = outcome.report {
                summary.alerts.push(report);
            }
        }

        summary.inference_failures = self.inference_failures;
        self.source.close();
        log::info!(
            "session ended: {} frames, {} with intrusion, {} alert(s)",
            summary.frames,
            summary.intrusion_frames,
            summary.alerts.len()
        );
        Ok(summary)
    }

    /// Run on a staged upload, then delete the staged copy.
    ///
    /// `run` releases the capture handle before it returns, so the copy is only
    /// removed once nothing reads it. A failed deletion is a warning.
    pub fn run_staged(self, stop: &AtomicBool, staged: StagedVideo) -> Result<SessionSummary> {
        let summary = self.run(stop)?;
        if let Err(e) = staged.cleanup() {
            log::warn!("{:#}", e);
        }
        Ok(summary)
    }

    fn next_working_frame(&mut self) -> Result<Option<Frame>> {
        match self.source.next_frame()? {
            Some(frame) => frame.to_working_size().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::testing::RecordingChannel;
    use crate::classify::DisplayLabel;
    use crate::detect::{BoundingBox, Detection, StubBackend};
    use crate::ingest::{SourceSelector, SyntheticConfig};
    use anyhow::anyhow;

    fn synthetic(frames: u64) -> Result<VideoSource> {
        VideoSource::open(SourceSelector::Synthetic(SyntheticConfig {
            width: 640,
            height: 480,
            frames,
            ..SyntheticConfig::default()
        }))
    }

    fn intruder() -> Detection {
        Detection::person(0.9, BoundingBox::new(300, 200, 340, 260))
    }

    struct FailingBackend;

    impl DetectorBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Err(anyhow!("inference exploded"))
        }
    }

    #[test]
    fn intrusion_on_frames_three_to_five_alerts_once() -> Result<()> {
        let backend = StubBackend::new()
            .on_frame(3, vec![intruder()])
            .on_frame(4, vec![intruder()])
            .on_frame(5, vec![intruder()]);
        let (buzzer, calls) = RecordingChannel::new("buzzer", false);
        let session = Session::new(
            synthetic(8)?,
            Box::new(backend),
            AlertSession::new(vec![Box::new(buzzer)]),
        );

        let summary = session.run(&AtomicBool::new(false))?;
        assert_eq!(summary.frames, 8);
        assert_eq!(summary.intrusion_frames, 3);
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].frame_index, 3);
        assert_eq!(*calls.borrow(), 1);
        assert!(!summary.stopped);
        Ok(())
    }

    #[test]
    fn banner_only_on_trigger_frame() -> Result<()> {
        let backend = StubBackend::new()
            .on_frame(1, vec![intruder()])
            .on_frame(2, vec![intruder()]);
        let mut session = Session::new(synthetic(2)?, Box::new(backend), AlertSession::new(vec![]));

        let first = session.process_frame(&Frame::filled(640, 480, [0, 0, 0], 1)?);
        let second = session.process_frame(&Frame::filled(640, 480, [0, 0, 0], 2)?);

        assert!(first.overlay.banner);
        assert!(first.report.is_some());
        assert!(!second.overlay.banner);
        assert!(second.report.is_none());
        assert!(second.verdict.intrusion);
        assert_eq!(second.overlay.boxes[0].label, DisplayLabel::Intruder);
        assert_eq!(session.alert_state(), AlertState::Alerted);
        Ok(())
    }

    #[test]
    fn inference_failure_is_an_empty_frame() -> Result<()> {
        let session = Session::new(
            synthetic(3)?,
            Box::new(FailingBackend),
            AlertSession::new(vec![]),
        );
        let summary = session.run(&AtomicBool::new(false))?;
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.inference_failures, 3);
        assert!(summary.alerts.is_empty());
        Ok(())
    }

    #[test]
    fn feed_dropout_ends_session_normally() -> Result<()> {
        let source = VideoSource::open(SourceSelector::Synthetic(SyntheticConfig {
            frames: 10,
            fail_at: Some(4),
            ..SyntheticConfig::default()
        }))?;
        let backend = StubBackend::new().on_frame(2, vec![intruder()]);
        let session = Session::new(source, Box::new(backend), AlertSession::new(vec![]));

        let summary = session.run(&AtomicBool::new(false))?;
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.alerts.len(), 1);
        assert!(!summary.stopped);
        Ok(())
    }

    #[test]
    fn raised_stop_flag_ends_before_first_frame() -> Result<()> {
        let session = Session::new(
            synthetic(10)?,
            Box::new(StubBackend::new()),
            AlertSession::new(vec![]),
        );
        let summary = session.run(&AtomicBool::new(true))?;
        assert!(summary.stopped);
        assert_eq!(summary.frames, 0);
        Ok(())
    }

    #[test]
    fn frames_are_resized_to_working_size() -> Result<()> {
        let source = VideoSource::open(SourceSelector::Synthetic(SyntheticConfig {
            width: 320,
            height: 240,
            frames: 1,
            ..SyntheticConfig::default()
        }))?;
        // Center (520, 230) lies past the right edge of a 320x240 frame.
        let person = Detection::person(0.9, BoundingBox::new(500, 200, 540, 260));
        let backend = StubBackend::new().on_frame(1, vec![person]);
        let session = Session::new(source, Box::new(backend), AlertSession::new(vec![]));
        let summary = session.run(&AtomicBool::new(false))?;
        assert_eq!(summary.intrusion_frames, 1);
        Ok(())
    }
}
