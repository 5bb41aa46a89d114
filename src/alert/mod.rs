//! Alert session state and alert channels.
//!
//! `AlertSession` is a latch owned by the running session loop. It starts `Idle`,
//! fires every channel on the first intrusion frame, then stays `Alerted` until the
//! session ends. Channel failures are reported and never retried.

mod buzzer;
mod email;

use anyhow::Result;

pub use buzzer::BuzzerChannel;
pub use email::{EmailChannel, EmailSecrets, EmailSettings, ALERT_BODY, ALERT_SUBJECT};

/// One way of telling a human about an intrusion.
pub trait AlertChannel {
    /// Channel identifier used in reports and logs.
    fn name(&self) -> &'static str;

    /// Deliver the alert once. Blocking is allowed; there is no retry.
    fn fire(&mut self) -> Result<()>;
}

impl<C: AlertChannel + ?Sized> AlertChannel for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fire(&mut self) -> Result<()> {
        (**self).fire()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Alerted,
}

/// What happens after an alert has fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RearmPolicy {
    /// Stay `Alerted` until the session ends.
    #[default]
    OncePerSession,
    /// Return to `Idle` on the first frame without an intrusion.
    AfterClearFrame,
}

/// Outcome of one channel during a trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    /// `None` on success, the error text otherwise.
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Report produced on the frame that triggered the alert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertReport {
    pub frame_index: u64,
    pub outcomes: Vec<ChannelOutcome>,
}

impl AlertReport {
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(ChannelOutcome::succeeded)
    }
}

/// One-shot alert latch with its channels.
pub struct AlertSession {
    state: AlertState,
    policy: RearmPolicy,
    channels: Vec<Box<dyn AlertChannel>>,
    triggers: u64,
}

impl AlertSession {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            state: AlertState::Idle,
            policy: RearmPolicy::default(),
            channels,
            triggers: 0,
        }
    }

    pub fn with_policy(mut self, policy: RearmPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Number of times the channels have been fired in this session.
    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    /// Return to `Idle`. Call only when a new session (new capture handle) begins.
    pub fn reset(&mut self) {
        self.state = AlertState::Idle;
        self.triggers = 0;
    }

    /// Feed the intrusion flag of one frame.
    ///
    /// Returns a report only on the frame that fires the channels.
    pub fn observe(&mut self, frame_index: u64, intrusion: bool) -> Option<AlertReport> {
        match (self.state, intrusion) {
            (AlertState::Idle, true) => {
                let report = self.fire_all(frame_index);
                self.state = AlertState::Alerted;
                self.triggers += 1;
                Some(report)
            }
            (AlertState::Alerted, false) if self.policy == RearmPolicy::AfterClearFrame => {
                log::info!("frame {}: zone clear, alert re-armed", frame_index);
                self.state = AlertState::Idle;
                None
            }
            _ => None,
        }
    }

    fn fire_all(&mut self, frame_index: u64) -> AlertReport {
        let outcomes = self
            .channels
            .iter_mut()
            .map(|channel| {
                let error = match channel.fire() {
                    Ok(()) => {
                        log::info!("{} alert sent", channel.name());
                        None
                    }
                    Err(e) => {
                        log::error!("{} alert failed: {:#}", channel.name(), e);
                        Some(format!("{:#}", e))
                    }
                };
                ChannelOutcome {
                    channel: channel.name(),
                    error,
                }
            })
            .collect();
        AlertReport {
            frame_index,
            outcomes,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::{anyhow, Result};

    use super::AlertChannel;

    /// Channel that counts calls and can be told to fail.
    pub(crate) struct RecordingChannel {
        pub(crate) name: &'static str,
        pub(crate) fail: bool,
        pub(crate) calls: Rc<RefCell<u32>>,
    }

    impl RecordingChannel {
        pub(crate) fn new(name: &'static str, fail: bool) -> (Self, Rc<RefCell<u32>>) {
            let calls = Rc::new(RefCell::new(0));
            (
                Self {
                    name,
                    fail,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl AlertChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn fire(&mut self) -> Result<()> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                Err(anyhow!("{} unavailable", self.name))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingChannel;
    use super::*;

    #[test]
    fn fires_once_on_first_intrusion() {
        let (buzzer, buzzer_calls) = RecordingChannel::new("buzzer", false);
        let (email, email_calls) = RecordingChannel::new("email", false);
        let mut session = AlertSession::new(vec![Box::new(buzzer), Box::new(email)]);

        let flags = [false, false, true, true, true];
        let mut reports = Vec::new();
        for (i, intrusion) in flags.iter().enumerate() {
            if let Some(report) = session.observe(i as u64 + 1, *intrusion) {
                reports.push(report);
            }
        }

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].frame_index, 3);
        assert!(reports[0].all_delivered());
        assert_eq!(*buzzer_calls.borrow(), 1);
        assert_eq!(*email_calls.borrow(), 1);
        assert_eq!(session.state(), AlertState::Alerted);
        assert_eq!(session.triggers(), 1);
    }

    #[test]
    fn email_failure_still_latches_without_retry() {
        let (buzzer, buzzer_calls) = RecordingChannel::new("buzzer", false);
        let (email, email_calls) = RecordingChannel::new("email", true);
        let mut session = AlertSession::new(vec![Box::new(buzzer), Box::new(email)]);

        let report = session.observe(1, true).expect("first intrusion fires");
        assert!(!report.all_delivered());
        assert!(report.outcomes[0].succeeded());
        assert_eq!(
            report.outcomes[1].error.as_deref(),
            Some("email unavailable")
        );
        assert_eq!(session.state(), AlertState::Alerted);

        assert!(session.observe(2, true).is_none());
        assert!(session.observe(3, true).is_none());
        assert_eq!(*buzzer_calls.borrow(), 1);
        assert_eq!(*email_calls.borrow(), 1);
    }

    #[test]
    fn buzzer_failure_does_not_block_email() {
        let (buzzer, buzzer_calls) = RecordingChannel::new("buzzer", true);
        let (email, email_calls) = RecordingChannel::new("email", false);
        let mut session = AlertSession::new(vec![Box::new(buzzer), Box::new(email)]);

        let report = session.observe(4, true).expect("fires");
        assert!(!report.outcomes[0].succeeded());
        assert!(report.outcomes[1].succeeded());
        assert_eq!(session.state(), AlertState::Alerted);

        assert!(session.observe(5, true).is_none());
        assert_eq!(*buzzer_calls.borrow(), 1);
        assert_eq!(*email_calls.borrow(), 1);
    }

    #[test]
    fn clear_frames_do_not_rearm_by_default() {
        let (buzzer, calls) = RecordingChannel::new("buzzer", false);
        let mut session = AlertSession::new(vec![Box::new(buzzer)]);

        assert!(session.observe(1, true).is_some());
        assert!(session.observe(2, false).is_none());
        assert!(session.observe(3, true).is_none());
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(session.state(), AlertState::Alerted);
    }

    #[test]
    fn rearm_after_clear_policy_allows_new_episode() {
        let (buzzer, calls) = RecordingChannel::new("buzzer", false);
        let mut session =
            AlertSession::new(vec![Box::new(buzzer)]).with_policy(RearmPolicy::AfterClearFrame);

        assert!(session.observe(1, true).is_some());
        assert!(session.observe(2, true).is_none());
        assert!(session.observe(3, false).is_none());
        assert_eq!(session.state(), AlertState::Idle);
        assert!(session.observe(4, true).is_some());
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(session.triggers(), 2);
    }

    #[test]
    fn reset_starts_fresh_session() {
        let (buzzer, calls) = RecordingChannel::new("buzzer", false);
        let mut session = AlertSession::new(vec![Box::new(buzzer)]);

        assert!(session.observe(1, true).is_some());
        session.reset();
        assert_eq!(session.state(), AlertState::Idle);
        assert_eq!(session.triggers(), 0);
        assert!(session.observe(1, true).is_some());
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn no_channels_still_latches() {
        let mut session = AlertSession::new(Vec::new());
        let report = session.observe(1, true).expect("fires");
        assert!(report.outcomes.is_empty());
        assert!(report.all_delivered());
        assert_eq!(session.state(), AlertState::Alerted);
    }
}
