use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::alert::{EmailSecrets, EmailSettings, RearmPolicy};

const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_PROTOTXT: &str = "MobileNetSSD_deploy.prototxt.txt";
const DEFAULT_CAFFEMODEL: &str = "MobileNetSSD_deploy.caffemodel";
const DEFAULT_ONNX: &str = "MobileNetSSD_deploy.onnx";
const DEFAULT_BUZZER_PATH: &str = "buzzer-or-wrong-answer-20582.mp3";
const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

const SECRET_ENV_KEYS: [&str; 3] = [
    "ZONE_SENTRY_SENDER_EMAIL",
    "ZONE_SENTRY_SENDER_PASSWORD",
    "ZONE_SENTRY_RECEIVER_EMAIL",
];

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    alerts: Option<AlertsConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    feed: Option<String>,
    camera_index: Option<u32>,
    video_path: Option<PathBuf>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    prototxt: Option<PathBuf>,
    caffemodel: Option<PathBuf>,
    onnx: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsConfigFile {
    buzzer_path: Option<PathBuf>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    secrets_path: Option<PathBuf>,
    rearm_after_clear: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    snapshot_dir: Option<PathBuf>,
    snapshot_all_frames: Option<bool>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub alerts: AlertSettings,
    pub output: OutputSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedKind {
    Camera,
    File,
}

impl FromStr for FeedKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" | "webcam" => Ok(FeedKind::Camera),
            "file" | "upload" | "video" => Ok(FeedKind::File),
            other => Err(anyhow!(
                "unknown feed type '{}' (expected camera or file)",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Opencv,
    Tract,
    Stub,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "opencv" | "caffe" => Ok(BackendKind::Opencv),
            "tract" | "onnx" => Ok(BackendKind::Tract),
            "stub" => Ok(BackendKind::Stub),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected opencv, tract or stub)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub feed: FeedKind,
    pub camera_index: u32,
    pub video_path: Option<PathBuf>,
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub prototxt: PathBuf,
    pub caffemodel: PathBuf,
    pub onnx: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub buzzer_path: PathBuf,
    pub email: EmailSettings,
    pub secrets_path: PathBuf,
    pub rearm_policy: RearmPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct OutputSettings {
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_all_frames: bool,
    pub font_path: Option<PathBuf>,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self::from_file(SentryConfigFile::default()).expect("default configuration is valid")
    }
}

impl SentryConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ZONE_SENTRY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Result<Self> {
        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            feed: source_file
                .feed
                .as_deref()
                .map(FeedKind::from_str)
                .transpose()?
                .unwrap_or(FeedKind::Camera),
            camera_index: source_file.camera_index.unwrap_or(DEFAULT_CAMERA_INDEX),
            video_path: source_file.video_path,
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .as_deref()
                .map(BackendKind::from_str)
                .transpose()?
                .unwrap_or(BackendKind::Opencv),
            prototxt: detector_file
                .prototxt
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROTOTXT)),
            caffemodel: detector_file
                .caffemodel
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CAFFEMODEL)),
            onnx: detector_file
                .onnx
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ONNX)),
        };

        let alerts_file = file.alerts.unwrap_or_default();
        let email_defaults = EmailSettings::default();
        let alerts = AlertSettings {
            buzzer_path: alerts_file
                .buzzer_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUZZER_PATH)),
            email: EmailSettings {
                smtp_host: alerts_file.smtp_host.unwrap_or(email_defaults.smtp_host),
                smtp_port: alerts_file.smtp_port.unwrap_or(email_defaults.smtp_port),
            },
            secrets_path: alerts_file
                .secrets_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH)),
            rearm_policy: rearm_policy(alerts_file.rearm_after_clear.unwrap_or(false)),
        };

        let output_file = file.output.unwrap_or_default();
        let output = OutputSettings {
            snapshot_dir: output_file.snapshot_dir,
            snapshot_all_frames: output_file.snapshot_all_frames.unwrap_or(false),
            font_path: output_file.font_path,
        };

        Ok(Self {
            source,
            detector,
            alerts,
            output,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(feed) = non_empty_env("ZONE_SENTRY_FEED") {
            self.source.feed = feed.parse()?;
        }
        if let Some(index) = non_empty_env("ZONE_SENTRY_CAMERA_INDEX") {
            self.source.camera_index = index
                .parse()
                .map_err(|_| anyhow!("ZONE_SENTRY_CAMERA_INDEX must be a non-negative integer"))?;
        }
        if let Some(path) = non_empty_env("ZONE_SENTRY_VIDEO") {
            self.source.video_path = Some(PathBuf::from(path));
        }
        if let Some(backend) = non_empty_env("ZONE_SENTRY_BACKEND") {
            self.detector.backend = backend.parse()?;
        }
        if let Some(path) = non_empty_env("ZONE_SENTRY_BUZZER") {
            self.alerts.buzzer_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("ZONE_SENTRY_SECRETS") {
            self.alerts.secrets_path = PathBuf::from(path);
        }
        if let Some(flag) = non_empty_env("ZONE_SENTRY_REARM_AFTER_CLEAR") {
            let enabled: bool = flag
                .parse()
                .map_err(|_| anyhow!("ZONE_SENTRY_REARM_AFTER_CLEAR must be true or false"))?;
            self.alerts.rearm_policy = rearm_policy(enabled);
        }
        if let Some(dir) = non_empty_env("ZONE_SENTRY_SNAPSHOT_DIR") {
            self.output.snapshot_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Check cross-field constraints. Called by `load`; call again after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.source.feed == FeedKind::File && self.source.video_path.is_none() {
            return Err(anyhow!("file feed selected but no video path configured"));
        }
        if self.alerts.email.smtp_host.trim().is_empty() {
            return Err(anyhow!("smtp_host must not be empty"));
        }
        if self.alerts.email.smtp_port == 0 {
            return Err(anyhow!("smtp_port must be greater than zero"));
        }
        if self.output.snapshot_all_frames && self.output.snapshot_dir.is_none() {
            return Err(anyhow!("snapshot_all_frames requires snapshot_dir"));
        }
        Ok(())
    }

    /// Resolve email secrets from the environment, then the secrets file.
    ///
    /// Returns `Ok(None)` when neither source provides them, and with a warning when
    /// the environment sets only some of them. A malformed secrets file is an error.
    pub fn load_secrets(&self) -> Result<Option<EmailSecrets>> {
        let values: Vec<Option<String>> = SECRET_ENV_KEYS.iter().map(|k| non_empty_env(k)).collect();
        if let [Some(sender), Some(password), Some(receiver)] = values.as_slice() {
            return Ok(Some(EmailSecrets {
                sender_email: sender.clone(),
                sender_password: password.clone(),
                receiver_email: receiver.clone(),
            }));
        }
        if values.iter().any(Option::is_some) {
            let missing: Vec<&str> = SECRET_ENV_KEYS
                .iter()
                .zip(&values)
                .filter(|(_, v)| v.is_none())
                .map(|(k, _)| *k)
                .collect();
            log::warn!(
                "incomplete email secrets in environment (missing {}); email alerts will fail",
                missing.join(", ")
            );
            return Ok(None);
        }

        let path = &self.alerts.secrets_path;
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read secrets file {}", path.display()))?;
        let secrets: EmailSecrets = toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid secrets file {}: {}", path.display(), e))?;
        Ok(Some(secrets))
    }
}

fn rearm_policy(rearm_after_clear: bool) -> RearmPolicy {
    if rearm_after_clear {
        RearmPolicy::AfterClearFrame
    } else {
        RearmPolicy::OncePerSession
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_deployment() {
        let cfg = SentryConfig::default();
        assert_eq!(cfg.source.feed, FeedKind::Camera);
        assert_eq!(cfg.source.camera_index, 0);
        assert_eq!(cfg.detector.backend, BackendKind::Opencv);
        assert_eq!(
            cfg.detector.prototxt,
            PathBuf::from("MobileNetSSD_deploy.prototxt.txt")
        );
        assert_eq!(cfg.alerts.email.smtp_host, "smtp.gmail.com");
        assert_eq!(cfg.alerts.email.smtp_port, 465);
        assert_eq!(cfg.alerts.rearm_policy, RearmPolicy::OncePerSession);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_feed_and_backend_names() -> Result<()> {
        assert_eq!("Webcam".parse::<FeedKind>()?, FeedKind::Camera);
        assert_eq!("upload".parse::<FeedKind>()?, FeedKind::File);
        assert!("rtsp".parse::<FeedKind>().is_err());
        assert_eq!("caffe".parse::<BackendKind>()?, BackendKind::Opencv);
        assert_eq!("onnx".parse::<BackendKind>()?, BackendKind::Tract);
        assert!("yolo".parse::<BackendKind>().is_err());
        Ok(())
    }

    #[test]
    fn file_feed_requires_video_path() {
        let mut cfg = SentryConfig::default();
        cfg.source.feed = FeedKind::File;
        assert!(cfg.validate().is_err());
        cfg.source.video_path = Some(PathBuf::from("clip.mp4"));
        assert!(cfg.validate().is_ok());
    }
}
