use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use zone_sentry::config::{BackendKind, FeedKind, SentryConfig};
use zone_sentry::RearmPolicy;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ZONE_SENTRY_CONFIG",
        "ZONE_SENTRY_FEED",
        "ZONE_SENTRY_CAMERA_INDEX",
        "ZONE_SENTRY_VIDEO",
        "ZONE_SENTRY_BACKEND",
        "ZONE_SENTRY_BUZZER",
        "ZONE_SENTRY_SECRETS",
        "ZONE_SENTRY_REARM_AFTER_CLEAR",
        "ZONE_SENTRY_SNAPSHOT_DIR",
        "ZONE_SENTRY_SENDER_EMAIL",
        "ZONE_SENTRY_SENDER_PASSWORD",
        "ZONE_SENTRY_RECEIVER_EMAIL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "feed": "file",
            "video_path": "uploads/porch.mp4",
            "target_fps": 15
        },
        "detector": {
            "backend": "opencv",
            "prototxt": "models/ssd.prototxt.txt",
            "caffemodel": "models/ssd.caffemodel"
        },
        "alerts": {
            "buzzer_path": "sounds/buzzer.mp3",
            "smtp_port": 587
        },
        "output": {
            "snapshot_dir": "snapshots"
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ZONE_SENTRY_CONFIG", file.path());
    std::env::set_var("ZONE_SENTRY_BACKEND", "stub");
    std::env::set_var("ZONE_SENTRY_REARM_AFTER_CLEAR", "true");

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.source.feed, FeedKind::File);
    assert_eq!(cfg.source.video_path, Some(PathBuf::from("uploads/porch.mp4")));
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.detector.backend, BackendKind::Stub);
    assert_eq!(cfg.detector.prototxt, PathBuf::from("models/ssd.prototxt.txt"));
    assert_eq!(cfg.detector.onnx, PathBuf::from("MobileNetSSD_deploy.onnx"));
    assert_eq!(cfg.alerts.buzzer_path, PathBuf::from("sounds/buzzer.mp3"));
    assert_eq!(cfg.alerts.email.smtp_host, "smtp.gmail.com");
    assert_eq!(cfg.alerts.email.smtp_port, 587);
    assert_eq!(cfg.alerts.rearm_policy, RearmPolicy::AfterClearFrame);
    assert_eq!(cfg.output.snapshot_dir, Some(PathBuf::from("snapshots")));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "source": { "feed": "file" } }"#)
        .expect("write config");
    std::env::set_var("ZONE_SENTRY_CONFIG", file.path());
    let err = SentryConfig::load().expect_err("file feed without video");
    assert!(err.to_string().contains("no video path"));

    std::env::remove_var("ZONE_SENTRY_CONFIG");
    std::env::set_var("ZONE_SENTRY_CAMERA_INDEX", "front");
    assert!(SentryConfig::load().is_err());

    std::env::remove_var("ZONE_SENTRY_CAMERA_INDEX");
    std::env::set_var("ZONE_SENTRY_BACKEND", "yolo");
    assert!(SentryConfig::load().is_err());

    clear_env();
}

#[test]
fn secrets_come_from_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut secrets = NamedTempFile::new().expect("temp secrets");
    secrets
        .write_all(
            br#"
sender_email = "sentry@example.com"
sender_password = "app-password"
receiver_email = "owner@example.com"
"#,
        )
        .expect("write secrets");
    std::env::set_var("ZONE_SENTRY_SECRETS", secrets.path());

    let cfg = SentryConfig::load().expect("load config");
    let loaded = cfg.load_secrets().expect("read secrets").expect("secrets present");
    assert_eq!(loaded.sender_email, "sentry@example.com");
    assert_eq!(loaded.receiver_email, "owner@example.com");
    assert!(!format!("{:?}", loaded).contains("app-password"));

    clear_env();
}

#[test]
fn environment_secrets_win_and_partial_sets_are_ignored() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ZONE_SENTRY_SECRETS", "/nonexistent/secrets.toml");
    let cfg = SentryConfig::load().expect("load config");
    assert!(cfg.load_secrets().expect("missing file is not an error").is_none());

    std::env::set_var("ZONE_SENTRY_SENDER_EMAIL", "sentry@example.com");
    let partial = cfg.load_secrets().expect("partial env secrets are not fatal");
    assert!(partial.is_none());

    std::env::set_var("ZONE_SENTRY_SENDER_PASSWORD", "app-password");
    std::env::set_var("ZONE_SENTRY_RECEIVER_EMAIL", "owner@example.com");
    let loaded = cfg.load_secrets().expect("env secrets").expect("secrets present");
    assert_eq!(loaded.sender_password, "app-password");

    clear_env();
}
