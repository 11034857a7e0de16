//! Config files on disk, as the CLI loads them.

use std::time::Duration;

use attend::config::{ClientConfig, save_config};
use attend::error::AttendError;
use attend::geo::PositionReading;

use crate::common::fixtures::write_config;

#[test]
fn terminal_config_in_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "https://hr.example.com/attend",
        r#"
request_timeout_ms = 5000

[camera]
source = "frames"
max_width = 480

[recognition]
threshold = 0.42

[burst]
count = 8
interval_ms = 250

[position]
latitude = 13.7563
longitude = 100.5018
accuracy = 4.0
"#,
    );

    let config = ClientConfig::load(Some(&path)).unwrap();
    assert_eq!(config.base_url, "https://hr.example.com/attend");
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.camera.source, Some(dir.path().join("frames")));
    assert_eq!(config.camera.capture_settings().max_width, 480);
    assert_eq!(config.camera.jpeg_quality, 90);
    assert!((config.recognition.threshold - 0.42).abs() < f64::EPSILON);
    assert_eq!((config.burst.count, config.burst_interval()), (8, Duration::from_millis(250)));

    let reading = PositionReading::from(config.position.unwrap());
    assert_eq!(reading.accuracy_meters, Some(4.0));
}

#[test]
fn yaml_config_with_absolute_camera_source() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("elsewhere").join("cam.png");
    let path = dir.path().join("attend.yml");
    std::fs::write(
        &path,
        format!(
            "base_url: http://10.0.0.5:8000\ncamera:\n  source: {}\ngeolocation:\n  high_accuracy: false\n",
            frames.display()
        ),
    )
    .unwrap();

    let config = ClientConfig::load(Some(&path)).unwrap();
    assert_eq!(config.camera.source, Some(frames));
    assert!(!config.geolocation.high_accuracy);
    assert_eq!(config.geolocation_timeout(), Duration::from_secs(10));
}

#[test]
fn saved_defaults_load_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh").join("config.toml");
    save_config(&ClientConfig::default(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("base_url"));
    assert!(!text.contains("[position]"));
    assert_eq!(ClientConfig::load(Some(&path)).unwrap(), ClientConfig::default());
}

#[test]
fn out_of_range_threshold_names_the_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "http://127.0.0.1:8000", "[recognition]\nthreshold = 2.0\n");
    let err = ClientConfig::load(Some(&path)).unwrap_err();
    let AttendError::ConfigInvalid(msg) = err else {
        panic!("expected ConfigInvalid, got {err:?}");
    };
    assert!(msg.contains("recognition.threshold"), "{msg}");
}

#[test]
fn broken_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "http://127.0.0.1:8000", "[camera\nmax_width = 3\n");
    assert!(matches!(
        ClientConfig::load(Some(&path)),
        Err(AttendError::ConfigParse(_))
    ));
}
