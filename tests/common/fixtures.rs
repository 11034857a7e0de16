//! Test fixtures: frame files, signed-looking tokens, config files.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use image::{Rgb, RgbImage};

/// Write a solid-color PNG frame and return its path.
pub fn write_frame(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(&path)
        .expect("write frame");
    path
}

/// Directory of `count` frames named `frame_00.png`, `frame_01.png`, ...
pub fn write_frames(dir: &Path, count: usize) -> PathBuf {
    let frames = dir.join("frames");
    std::fs::create_dir_all(&frames).expect("create frames dir");
    for i in 0..count {
        #[allow(clippy::cast_possible_truncation)]
        let shade = (i * 40) as u8;
        write_frame(&frames, &format!("frame_{i:02}.png"), 320, 240, [shade, 90, 160]);
    }
    frames
}

/// Unsigned JWT-shaped token carrying `payload`.
pub fn token(payload: &serde_json::Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

/// Token for `username` expiring `hours` from now (negative: already expired).
pub fn token_for(username: &str, hours: i64) -> String {
    let exp = (Utc::now() + Duration::hours(hours)).timestamp();
    token(&serde_json::json!({
        "sub": "17",
        "username": username,
        "role": "employee",
        "exp": exp,
    }))
}

/// TOML config pointing at `base_url`.
pub fn write_config(dir: &Path, base_url: &str, extra: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, format!("base_url = \"{base_url}\"\n{extra}")).expect("write config");
    path
}
