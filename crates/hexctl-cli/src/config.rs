//! Configuration loader – reads `servo_offsets.json` and
//! `pan_tilt_limits.json` from the working directory.
//!
//! The core never parses these files; it receives the validated
//! [`ServoOffsets`] table and [`PanTiltLimits`] bounds from here. A missing
//! or malformed file falls back to the built-in defaults with a warning
//! rather than refusing to start.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use hexctl_types::{PanTiltLimits, ServoOffsets};
use serde::Deserialize;
use tracing::warn;

/// Per-port servo trim table, keyed by port number.
pub const OFFSETS_FILE: &str = "servo_offsets.json";

/// Pan/tilt angle bounds shared by both rigs.
pub const LIMITS_FILE: &str = "pan_tilt_limits.json";

/// Load the servo offset table from the working directory.
pub fn load_offsets() -> ServoOffsets {
    load_offsets_from(Path::new(OFFSETS_FILE))
}

/// Load the pan/tilt bounds from the working directory.
pub fn load_limits() -> PanTiltLimits {
    load_limits_from(Path::new(LIMITS_FILE))
}

pub(crate) fn load_offsets_from(path: &Path) -> ServoOffsets {
    if !path.exists() {
        return ServoOffsets::default();
    }
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| {
            serde_json::from_str::<HashMap<String, i32>>(&raw).map_err(|e| e.to_string())
        })
        .and_then(parse_ports);
    match parsed {
        Ok(offsets) => offsets,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "offset table unreadable; using mechanical neutral");
            ServoOffsets::default()
        }
    }
}

fn parse_ports(table: HashMap<String, i32>) -> Result<ServoOffsets, String> {
    let mut ports = HashMap::new();
    for (key, trim) in table {
        let port: u8 = key
            .parse()
            .map_err(|_| format!("invalid servo port '{key}'"))?;
        ports.insert(port, trim);
    }
    Ok(ServoOffsets::new(ports))
}

/// On-disk shape of the limits file. Absent keys keep their defaults.
#[derive(Debug, Deserialize)]
struct RawLimits {
    #[serde(rename = "PAN_MIN")]
    pan_min: Option<i32>,
    #[serde(rename = "PAN_MAX")]
    pan_max: Option<i32>,
    #[serde(rename = "TILT_MIN")]
    tilt_min: Option<i32>,
    #[serde(rename = "TILT_MAX")]
    tilt_max: Option<i32>,
}

pub(crate) fn load_limits_from(path: &Path) -> PanTiltLimits {
    let defaults = PanTiltLimits::default();
    if !path.exists() {
        return defaults;
    }
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<RawLimits>(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(raw) => PanTiltLimits {
            pan_min: raw.pan_min.unwrap_or(defaults.pan_min),
            pan_max: raw.pan_max.unwrap_or(defaults.pan_max),
            tilt_min: raw.tilt_min.unwrap_or(defaults.tilt_min),
            tilt_max: raw.tilt_max.unwrap_or(defaults.tilt_max),
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "limits file unreadable; using full servo range");
            defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).expect("create");
        f.write_all(content.as_bytes()).expect("write");
        path
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let offsets = load_offsets_from(&dir.path().join("nope.json"));
        assert_eq!(offsets.apply(24, 90), 90);

        let limits = load_limits_from(&dir.path().join("nope.json"));
        assert_eq!(limits, PanTiltLimits::default());
    }

    #[test]
    fn offsets_parse_and_apply() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, OFFSETS_FILE, r#"{"24": -5, "6": 3}"#);
        let offsets = load_offsets_from(&path);
        assert_eq!(offsets.apply(24, 90), 85);
        assert_eq!(offsets.apply(6, 90), 93);
        assert_eq!(offsets.apply(25, 90), 90);
    }

    #[test]
    fn malformed_offsets_fall_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, OFFSETS_FILE, "not json at all");
        let offsets = load_offsets_from(&path);
        assert_eq!(offsets, ServoOffsets::default());
    }

    #[test]
    fn non_numeric_port_falls_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, OFFSETS_FILE, r#"{"pan": 4}"#);
        let offsets = load_offsets_from(&path);
        assert_eq!(offsets, ServoOffsets::default());
    }

    #[test]
    fn limits_parse_with_partial_keys() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, LIMITS_FILE, r#"{"PAN_MIN": 20, "TILT_MAX": 140}"#);
        let limits = load_limits_from(&path);
        assert_eq!(limits.pan_min, 20);
        assert_eq!(limits.pan_max, 180);
        assert_eq!(limits.tilt_min, 0);
        assert_eq!(limits.tilt_max, 140);
    }

    #[test]
    fn malformed_limits_fall_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, LIMITS_FILE, r#"[1, 2, 3]"#);
        let limits = load_limits_from(&path);
        assert_eq!(limits, PanTiltLimits::default());
    }
}
