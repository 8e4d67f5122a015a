//! Runtime configuration
//!
//! Loaded from an optional JSON file; every field has a default so a partial
//! file (or none at all) is valid. Command-line flags are applied on top in
//! `main`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::marker::{DetectorParams, MarkerId};

/// Largest accepted adaptive threshold radius (pixels)
pub const MAX_THRESHOLD_RADIUS: u32 = 4096;

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Live webcam by index
    Camera {
        #[serde(default)]
        index: u32,
    },
    /// Image files in a directory, played in name order
    Frames {
        dir: PathBuf,
        #[serde(default)]
        looping: bool,
        /// Playback rate; unpaced when absent
        #[serde(default)]
        fps: Option<u32>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Camera { index: 0 }
    }
}

impl SourceConfig {
    pub fn display_name(&self) -> String {
        match self {
            SourceConfig::Camera { index } => format!("camera {}", index),
            SourceConfig::Frames { dir, .. } => format!("frames in {}", dir.display()),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Marker that triggers the overlay
    pub target_marker_id: MarkerId,
    /// Render timer interval
    pub render_interval_ms: u64,
    /// Rotation added per visible render tick
    pub phase_step_degrees: f64,
    pub window_width: u32,
    pub window_height: u32,
    pub window_title: String,
    /// Open the annotated camera preview window
    pub preview_enabled: bool,
    pub preview_title: String,
    /// Text drawn on the overlay
    pub label_text: String,
    pub source: SourceConfig,
    pub detector: DetectorParams,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            target_marker_id: 0,
            render_interval_ms: 16,
            phase_step_degrees: 1.0,
            window_width: 800,
            window_height: 600,
            window_title: "AR Marker Detection".to_string(),
            preview_enabled: true,
            preview_title: "Video Feed".to_string(),
            label_text: "Example Text".to_string(),
            source: SourceConfig::default(),
            detector: DetectorParams::default(),
        }
    }
}

impl OverlayConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the rest of the program relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "render_interval_ms must be at least 1".to_string(),
            ));
        }
        if !self.phase_step_degrees.is_finite() || self.phase_step_degrees <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "phase_step_degrees must be positive, got {}",
                self.phase_step_degrees
            )));
        }
        let family = self.detector.family;
        if !family.is_supported() {
            return Err(ConfigError::Invalid(format!(
                "marker family {} needs a build with the `opencv` feature",
                family
            )));
        }
        if self.target_marker_id > family.max_id() {
            return Err(ConfigError::Invalid(format!(
                "target_marker_id {} out of range 0..={} for {}",
                self.target_marker_id,
                family.max_id(),
                family
            )));
        }
        self.validate_detector()?;
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} is empty",
                self.window_width, self.window_height
            )));
        }
        Ok(())
    }

    fn validate_detector(&self) -> Result<(), ConfigError> {
        let params = &self.detector;
        if params.threshold_radius > MAX_THRESHOLD_RADIUS {
            return Err(ConfigError::Invalid(format!(
                "detector.threshold_radius {} exceeds {}",
                params.threshold_radius, MAX_THRESHOLD_RADIUS
            )));
        }
        if !params.min_marker_side.is_finite() || params.min_marker_side < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "detector.min_marker_side must be a non-negative number, got {}",
                params.min_marker_side
            )));
        }
        if !params.edge_tolerance.is_finite() || params.edge_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "detector.edge_tolerance must be a non-negative number, got {}",
                params.edge_tolerance
            )));
        }
        Ok(())
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerFamily;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        assert_eq!(config.target_marker_id, 0);
        assert_eq!(config.render_interval(), Duration::from_millis(16));
        assert_eq!(config.phase_step_degrees, 1.0);
        assert_eq!((config.window_width, config.window_height), (800, 600));
        assert_eq!(config.label_text, "Example Text");
        assert_eq!(config.source, SourceConfig::Camera { index: 0 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "target_marker_id": 42,
            "source": { "type": "frames", "dir": "/tmp/frames", "looping": true },
            "detector": { "min_contrast": 60 }
        }"#;
        let config: OverlayConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.target_marker_id, 42);
        assert_eq!(config.render_interval_ms, 16);
        assert_eq!(
            config.source,
            SourceConfig::Frames {
                dir: PathBuf::from("/tmp/frames"),
                looping: true,
                fps: None,
            }
        );
        assert_eq!(config.detector.min_contrast, 60);
        assert_eq!(config.detector.threshold_offset, 7);
    }

    #[test]
    fn test_validate_rejects() {
        let cases: [fn(&mut OverlayConfig); 10] = [
            |c| c.render_interval_ms = 0,
            |c| c.phase_step_degrees = 0.0,
            |c| c.phase_step_degrees = f64::NAN,
            |c| c.target_marker_id = 1024,
            |c| c.window_height = 0,
            |c| c.detector.threshold_radius = u32::MAX,
            |c| c.detector.min_marker_side = -1.0,
            |c| c.detector.min_marker_side = f32::INFINITY,
            |c| c.detector.edge_tolerance = f32::NAN,
            |c| c.detector.edge_tolerance = -0.1,
        ];
        for mutate in cases {
            let mut config = OverlayConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_detector_bounds_accepted() {
        let mut config = OverlayConfig::default();
        config.detector.threshold_radius = MAX_THRESHOLD_RADIUS;
        config.detector.min_marker_side = 0.0;
        config.detector.edge_tolerance = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_radius_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "detector": {{ "threshold_radius": 4294967295 }} }}"#).unwrap();
        assert!(matches!(
            OverlayConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_target_range_follows_family() {
        let mut config = OverlayConfig::default();
        config.detector.family = MarkerFamily::ArucoOriginal;
        config.target_marker_id = 1000;
        assert!(config.validate().is_ok());

        config.detector.family = MarkerFamily::Dict6x6_250;
        config.target_marker_id = 250;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_six_by_six_rejected_without_opencv() {
        let json = r#"{ "detector": { "family": "dict_6x6_250" } }"#;
        let config: OverlayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.detector.family, MarkerFamily::Dict6x6_250);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "phase_step_degrees": 2.0, "preview_enabled": false }}"#).unwrap();

        let config = OverlayConfig::load(file.path()).unwrap();
        assert_eq!(config.phase_step_degrees, 2.0);
        assert!(!config.preview_enabled);
    }

    #[test]
    fn test_load_errors() {
        let missing = OverlayConfig::load(Path::new("/nonexistent/overlay.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            OverlayConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_marker_id": 5000 }}"#).unwrap();
        assert!(matches!(
            OverlayConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
