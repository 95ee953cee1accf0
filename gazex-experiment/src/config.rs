use gazex_device::SyncConfig;
use gazex_mapping::MapperConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Immutable session settings. Every field has a default so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Placed clockwise from the top-left display corner.
    pub marker_ids: Vec<u32>,
    pub target_radius: f32,
    pub inter_trial_interval_ms: u64,
    pub marker_size: f32,
    pub marker_opacity: f32,
    pub show_gaze_cursor: bool,
    pub trial_count: usize,
    pub distractor_count: usize,
    pub discovery_timeout_ms: u64,
    pub stream_timeout_ms: Option<u64>,
    pub max_pair_skew_ms: Option<u64>,
    pub min_visible_markers: usize,
    pub min_detection_confidence: f32,
    pub min_marker_perimeter: f64,
    pub font_path: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            marker_ids: vec![0, 1, 2, 3],
            target_radius: 100.0,
            inter_trial_interval_ms: 1000,
            marker_size: 200.0,
            marker_opacity: 0.75,
            show_gaze_cursor: false,
            trial_count: 10,
            distractor_count: 10,
            discovery_timeout_ms: 10_000,
            stream_timeout_ms: Some(5_000),
            max_pair_skew_ms: Some(50),
            min_visible_markers: 3,
            min_detection_confidence: 0.0,
            min_marker_perimeter: 60.0,
            font_path: None,
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.marker_ids.len() != 4 {
            return invalid(format!(
                "expected 4 marker ids, got {}",
                self.marker_ids.len()
            ));
        }
        let mut ids = self.marker_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != 4 {
            return invalid("marker ids must be distinct".into());
        }
        if !(self.target_radius > 0.0) || !self.target_radius.is_finite() {
            return invalid(format!("target_radius must be positive, got {}", self.target_radius));
        }
        if !(self.marker_size > 0.0) || !self.marker_size.is_finite() {
            return invalid(format!("marker_size must be positive, got {}", self.marker_size));
        }
        if !(0.0..=1.0).contains(&self.marker_opacity) {
            return invalid(format!(
                "marker_opacity must lie in [0, 1], got {}",
                self.marker_opacity
            ));
        }
        if self.trial_count == 0 {
            return invalid("trial_count must be at least 1".into());
        }
        if self.min_visible_markers < 3 || self.min_visible_markers > 4 {
            return invalid(format!(
                "min_visible_markers must be 3 or 4, got {}",
                self.min_visible_markers
            ));
        }
        if self.discovery_timeout_ms == 0 {
            return invalid("discovery_timeout_ms must be positive".into());
        }
        if self.stream_timeout_ms == Some(0) {
            return invalid("stream_timeout_ms must be positive when set".into());
        }
        if !self.min_marker_perimeter.is_finite() || self.min_marker_perimeter < 0.0 {
            return invalid("min_marker_perimeter must be a non-negative number".into());
        }
        Ok(())
    }

    /// The ids in layout order. Only meaningful after [`validate`](Self::validate).
    pub fn marker_id_array(&self) -> [u32; 4] {
        let mut ids = [0, 1, 2, 3];
        for (slot, id) in ids.iter_mut().zip(&self.marker_ids) {
            *slot = *id;
        }
        ids
    }

    pub fn inter_trial_interval(&self) -> Duration {
        Duration::from_millis(self.inter_trial_interval_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn mapper_config(&self) -> MapperConfig {
        MapperConfig {
            min_visible_markers: self.min_visible_markers,
            min_detection_confidence: self.min_detection_confidence,
            min_marker_perimeter: self.min_marker_perimeter,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            stall_timeout: self.stream_timeout_ms.map(Duration::from_millis),
            max_pair_skew: self.max_pair_skew_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.marker_id_array(), [0, 1, 2, 3]);
        assert_eq!(config.sync_config().stall_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            target_radius = 60.0
            show_gaze_cursor = true
            stream_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.target_radius, 60.0);
        assert!(config.show_gaze_cursor);
        assert_eq!(config.stream_timeout_ms, Some(250));
        assert_eq!(config.trial_count, 10);
        assert_eq!(config.marker_size, 200.0);
    }

    #[test]
    fn rejects_duplicate_marker_ids() {
        let err = ExperimentConfig::from_toml_str("marker_ids = [0, 1, 1, 3]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_opacity_out_of_range() {
        let config = ExperimentConfig {
            marker_opacity: 1.5,
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_types() {
        let err = ExperimentConfig::from_toml_str("trial_count = \"ten\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExperimentConfig::load("/nonexistent/gazex.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
