use serde::Deserialize;
use std::fs;

/// Session configuration. Every field has a default so a partial JSON file
/// (or no file at all) is enough to run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TorchScript weights of the track-enabled detector.
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// "cpu" or "cuda".
    #[serde(default = "default_device")]
    pub device: String,
    /// Model input size [width, height].
    #[serde(default = "default_input_size")]
    pub input_size: [i64; 2],
    /// Detections below this confidence are discarded.
    #[serde(default = "default_conf_threshold")]
    pub conf_threshold: f32,
    /// Frames wider than this are scaled down before detection.
    #[serde(default = "default_working_width")]
    pub working_width: i32,
    /// Gate line position as a fraction of frame height.
    #[serde(default = "default_line_fraction")]
    pub line_fraction: f32,
    /// Vertical positions kept per track identity.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Identities unseen for this many frames are evicted from the history.
    #[serde(default = "default_history_max_age")]
    pub history_max_age: u64,
    /// Simulated sensor latitude for the heatmap export.
    #[serde(default = "default_sensor_lat")]
    pub sensor_lat: f64,
    /// Simulated sensor longitude for the heatmap export.
    #[serde(default = "default_sensor_lon")]
    pub sensor_lon: f64,
    /// Standard deviation of the simulated scatter, in degrees.
    #[serde(default = "default_sensor_spread")]
    pub sensor_spread: f64,
    /// Points added on top of the counted total so the map is never empty.
    #[serde(default = "default_ghost_points")]
    pub ghost_points: usize,
}

fn default_model_path() -> String {
    "weights/yolov8n.track.torchscript".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_input_size() -> [i64; 2] {
    [640, 640]
}

fn default_conf_threshold() -> f32 {
    0.45
}

fn default_working_width() -> i32 {
    640
}

fn default_line_fraction() -> f32 {
    0.55
}

fn default_history_window() -> usize {
    10
}

fn default_history_max_age() -> u64 {
    90
}

fn default_sensor_lat() -> f64 {
    9.9312
}

fn default_sensor_lon() -> f64 {
    76.2673
}

fn default_sensor_spread() -> f64 {
    0.0006
}

fn default_ghost_points() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_path: default_model_path(),
            device: default_device(),
            input_size: default_input_size(),
            conf_threshold: default_conf_threshold(),
            working_width: default_working_width(),
            line_fraction: default_line_fraction(),
            history_window: default_history_window(),
            history_max_age: default_history_max_age(),
            sensor_lat: default_sensor_lat(),
            sensor_lon: default_sensor_lon(),
            sensor_spread: default_sensor_spread(),
            ghost_points: default_ghost_points(),
        }
    }
}

impl Config {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&data)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"conf_threshold": 0.25}"#).unwrap();
        assert_eq!(cfg.conf_threshold, 0.25);
        assert_eq!(cfg.working_width, 640);
        assert_eq!(cfg.line_fraction, 0.55);
        assert_eq!(cfg.history_window, 10);
    }

    #[test]
    fn empty_json_matches_default() {
        let parsed: Config = serde_json::from_str("{}").unwrap();
        let built = Config::default();
        assert_eq!(parsed.model_path, built.model_path);
        assert_eq!(parsed.history_max_age, built.history_max_age);
        assert_eq!(parsed.ghost_points, built.ghost_points);
    }
}
