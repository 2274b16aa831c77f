use serde::Deserialize;
use std::path::Path;
use std::{fs, io};
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    Stdio,
    File,
    WebSocket,
    Null,
}

// --- Configuration Sections ---

/// Initial size of the ball panel. The host may resize it at runtime.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SurfaceSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self { width: 320, height: 440 }
    }
}

/// Where new balls appear and how fast they start (pixels per tick).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnSettings {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub speed_min: f32,
    pub speed_max: f32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            x_min: 40.0,
            x_max: 200.0,
            y_min: 40.0,
            y_max: 160.0,
            speed_min: 1.0,
            speed_max: 4.0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_ms: u64,
    pub radius: f32,
    pub min_extent: f32,
    pub parallel_threshold: usize,
    pub seed: Option<u64>,
    pub spawn: SpawnSettings,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            radius: 14.0,
            min_extent: 200.0,
            parallel_threshold: 512,
            seed: None,
            spawn: SpawnSettings::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Upper bound on frames rendered per second, however often the
    /// scheduler asks for a redraw.
    pub max_fps: u32,
    /// Log render statistics every N frames (`None` disables).
    pub log_frequency: Option<u32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { max_fps: 30, log_frequency: Some(300) }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SenderConfig {
    #[serde(rename = "type", default)]
    pub sender_type: SenderType,
    pub options: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct TransportConfig {
    pub serializer: SerializerType,
    pub sender: SenderConfig,
    /// Send only every Nth rendered frame.
    pub update_frequency: Option<u32>,
}

/// Roster seeding and the optional churn that keeps reconciliation busy.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RecordSettings {
    pub seed_count: u32,
    pub churn_interval_ms: Option<u64>,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self { seed_count: 5, churn_interval_ms: Some(1500) }
    }
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceSettings,
    pub simulation: SimulationSettings,
    pub render: RenderSettings,
    pub transport: TransportConfig,
    pub records: RecordSettings,
}

// --- Sender Options ---
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WebSocketOptions {
    #[serde(default = "default_ws_host")]
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

fn default_ws_host() -> String { "127.0.0.1".to_string() }
fn default_ws_port() -> u16 { 8080 }

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self {
            host: default_ws_host(),
            port: default_ws_port(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FileOptions {
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

fn default_output_path() -> String { "frames.jsonl".to_string() }

impl Default for FileOptions {
    fn default() -> Self {
        Self { output_path: default_output_path() }
    }
}

// Helper methods for extracting options
impl SenderConfig {
    pub fn get_websocket_options(&self) -> WebSocketOptions {
        self.parse_options().unwrap_or_default()
    }

    pub fn get_file_options(&self) -> FileOptions {
        self.parse_options().unwrap_or_default()
    }

    fn parse_options<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        self.options
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

// --- Loading Functions ---

/// Reads a config file. `.toml` files are parsed as TOML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let sim = &config.simulation;
    if sim.tick_ms == 0 {
        return Err(ConfigError::Validation("Tick period cannot be zero.".to_string()));
    }
    if !(sim.radius > 0.0) {
        return Err(ConfigError::Validation("Ball radius must be positive.".to_string()));
    }
    if sim.radius * 2.0 >= sim.min_extent {
        return Err(ConfigError::Validation(format!(
            "Minimum extent {} must exceed the ball diameter {}.",
            sim.min_extent,
            sim.radius * 2.0
        )));
    }

    let spawn = &sim.spawn;
    if !(spawn.x_min < spawn.x_max) || !(spawn.y_min < spawn.y_max) {
        return Err(ConfigError::Validation("Spawn region must not be empty.".to_string()));
    }
    if !(spawn.speed_min > 0.0 && spawn.speed_min < spawn.speed_max) {
        return Err(ConfigError::Validation(
            "Spawn speed range must be positive and non-empty.".to_string(),
        ));
    }

    if config.render.max_fps == 0 {
        return Err(ConfigError::Validation("Render rate cannot be zero.".to_string()));
    }
    if config.transport.update_frequency == Some(0) {
        return Err(ConfigError::Validation("Update frequency cannot be zero.".to_string()));
    }
    if config.records.churn_interval_ms == Some(0) {
        return Err(ConfigError::Validation("Churn interval cannot be zero.".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_valid_json_config() {
        let content = r#"{
          "surface": { "width": 640, "height": 480 },
          "simulation": { "tick_ms": 10, "radius": 12.0, "seed": 7 },
          "transport": {
            "serializer": "binary",
            "sender": { "type": "file", "options": { "output_path": "out.bin" } }
          }
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.surface.width, 640);
        assert_eq!(config.simulation.tick_ms, 10);
        assert_eq!(config.simulation.radius, 12.0);
        assert_eq!(config.simulation.seed, Some(7));
        // Untouched fields keep their defaults.
        assert_eq!(config.simulation.min_extent, 200.0);
        assert_eq!(config.simulation.spawn, SpawnSettings::default());
        assert_eq!(config.transport.serializer, SerializerType::Binary);
        assert_eq!(config.transport.sender.sender_type, SenderType::File);
        assert_eq!(config.transport.sender.get_file_options().output_path, "out.bin");
    }

    #[test]
    fn load_toml_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("rollcall.toml");
        file.write_str(
            r#"
            [records]
            seed_count = 12

            [transport.sender]
            type = "websocket"
            options = { port = 9001 }
            "#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.records.seed_count, 12);
        let ws = config.transport.sender.get_websocket_options();
        assert_eq!(ws.port, 9001);
        assert_eq!(ws.host, "127.0.0.1");
    }

    #[test]
    fn empty_object_gives_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        assert_eq!(load_config(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn load_invalid_tick() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "simulation": {{ "tick_ms": 0 }} }}"#).unwrap();
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn radius_must_fit_minimum_extent() {
        let mut config = Config::default();
        config.simulation.radius = 100.0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_spawn_region_is_rejected() {
        let mut config = Config::default();
        config.simulation.spawn.x_max = config.simulation.spawn.x_min;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Json(_))));
    }
}
