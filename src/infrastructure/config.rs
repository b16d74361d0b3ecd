use crate::application::plot_data_source::PlotOptions;
use crate::domain::parameter::{EngType, Parameter};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub yamcs: YamcsSettings,
    #[serde(default)]
    pub plot: PlotSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YamcsSettings {
    pub url: String,
    pub instance: String,
    #[serde(default = "default_processor")]
    pub processor: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlotSettings {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_range_divisor")]
    pub range_divisor: i64,
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    #[serde(default = "default_live_capacity")]
    pub live_capacity: usize,
    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: i64,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParameterConfig {
    pub name: String,
    #[serde(default = "default_eng_type")]
    pub eng_type: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_processor() -> String {
    "realtime".to_string()
}

fn default_sample_count() -> usize {
    6000
}

fn default_range_divisor() -> i64 {
    6000
}

fn default_sync_interval_ms() -> u64 {
    500
}

fn default_live_capacity() -> usize {
    10_000
}

fn default_window_minutes() -> i64 {
    60
}

fn default_eng_type() -> String {
    "float".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            range_divisor: default_range_divisor(),
            sync_interval_ms: default_sync_interval_ms(),
            live_capacity: default_live_capacity(),
            default_window_minutes: default_window_minutes(),
            parameters: Vec::new(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl PlotSettings {
    pub fn options(&self) -> PlotOptions {
        PlotOptions {
            sample_count: self.sample_count,
            range_divisor: self.range_divisor,
            live_capacity: self.live_capacity,
            default_window: chrono::Duration::minutes(self.default_window_minutes),
        }
    }

    pub fn initial_parameters(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|p| Parameter::new(p.name.clone(), EngType::from_type_name(&p.eng_type)))
            .collect()
    }
}

/// Load `config/plot.toml`, overridable through `PLOT__SECTION__KEY` environment variables
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/plot"))
        .add_source(config::Environment::with_prefix("PLOT").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
