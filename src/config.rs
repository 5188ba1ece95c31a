use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration, loaded from a TOML file.
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub still: StillConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub brightness: BrightnessConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub denoise: DenoiseConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StillConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub histograms: bool,
    #[serde(default)]
    pub extra_outputs: bool,
    /// Fixed RNG seed; a fresh one is drawn per run when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    #[serde(default = "default_watermark_text")]
    pub text: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "default_watermark_scale")]
    pub scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrightnessConfig {
    /// Fixed coefficient. When unset, one is drawn from `[min, max]`.
    #[serde(default)]
    pub coefficient: Option<f32>,
    #[serde(default = "default_coefficient_min")]
    pub min: f32,
    #[serde(default = "default_coefficient_max")]
    pub max: f32,
    #[serde(default = "default_dark_threshold")]
    pub dark_threshold: f32,
    #[serde(default = "default_gamma")]
    pub gamma: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoiseConfig {
    #[serde(default = "default_noise_amount")]
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenoiseConfig {
    #[serde(default = "default_filter_radius")]
    pub mean_radius: u32,
    #[serde(default = "default_filter_radius")]
    pub median_radius: u32,
    #[serde(default = "default_bilateral_diameter")]
    pub bilateral_diameter: u32,
    #[serde(default = "default_bilateral_sigma")]
    pub sigma_color: f32,
    #[serde(default = "default_bilateral_sigma")]
    pub sigma_space: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// MJPEG stream URL or a directory of frames.
    #[serde(default = "default_live_source")]
    pub source: String,
    #[serde(default = "default_quantization_levels")]
    pub quantization_levels: u32,
    #[serde(default)]
    pub equalizer: Equalizer,
    #[serde(default)]
    pub font: Option<PathBuf>,
    /// Keep every Nth displayed frame when running headless.
    #[serde(default = "default_dump_every")]
    pub dump_every: u32,
}

/// Equalization used by the histogram-equalization live mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equalizer {
    #[default]
    Global,
    Clahe,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for StillConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
            histograms: true,
            extra_outputs: false,
            seed: None,
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: default_watermark_text(),
            font: None,
            scale: default_watermark_scale(),
        }
    }
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            coefficient: None,
            min: default_coefficient_min(),
            max: default_coefficient_max(),
            dark_threshold: default_dark_threshold(),
            gamma: default_gamma(),
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            amount: default_noise_amount(),
        }
    }
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            mean_radius: default_filter_radius(),
            median_radius: default_filter_radius(),
            bilateral_diameter: default_bilateral_diameter(),
            sigma_color: default_bilateral_sigma(),
            sigma_space: default_bilateral_sigma(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            source: default_live_source(),
            quantization_levels: default_quantization_levels(),
            equalizer: Equalizer::default(),
            font: None,
            dump_every: default_dump_every(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.brightness;
        if !(b.min > 0.0 && b.min <= b.max) {
            return Err(ConfigError::Invalid(format!(
                "brightness range [{}, {}] is empty or not positive",
                b.min, b.max
            )));
        }
        if !(0.0..=1.0).contains(&self.noise.amount) {
            return Err(ConfigError::Invalid(format!(
                "noise amount {} outside [0, 1]",
                self.noise.amount
            )));
        }
        if !(1..=256).contains(&self.live.quantization_levels) {
            return Err(ConfigError::Invalid(format!(
                "quantization levels {} outside [1, 256]",
                self.live.quantization_levels
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_input() -> PathBuf {
    PathBuf::from("input.jpg")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_watermark_text() -> String {
    "framelab".into()
}
fn default_watermark_scale() -> f32 {
    32.0
}
fn default_coefficient_min() -> f32 {
    0.4
}
fn default_coefficient_max() -> f32 {
    2.0
}
fn default_dark_threshold() -> f32 {
    120.0
}
fn default_gamma() -> f32 {
    1.5
}
fn default_noise_amount() -> f64 {
    0.02
}
fn default_filter_radius() -> u32 {
    1
}
fn default_bilateral_diameter() -> u32 {
    9
}
fn default_bilateral_sigma() -> f32 {
    75.0
}
fn default_live_source() -> String {
    "http://127.0.0.1:8080/stream".into()
}
fn default_quantization_levels() -> u32 {
    8
}
fn default_dump_every() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".into()
}
