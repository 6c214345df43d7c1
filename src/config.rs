//! Configuration for a comparison run

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Verdict thresholds
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Page text retrieval
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Headless browser rendering
    #[serde(default)]
    pub render: RenderConfig,

    /// Screenshot diffing
    #[serde(default)]
    pub visual: VisualConfig,

    /// Where artifacts are written
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Text or visual similarity above this flags a mismatched domain as phishing
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Domain similarity above this counts as a lookalike domain
    #[serde(default = "default_threshold")]
    pub lookalike_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of characters of visible text kept per page
    #[serde(default = "default_text_limit")]
    pub text_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Upper bound for navigation plus capture, in seconds
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,

    /// Chrome/Chromium executable; auto-detected when unset
    #[serde(default)]
    pub browser_path: Option<PathBuf>,

    /// Pass --no-sandbox to the browser (needed in most containers)
    #[serde(default)]
    pub no_sandbox: bool,

    /// Capture the whole scrollable page instead of the viewport
    #[serde(default)]
    pub full_page: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisualConfig {
    /// 8-bit similarity values at or below this are marked as differing
    #[serde(default = "default_mask_threshold")]
    pub mask_threshold: u8,

    /// Contours with a smaller area (px²) are not highlighted
    #[serde(default = "default_min_region_area")]
    pub min_region_area: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

// Default value functions
fn default_threshold() -> f64 { 0.7 }
fn default_fetch_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_text_limit() -> usize { 50_000 }
fn default_viewport_width() -> u32 { 1366 }
fn default_viewport_height() -> u32 { 768 }
fn default_render_timeout() -> u64 { 60 }
fn default_mask_threshold() -> u8 { 200 }
fn default_min_region_area() -> f64 { 100.0 }
fn default_screenshots_dir() -> PathBuf { PathBuf::from("screenshots") }
fn default_results_dir() -> PathBuf { PathBuf::from(".") }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            lookalike_threshold: default_threshold(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            text_limit: default_text_limit(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            timeout_secs: default_render_timeout(),
            browser_path: None,
            no_sandbox: false,
            full_page: false,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            mask_threshold: default_mask_threshold(),
            min_region_area: default_min_region_area(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshots_dir: default_screenshots_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("scoring.threshold", self.scoring.threshold)?;
        check_unit("scoring.lookalike_threshold", self.scoring.lookalike_threshold)?;
        check_nonzero("fetch.timeout_secs", self.fetch.timeout_secs)?;
        check_nonzero("fetch.text_limit", self.fetch.text_limit as u64)?;
        check_nonzero("render.timeout_secs", self.render.timeout_secs)?;
        check_nonzero("render.viewport_width", self.render.viewport_width as u64)?;
        check_nonzero("render.viewport_height", self.render.viewport_height as u64)?;
        if !self.visual.min_region_area.is_finite() || self.visual.min_region_area < 0.0 {
            return Err(ConfigError::Invalid {
                field: "visual.min_region_area",
                reason: format!("{} is not a non-negative area", self.visual.min_region_area),
            });
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

fn check_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}
