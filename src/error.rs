//! Error types for each pipeline stage.
//!
//! None of these escape `Checker::run`; they are converted into degraded
//! scores and listed in the report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while retrieving a page's text
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure while producing a screenshot
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid browser configuration: {0}")]
    Config(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to capture screenshot: {0}")]
    Capture(String),

    #[error("render timed out after {0} seconds")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure inside the image comparison step
#[derive(Error, Debug)]
pub enum VisualError {
    #[error("failed to load image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image has no pixels to compare ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("structural similarity failed: {0}")]
    Ssim(String),

    #[error("failed to write diff image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Failure while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
