//! Side-by-side comparison of a trusted site and a suspected phishing copy.
//!
//! A run scores domain, page-text and screenshot similarity, lists URL
//! red flags, and concludes whether the suspect is likely a look-alike.

pub mod config;
pub mod domain;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod text;
pub mod verdict;
pub mod visual;

pub use config::Config;
pub use pipeline::{ArtifactPaths, Checker, ComparisonRequest, RunId};
pub use render::{ChromeRenderer, Renderer};
pub use report::ComparisonReport;
pub use text::{HttpTextFetcher, TextFetcher};
pub use verdict::{SimilarityScores, UrlFinding};
pub use visual::{SsimComparator, VisualComparator};
