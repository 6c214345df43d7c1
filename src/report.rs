//! The JSON comparison report.

use crate::verdict::{UrlFinding, NO_MAJOR_ISSUES};
use serde::{Serialize, Serializer};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub real_domain: String,
    pub suspect_domain: String,
    pub domain_similarity: f64,
    #[serde(serialize_with = "findings_or_sentinel")]
    pub url_findings: Vec<UrlFinding>,
    pub text_similarity: f64,
    pub visual_similarity: f64,
    pub real_screenshot: Option<PathBuf>,
    pub suspect_screenshot: Option<PathBuf>,
    pub diff_image: Option<PathBuf>,
    pub phishing_likely: bool,
    /// Why any score was forced to zero or any artifact is missing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

impl ComparisonReport {
    /// Pretty JSON with four-space indentation
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn findings_or_sentinel<S: Serializer>(findings: &[UrlFinding], serializer: S) -> Result<S::Ok, S::Error> {
    if findings.is_empty() {
        [NO_MAJOR_ISSUES].serialize(serializer)
    } else {
        findings.serialize(serializer)
    }
}
