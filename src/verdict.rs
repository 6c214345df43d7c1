//! URL-level heuristics and the final phishing verdict.

use crate::domain::has_punycode_host;
use serde::{Serialize, Serializer};
use std::fmt;

/// Shown in place of an empty finding list
pub const NO_MAJOR_ISSUES: &str = "No major URL issues";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlFinding {
    DomainMismatch,
    LookalikeDomain,
    DeceptiveSubdomain,
    PunycodeDetected,
}

impl UrlFinding {
    pub fn label(&self) -> &'static str {
        match self {
            UrlFinding::DomainMismatch => "Domain mismatch",
            UrlFinding::LookalikeDomain => "Lookalike domain",
            UrlFinding::DeceptiveSubdomain => "Deceptive subdomain",
            UrlFinding::PunycodeDetected => "Punycode detected",
        }
    }
}

impl Serialize for UrlFinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for UrlFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three independent scores, clamped to [0, 1] and rounded to 3 places
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityScores {
    pub domain_similarity: f64,
    pub text_similarity: f64,
    pub visual_similarity: f64,
}

impl SimilarityScores {
    pub fn new(domain: f64, text: f64, visual: f64) -> Self {
        Self {
            domain_similarity: round3(domain),
            text_similarity: round3(text),
            visual_similarity: round3(visual),
        }
    }
}

pub fn round3(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// Run the URL heuristics in their fixed order.
///
/// `suspect_url` is the normalized suspect URL; the domains are registrable
/// domains as returned by `extract_domain`.
pub fn evaluate_url(
    real_domain: &str,
    suspect_domain: &str,
    suspect_url: &str,
    domain_similarity: f64,
    lookalike_threshold: f64,
) -> Vec<UrlFinding> {
    let mut findings = Vec::new();
    let mismatch = real_domain != suspect_domain;

    if mismatch {
        findings.push(UrlFinding::DomainMismatch);
    }
    if mismatch && domain_similarity > lookalike_threshold {
        findings.push(UrlFinding::LookalikeDomain);
    }
    // paypal.com.evil.net and friends
    if mismatch && !real_domain.is_empty() && suspect_url.contains(real_domain) {
        findings.push(UrlFinding::DeceptiveSubdomain);
    }
    if suspect_url.contains("xn--") || has_punycode_host(suspect_url) {
        findings.push(UrlFinding::PunycodeDetected);
    }

    findings
}

/// Phishing is likely when the domains differ but the content is a close copy
pub fn phishing_likely(findings: &[UrlFinding], scores: &SimilarityScores, threshold: f64) -> bool {
    findings.contains(&UrlFinding::DomainMismatch)
        && (scores.visual_similarity > threshold || scores.text_similarity > threshold)
}
