//! One comparison run: domains, text, screenshots, visual diff, verdict.

use crate::domain::{extract_domain, normalize_url};
use crate::matcher;
use crate::render::Renderer;
use crate::report::ComparisonReport;
use crate::text::TextFetcher;
use crate::verdict::{evaluate_url, phishing_likely, SimilarityScores};
use crate::visual::VisualComparator;
use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_THRESHOLD: f64 = 0.7;

const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Wall-clock identifier shared by a run's screenshot directory and result file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    pub fn at(time: DateTime<Local>) -> Self {
        Self(time.format(RUN_ID_FORMAT).to_string())
    }

    /// Use a caller-chosen identifier, e.g. a fixed one in tests
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a run's images live: `<screenshots_dir>/<run>/{real,suspect,diff}.png`
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub real: PathBuf,
    pub suspect: PathBuf,
    pub diff: PathBuf,
}

impl ArtifactPaths {
    pub fn new(screenshots_dir: &Path, run: &RunId) -> Self {
        let dir = screenshots_dir.join(run.as_str());
        Self {
            real: dir.join("real.png"),
            suspect: dir.join("suspect.png"),
            diff: dir.join("diff.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,
    pub captured: bool,
}

impl ScreenshotArtifact {
    /// Path to report, or None when nothing was captured
    pub fn reported_path(&self) -> Option<PathBuf> {
        self.captured.then(|| self.path.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub real_url: String,
    pub suspect_url: String,
    pub threshold: f64,
}

impl ComparisonRequest {
    pub fn new(real_url: impl Into<String>, suspect_url: impl Into<String>) -> Self {
        Self {
            real_url: real_url.into(),
            suspect_url: suspect_url.into(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Runs a comparison with injected fetcher, renderer and comparator
pub struct Checker<F, R, V> {
    fetcher: F,
    renderer: R,
    comparator: V,
    lookalike_threshold: f64,
    screenshots_dir: PathBuf,
    progress: ProgressBar,
}

impl<F, R, V> Checker<F, R, V>
where
    F: TextFetcher,
    R: Renderer,
    V: VisualComparator,
{
    pub fn new(fetcher: F, renderer: R, comparator: V) -> Self {
        Self {
            fetcher,
            renderer,
            comparator,
            lookalike_threshold: DEFAULT_THRESHOLD,
            screenshots_dir: PathBuf::from("screenshots"),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn lookalike_threshold(mut self, threshold: f64) -> Self {
        self.lookalike_threshold = threshold;
        self
    }

    pub fn screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    /// Stage messages go to this bar; hidden unless set
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run every stage once. Stage failures lower the affected score to 0.0
    /// and are listed under `degraded`; this never fails as a whole.
    pub async fn run(&self, request: &ComparisonRequest, run: &RunId) -> ComparisonReport {
        let mut degraded = Vec::new();

        let real_url = normalize_url(&request.real_url);
        let suspect_url = normalize_url(&request.suspect_url);

        self.progress.set_message("Comparing domains...");
        let real_domain = extract_domain(&real_url);
        let suspect_domain = extract_domain(&suspect_url);
        if real_domain.is_empty() {
            degraded.push(format!("no domain could be extracted from {}", real_url));
        }
        if suspect_domain.is_empty() {
            degraded.push(format!("no domain could be extracted from {}", suspect_url));
        }
        let domain_similarity = matcher::ratio(&real_domain, &suspect_domain);
        info!(%real_domain, %suspect_domain, domain_similarity, "compared domains");

        let findings = evaluate_url(
            &real_domain,
            &suspect_domain,
            &suspect_url,
            domain_similarity,
            self.lookalike_threshold,
        );

        self.progress.set_message("Fetching page text...");
        let text_similarity = self.text_similarity(&real_url, &suspect_url, &mut degraded).await;

        let paths = ArtifactPaths::new(&self.screenshots_dir, run);
        self.progress.set_message("Capturing real site...");
        let real_shot = self.screenshot("real", &real_url, &paths.real, &mut degraded).await;
        self.progress.set_message("Capturing suspect site...");
        let suspect_shot = self.screenshot("suspect", &suspect_url, &paths.suspect, &mut degraded).await;

        self.progress.set_message("Comparing screenshots...");
        let (visual_similarity, diff_image) = if real_shot.captured && suspect_shot.captured {
            match self.comparator.compare(&real_shot.path, &suspect_shot.path, &paths.diff) {
                Ok(comparison) => {
                    info!(score = comparison.score, regions = comparison.regions.len(), "compared screenshots");
                    if comparison.diff.is_none() {
                        degraded.push("diff image could not be written".to_string());
                    }
                    (comparison.score, comparison.diff)
                }
                Err(e) => {
                    warn!(error = %e, "visual comparison failed");
                    degraded.push(format!("visual comparison failed: {}", e));
                    (0.0, None)
                }
            }
        } else {
            (0.0, None)
        };

        let scores = SimilarityScores::new(domain_similarity, text_similarity, visual_similarity);
        let verdict = phishing_likely(&findings, &scores, request.threshold);
        info!(phishing_likely = verdict, findings = findings.len(), "comparison finished");

        ComparisonReport {
            real_domain,
            suspect_domain,
            domain_similarity: scores.domain_similarity,
            url_findings: findings,
            text_similarity: scores.text_similarity,
            visual_similarity: scores.visual_similarity,
            real_screenshot: real_shot.reported_path(),
            suspect_screenshot: suspect_shot.reported_path(),
            diff_image,
            phishing_likely: verdict,
            degraded,
        }
    }

    async fn text_similarity(&self, real_url: &str, suspect_url: &str, degraded: &mut Vec<String>) -> f64 {
        let real = self.fetcher.fetch_text(real_url).await;
        let suspect = self.fetcher.fetch_text(suspect_url).await;

        match (real, suspect) {
            (Ok(real), Ok(suspect)) => {
                if real.is_empty() && suspect.is_empty() {
                    degraded.push("both pages have no visible text".to_string());
                    return 0.0;
                }
                let score = matcher::ratio(&real, &suspect);
                info!(score, "compared page text");
                score
            }
            (real, suspect) => {
                for e in [real.err(), suspect.err()].into_iter().flatten() {
                    warn!(error = %e, "text fetch failed");
                    degraded.push(format!("text fetch failed: {}", e));
                }
                0.0
            }
        }
    }

    async fn screenshot(&self, side: &str, url: &str, path: &Path, degraded: &mut Vec<String>) -> ScreenshotArtifact {
        let captured = match self.renderer.render(url, path).await {
            Ok(()) => {
                info!(side, path = %path.display(), "screenshot captured");
                true
            }
            Err(e) => {
                warn!(side, url, error = %e, "screenshot failed");
                degraded.push(format!("{} screenshot failed: {}", side, e));
                false
            }
        };
        ScreenshotArtifact {
            path: path.to_path_buf(),
            captured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_id_format() {
        let time = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(RunId::at(time).to_string(), "2026-03-07_09-05-01");
    }

    #[test]
    fn test_artifact_paths_are_keyed_by_run() {
        let paths = ArtifactPaths::new(Path::new("shots"), &RunId::new("2026-03-07_09-05-01"));
        assert_eq!(paths.real, Path::new("shots/2026-03-07_09-05-01/real.png"));
        assert_eq!(paths.suspect, Path::new("shots/2026-03-07_09-05-01/suspect.png"));
        assert_eq!(paths.diff, Path::new("shots/2026-03-07_09-05-01/diff.png"));
    }

    #[test]
    fn test_uncaptured_screenshot_has_no_path() {
        let shot = ScreenshotArtifact {
            path: PathBuf::from("shots/real.png"),
            captured: false,
        };
        assert_eq!(shot.reported_path(), None);
    }

    #[test]
    fn test_request_defaults() {
        let request = ComparisonRequest::new("paypal.com", "paypa1.com");
        assert_eq!(request.threshold, 0.7);
        assert_eq!(request.with_threshold(0.9).threshold, 0.9);
    }
}
