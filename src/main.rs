use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use phishcmp::{ChromeRenderer, Checker, ComparisonRequest, Config, HttpTextFetcher, RunId, SsimComparator};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phishcmp", version)]
#[command(about = "Compare a trusted site with a suspected phishing look-alike")]
struct Cli {
    /// URL of the legitimate site
    real_url: String,

    /// URL of the suspected look-alike
    suspect_url: String,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Similarity above which a mismatched domain is flagged as phishing
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum characters of page text to compare
    #[arg(long)]
    text_limit: Option<usize>,

    /// Seconds allowed per screenshot
    #[arg(long, value_name = "SECS")]
    render_timeout: Option<u64>,

    /// Chrome/Chromium executable
    #[arg(long, value_name = "PATH")]
    browser: Option<PathBuf>,

    /// Run the browser without its sandbox (containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Capture the full scrollable page
    #[arg(long)]
    full_page: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(threshold) = self.threshold {
            config.scoring.threshold = threshold;
        }
        if let Some(limit) = self.text_limit {
            config.fetch.text_limit = limit;
        }
        if let Some(secs) = self.render_timeout {
            config.render.timeout_secs = secs;
        }
        if let Some(browser) = &self.browser {
            config.render.browser_path = Some(browser.clone());
        }
        config.render.no_sandbox |= self.no_sandbox;
        config.render.full_page |= self.full_page;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
        .add_directive("chromiumoxide::conn=warn".parse().unwrap_or_else(|_| Level::WARN.into()))
        .add_directive("chromiumoxide::handler=warn".parse().unwrap_or_else(|_| Level::WARN.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn save_result(dir: &Path, run: &RunId, json: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("result_{}.json", run));
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);
    let config = cli.load_config()?;

    let run = RunId::now();
    let request = ComparisonRequest::new(&cli.real_url, &cli.suspect_url).with_threshold(config.scoring.threshold);
    info!(run = %run, real = %request.real_url, suspect = %request.suspect_url, "starting comparison");

    let fetcher = HttpTextFetcher::new(&config.fetch).context("building HTTP client")?;
    let progress = spinner();
    let checker = Checker::new(
        fetcher,
        ChromeRenderer::new(config.render.clone()),
        SsimComparator::new(&config.visual),
    )
    .lookalike_threshold(config.scoring.lookalike_threshold)
    .screenshots_dir(&config.output.screenshots_dir)
    .progress(progress.clone());

    let report = checker.run(&request, &run).await;
    progress.finish_and_clear();

    let json = report.to_pretty_json().context("serializing report")?;
    println!("{}", json);

    match save_result(&config.output.results_dir, &run, &json) {
        Ok(path) => eprintln!("JSON result saved as {}", path.display()),
        Err(e) => warn!(error = %format!("{:#}", e), "result file not saved"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_result_names_file_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunId::new("2026-10-19_08-15-42");
        let json = "{\n    \"phishing_likely\": false\n}";

        let path = save_result(dir.path(), &run, json).unwrap();

        assert_eq!(path, dir.path().join("result_2026-10-19_08-15-42.json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), json);
    }

    #[test]
    fn test_save_result_creates_missing_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results").join("nested");

        let path = save_result(&results, &RunId::new("run"), "{}").unwrap();
        assert!(path.starts_with(&results));
        assert!(path.is_file());
    }

    #[test]
    fn test_save_result_reports_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        assert!(save_result(&blocker, &RunId::new("run"), "{}").is_err());
    }
}
