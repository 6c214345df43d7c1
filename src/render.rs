//! Headless-browser screenshots through the Chrome DevTools Protocol.

use crate::config::RenderConfig;
use crate::error::RenderError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long a browser gets to exit on its own before it is killed
const CLOSE_GRACE: Duration = Duration::from_secs(5);

static PROFILE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Produces a raster screenshot of a URL at a given path
pub trait Renderer {
    fn render(&self, url: &str, output: &Path) -> impl Future<Output = Result<(), RenderError>>;
}

/// Launches a fresh headless Chrome per screenshot and always tears it down
pub struct ChromeRenderer {
    config: RenderConfig,
}

impl ChromeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .user_data_dir(profile)
            .args(vec![
                "--disable-dev-shm-usage",
                "--hide-scrollbars",
                "--no-first-run",
                "--disable-extensions",
                "--mute-audio",
            ]);

        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.config.browser_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(RenderError::Config)
    }

    async fn capture(&self, browser: &Browser, url: &str, output: &Path) -> Result<(), RenderError> {
        let navigation = |reason: String| RenderError::Navigation {
            url: url.to_string(),
            reason,
        };

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| navigation(e.to_string()))?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            self.config.viewport_width as i64,
            self.config.viewport_height as i64,
            1.0,   // device_scale_factor
            false, // mobile
        ))
        .await
        .map_err(|e| RenderError::Capture(e.to_string()))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| navigation(e.to_string()))?;

        let params = ScreenshotParams::builder()
            .full_page(self.config.full_page)
            .build();
        page.save_screenshot(params, output)
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))?;

        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close page");
        }
        Ok(())
    }
}

impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str, output: &Path) -> Result<(), RenderError> {
        self.render_in(url, output, &profile_dir()).await
    }
}

impl ChromeRenderer {
    /// Render using `profile` as the browser profile, removing it afterwards
    async fn render_in(&self, url: &str, output: &Path, profile: &Path) -> Result<(), RenderError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = self.render_with_profile(url, output, profile).await;

        // The browser may have populated the profile even when launch failed
        if let Err(e) = tokio::fs::remove_dir_all(profile).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(profile = %profile.display(), error = %e, "failed to remove browser profile");
            }
        }

        match &result {
            Ok(()) => debug!(url, output = %output.display(), "screenshot saved"),
            Err(e) => debug!(url, error = %e, "screenshot failed"),
        }
        result
    }

    async fn render_with_profile(&self, url: &str, output: &Path, profile: &Path) -> Result<(), RenderError> {
        let config = self.browser_config(profile)?;

        info!(url, "launching headless browser");
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let events = tokio::spawn(async move {
            while handler.next().await.is_some() {
                // chromiumoxide dispatches CDP events internally
            }
        });

        let limit = self.config.timeout_secs;
        let result = match timeout(Duration::from_secs(limit), self.capture(&browser, url, output)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(limit)),
        };

        shutdown(&mut browser).await;
        events.abort();
        result
    }
}

/// Close the browser, killing it if it does not go quietly
async fn shutdown(browser: &mut Browser) {
    let closed = matches!(timeout(CLOSE_GRACE, browser.close()).await, Ok(Ok(_)));
    if !closed {
        debug!("browser did not close cleanly, killing it");
        if let Some(Err(e)) = browser.kill().await {
            warn!(error = %e, "failed to kill browser process");
        }
    }

    match timeout(CLOSE_GRACE, browser.wait()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to reap browser process"),
        Err(_) => warn!("browser process still running after shutdown"),
    }
}

/// Private profile per launch so concurrent runs never share a browser
fn profile_dir() -> PathBuf {
    let seq = PROFILE_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("phishcmp-profile-{}-{}", std::process::id(), seq))
}
