//! Page text retrieval and visible-text extraction.

use crate::config::FetchConfig;
use crate::error::FetchError;
use scraper::Html;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Source of a page's visible text
pub trait TextFetcher {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Fetches pages over HTTP(S) with a browser-like user agent
pub struct HttpTextFetcher {
    client: reqwest::Client,
    limit: usize,
}

impl HttpTextFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            limit: config.text_limit,
        })
    }
}

impl TextFetcher for HttpTextFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        // Error pages are compared like any other page
        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "non-success status, using body anyway");
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        let text = visible_text(&body, self.limit);
        debug!(url, chars = text.chars().count(), "extracted visible text");
        Ok(text)
    }
}

/// Visible text of an HTML document: every non-blank text node outside
/// script/style/noscript, trimmed, joined by single spaces, and cut to
/// `limit` characters.
pub fn visible_text(html: &str, limit: usize) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ").chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Log in to your account</title>
    <style>body { color: red; }</style>
    <script>var tracking = "do not include";</script>
  </head>
  <body>
    <h1>  Welcome back </h1>
    <noscript>Please enable JavaScript</noscript>
    <form>
      <label>Email</label> <input name="email">
      <p>Forgot <a href="/reset">password</a>?</p>
    </form>
    <!-- hidden comment -->
  </body>
</html>"#;

    #[test]
    fn test_visible_text_skips_hidden_elements() {
        let text = visible_text(LOGIN_PAGE, 50_000);
        assert_eq!(text, "Log in to your account Welcome back Email Forgot password ?");
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
        assert!(!text.contains("JavaScript"));
        assert!(!text.contains("hidden comment"));
    }

    #[test]
    fn test_visible_text_truncates_by_characters() {
        let text = visible_text("<p>héllo wörld</p>", 7);
        assert_eq!(text, "héllo w");
    }

    #[test]
    fn test_visible_text_of_empty_document() {
        assert_eq!(visible_text("", 100), "");
        assert_eq!(visible_text("<script>only()</script>", 100), "");
    }

    #[test]
    fn test_fetcher_builds_from_default_config() {
        assert!(HttpTextFetcher::new(&FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_request_error() {
        let config = FetchConfig {
            timeout_secs: 2,
            ..FetchConfig::default()
        };
        let fetcher = HttpTextFetcher::new(&config).unwrap();
        let result = fetcher.fetch_text("http://127.0.0.1:9/").await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }
}
