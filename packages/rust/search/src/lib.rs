//! Web search and source selection.
//!
//! Queries the search provider, pulls the raw result links out of the HTML
//! response, and keeps the top results with distinct domain keys so the
//! assembled context draws on several sites instead of one.

mod dedup;
mod domain;
mod parser;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use askweb_shared::{AskWebError, Result, SearchConfig, Selection};

pub use dedup::select_top;
pub use domain::extract_domain;
pub use parser::{anchor_hrefs, redirect_target};

/// Maximum number of redirects to follow for the search request.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("askweb/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// HTTP client for the search provider.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    results_per_url: usize,
}

impl SearchClient {
    /// Build a client from the `[search]` config section.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            AskWebError::config(format!("invalid search endpoint '{}': {e}", config.endpoint))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskWebError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            results_per_url: config.results_per_url.max(1),
        })
    }

    /// Search for `query` and keep up to `count` distinct-domain sources.
    ///
    /// Over-fetches `results_per_url × count` raw results so deduplication has
    /// enough candidates. A failed search yields an empty selection.
    #[instrument(skip_all, fields(query = %query, count = count))]
    pub async fn top_urls(&self, query: &str, count: usize) -> Selection {
        let requested = self.results_per_url.saturating_mul(count);
        let links = self.fetch_links(query, requested).await;

        let selection = select_top(&links, count);
        info!(
            links = links.len(),
            selected = selection.len(),
            "search results selected"
        );
        selection
    }

    /// Fetch the results page and return every anchor href on it.
    ///
    /// Transport and status errors are logged and turned into an empty list.
    pub async fn fetch_links(&self, query: &str, num: usize) -> Vec<String> {
        match self.fetch_page(query, num).await {
            Ok(body) => {
                let hrefs = anchor_hrefs(&body);
                debug!(hrefs = hrefs.len(), "parsed search results page");
                hrefs
            }
            Err(e) => {
                warn!(error = %e, "search request failed, continuing with no results");
                Vec::new()
            }
        }
    }

    async fn fetch_page(&self, query: &str, num: usize) -> Result<String> {
        let num = num.to_string();
        let url = Url::parse_with_params(
            self.endpoint.as_str(),
            &[("q", query), ("num", num.as_str())],
        )
        .map_err(|e| AskWebError::validation(format!("cannot build search URL: {e}")))?;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AskWebError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AskWebError::Network(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AskWebError::Network(format!("{}: failed to read body: {e}", self.endpoint)))
    }
}
