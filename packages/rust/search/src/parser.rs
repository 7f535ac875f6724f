//! Search results page parsing.
//!
//! The provider wraps every organic result in a redirect link of the form
//! `/url?q=<target>&sa=U&...`. Cached copies go through a `webcache` proxy and
//! are never useful as sources.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::trace;

/// Substring marking a redirect link that embeds a target URL.
const REDIRECT_MARKER: &str = "url?q=";

/// Substring marking cache-proxy links.
const CACHE_MARKER: &str = "webcache";

/// Prefix and suffix wrapped around the embedded target.
const TARGET_PREFIX: &str = "?q=";
const TARGET_SUFFIX: &str = "&sa=U";

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector"));

/// Collect every anchor `href` in document order. Anchors without one are skipped.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    doc.select(&ANCHOR_SEL)
        .filter_map(|el| match el.value().attr("href") {
            Some(href) => Some(href.to_string()),
            None => {
                trace!("anchor without href, skipping");
                None
            }
        })
        .collect()
}

/// Extract the embedded target URL from a provider redirect link.
///
/// Returns `None` for links without the redirect marker and for cache-proxy links.
pub fn redirect_target(href: &str) -> Option<&str> {
    if !href.contains(REDIRECT_MARKER) || href.contains(CACHE_MARKER) {
        return None;
    }

    let (_, rest) = href.split_once(TARGET_PREFIX)?;
    rest.split(TARGET_SUFFIX).next()
}
