//! Pick the top search results with pairwise-distinct domain keys.

use std::collections::HashSet;

use tracing::trace;

use askweb_shared::{SearchResult, Selection};

use crate::domain::extract_domain;
use crate::parser::redirect_target;

/// Select up to `count` links whose domain keys are pairwise distinct.
///
/// Links are considered in encounter order. Only provider redirect links that are
/// not cache-proxy links qualify; the embedded target URL is what gets returned.
/// Running out of input is not an error: fewer results come back.
pub fn select_top<I, S>(links: I, count: usize) -> Selection
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut selection = Selection::default();
    if count == 0 {
        return selection;
    }

    let mut seen: HashSet<String> = HashSet::new();

    for link in links {
        let href = link.as_ref();

        let Some(target) = redirect_target(href) else {
            continue;
        };

        let Some(domain_key) = extract_domain(target) else {
            trace!(url = target, "no domain key, skipping");
            continue;
        };

        if !seen.insert(domain_key.clone()) {
            trace!(%domain_key, "duplicate domain, skipping");
            continue;
        }

        selection.push(SearchResult {
            url: target.to_string(),
            domain_key,
        });

        if selection.len() == count {
            break;
        }
    }

    selection
}
