//! Heuristic domain keys used for source diversity.
//!
//! The key is the first dot-delimited label after an optional scheme and `www.`
//! prefix. This is deliberately coarse: `blog.example.com` keys to `blog`, and no
//! public-suffix resolution is attempted.

use std::sync::LazyLock;

use regex::Regex;

/// Optional scheme, optional `www.`, lazy first label, a literal dot, at least one more char.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://)?(www\.)?(.+?)\.(.+?)").expect("domain regex")
});

/// Derive the deduplication key for a URL, or `None` if it does not look like one.
pub fn extract_domain(url: &str) -> Option<String> {
    DOMAIN_RE
        .captures(url)
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_and_www_variants_share_a_key() {
        let variants = [
            "https://www.example.com/docs/intro",
            "http://www.example.com",
            "https://example.com/?q=1",
            "http://example.com",
            "www.example.com",
            "example.com",
        ];
        for v in variants {
            assert_eq!(extract_domain(v).as_deref(), Some("example"), "{v}");
        }
    }

    #[test]
    fn no_dot_means_no_key() {
        assert_eq!(extract_domain("localhost"), None);
        assert_eq!(extract_domain("https://intranet/page"), None);
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn subdomain_label_is_the_key() {
        assert_eq!(
            extract_domain("https://en.wikipedia.org/wiki/Photosynthesis").as_deref(),
            Some("en")
        );
        assert_eq!(
            extract_domain("https://blog.example.com/post").as_deref(),
            Some("blog")
        );
    }

    #[test]
    fn trailing_dot_alone_is_not_enough() {
        // Needs at least one character after the dot.
        assert_eq!(extract_domain("https://example."), None);
    }
}
