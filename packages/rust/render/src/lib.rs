//! Page-to-PDF rendering.
//!
//! [`PageRenderer`] is the seam the pipeline renders through; the production
//! implementation is [`PlaywrightRenderer`].

mod options;
mod playwright;

use std::time::Duration;

use askweb_shared::Result;

pub use options::PrintOptions;
pub use playwright::PlaywrightRenderer;

/// Renders a URL or local HTML file to PDF bytes.
///
/// `timeout` bounds the wait for the page to settle. Hitting it is the normal
/// path for pages that keep the network busy: the page is printed as-is.
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(
        &self,
        source: &str,
        timeout: Duration,
        options: &PrintOptions,
    ) -> Result<Vec<u8>>;
}
