//! HTTP plumbing shared by the backends.
//!
//! API keys travel as a `key` query parameter, so request URLs never appear
//! in errors or logs; `endpoint` (without the query) is used instead.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use askweb_shared::{AskWebError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on how much of an error body ends up in the error message.
const MAX_ERROR_BODY: usize = 300;

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("askweb/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AskWebError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send `request` and decode a JSON body, mapping failures to [`AskWebError`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AskWebError::Network(format!("{endpoint}: {}", e.without_url())))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(AskWebError::Model(format!(
            "{endpoint}: HTTP {status}: {}",
            body.trim()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AskWebError::parse(format!("{endpoint}: unexpected response: {}", e.without_url())))
}
