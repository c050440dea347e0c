// src/fetch/mod.rs
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

/// GET `url` and return the response body as text.
///
/// One shot, no retries: a transport failure or non-success status is
/// terminal for this invocation and surfaces to the caller, who records it
/// and decides what degrades.
#[instrument(level = "debug", skip(client), fields(url = %url))]
pub async fn get_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching text");
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?
        .error_for_status()
        .with_context(|| format!("non-success status from {url}"))?
        .text()
        .await
        .with_context(|| format!("reading text from {url}"))
}

/// GET `url` and decode the response body as JSON. Same one-shot policy as
/// [`get_text`].
#[instrument(level = "debug", skip(client), fields(url = %url))]
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &Url) -> Result<T> {
    debug!(%url, "fetching json");
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?
        .error_for_status()
        .with_context(|| format!("non-success status from {url}"))?
        .json()
        .await
        .with_context(|| format!("decoding json from {url}"))
}
