//! HTTP fetching shared by the URL-capable loaders.
//!
//! Every loader sends a `User-Agent` naming itself and a format-specific
//! `Accept` header unless the caller supplies its own headers.

use std::time::Duration;

use crate::rag::error::LoadError;
use crate::rag::loaders::LoadOptions;

/// Per-request timeout for loader fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A fetched response body plus the bits loaders report in metadata.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

/// Default `User-Agent` for a loader.
pub fn user_agent(loader_name: &str) -> String {
    format!("Mozilla/5.0 (compatible; crewai-tools {})", loader_name)
}

/// GET `url` and return the raw body.
///
/// Non-2xx statuses and transport failures become `LoadErrorKind::Network`.
pub async fn fetch(
    url: &str,
    options: &LoadOptions,
    loader_name: &str,
    accept: &str,
) -> Result<FetchedBody, LoadError> {
    let fail = |e: &dyn std::fmt::Display| {
        LoadError::network(url, format!("Error fetching content from URL {}: {}", url, e))
    };

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| fail(&e))?;

    let mut request = client.get(url);
    match &options.headers {
        Some(headers) => {
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }
        }
        None => {
            request = request
                .header(reqwest::header::ACCEPT, accept)
                .header(reqwest::header::USER_AGENT, user_agent(loader_name));
        }
    }

    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| fail(&e))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await.map_err(|e| fail(&e))?;

    log::debug!("{} fetched {} ({} bytes)", loader_name, url, bytes.len());
    Ok(FetchedBody {
        status,
        content_type,
        bytes,
    })
}

/// GET `url` and decode the body as (lossy) UTF-8.
pub async fn fetch_text(
    url: &str,
    options: &LoadOptions,
    loader_name: &str,
    accept: &str,
) -> Result<String, LoadError> {
    let body = fetch(url, options, loader_name, accept).await?;
    Ok(String::from_utf8_lossy(&body.bytes).into_owned())
}
