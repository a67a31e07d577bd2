/*!
 * HTTP plumbing shared by the backends.
 */

use std::future::Future;
use std::time::Duration;

use log::{error, trace};
use reqwest::{Client, Response};
use url::Url;

use crate::errors::ServiceError;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("po-translate/", env!("CARGO_PKG_VERSION"));

/// HTTP client with the given request timeout
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Parse a configured endpoint, reporting a bad value as a request the backend cannot serve
pub fn parse_endpoint(provider: &str, endpoint: &str) -> Result<Url, ServiceError> {
    Url::parse(endpoint.trim_end_matches('/'))
        .map_err(|e| ServiceError::Unsupported(format!("Invalid {} URL '{}': {}", provider, endpoint, e)))
}

/// Pass a successful response through; map any other status onto a [`ServiceError`]
pub async fn check_status(provider: &str, response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", provider, status, body);
    Err(ServiceError::from_status(status.as_u16(), body))
}

/// Translate texts one call at a time, pausing `delay` between calls.
///
/// The first failure aborts the batch; partial results are discarded.
pub async fn translate_each<'a, F, Fut>(
    provider: &str,
    texts: &'a [String],
    delay: Duration,
    mut call: F,
) -> Result<Vec<String>, ServiceError>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<String, ServiceError>>,
{
    let mut translations = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        trace!("{} request {}/{}", provider, i + 1, texts.len());
        translations.push(call(text).await?);
    }
    Ok(translations)
}
