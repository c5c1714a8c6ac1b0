//! Shared HTTP client for outbound federation.

use std::time::Duration;

use crossfed_common::AppError;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

/// AS2 content type with the activitystreams profile.
pub const CONTENT_TYPE_AS2: &str =
    r#"application/ld+json; profile="https://www.w3.org/ns/activitystreams""#;

/// Plain activity+json content type.
pub const CONTENT_TYPE_AS: &str = "application/activity+json";

/// The content-negotiation Accept header for structured fetches.
#[must_use]
pub fn as2_accept_header() -> String {
    format!("{CONTENT_TYPE_AS2}; q=0.9, {CONTENT_TYPE_AS}; q=0.8")
}

/// HTTP client wrapper used by the protocol implementations.
#[derive(Clone)]
pub struct FederationClient {
    client: Client,
    user_agent: String,
}

impl FederationClient {
    /// Create a new federation client.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(user_agent: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    /// GET a JSON document with the given Accept header. Any failure —
    /// transport, status, parse — yields `None`.
    pub async fn get_json(&self, url: &str, accept: &str) -> Option<Value> {
        debug!(url = %url, "fetching remote document");

        let response = self
            .client
            .get(url)
            .header("Accept", accept)
            .header("User-Agent", &self.user_agent)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(url = %url, error = %e, "response was not JSON");
                    None
                }
            },
            Ok(resp) => {
                debug!(url = %url, status = %resp.status(), "remote fetch rejected");
                None
            }
            Err(e) => {
                debug!(url = %url, error = %e, "remote fetch failed");
                None
            }
        }
    }

    /// GET a text document. Returns `(content_type, body)`; any failure
    /// yields `None`.
    pub async fn get_text(&self, url: &str, accept: &str) -> Option<(String, String)> {
        let response = self
            .client
            .get(url)
            .header("Accept", accept)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "document fetch rejected");
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.ok()?;
        Some((content_type, body))
    }

    /// POST a JSON body to a delivery address. Success returns `true`;
    /// a gone recipient (410) returns `false`; other failures are
    /// classified delivery errors.
    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
        content_type: &str,
    ) -> Result<bool, AppError> {
        let body_bytes = serde_json::to_vec(body).map_err(|e| AppError::Delivery {
            status: None,
            message: e.to_string(),
        })?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", content_type)
            .header("User-Agent", &self.user_agent)
            .body(body_bytes)
            .send()
            .await
            .map_err(|e| AppError::Delivery {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!(url = %url, status = %status, "delivered");
            return Ok(true);
        }
        if status.as_u16() == 410 {
            // Gone: the remote recipient no longer exists.
            warn!(url = %url, "recipient gone, skipping");
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Delivery {
            status: Some(status.as_u16()),
            message: body,
        })
    }

    /// POST an urlencoded form. Same status classification as
    /// [`Self::post_json`].
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<bool, AppError> {
        let response = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Delivery {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!(url = %url, status = %status, "delivered");
            return Ok(true);
        }
        if status.as_u16() == 410 {
            warn!(url = %url, "recipient gone, skipping");
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Delivery {
            status: Some(status.as_u16()),
            message: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_header_priorities() {
        let header = as2_accept_header();
        assert!(header.starts_with(CONTENT_TYPE_AS2));
        assert!(header.contains("q=0.9"));
        assert!(header.ends_with(&format!("{CONTENT_TYPE_AS}; q=0.8")));
    }
}
