// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External content publishing for oversized outbound messages.
//!
//! Publishing is strictly best-effort: any failure (non-2xx, network error,
//! timeout, bad JSON) yields `None` and the caller falls back to chunked
//! delivery of the original message.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::splitter::{extract_title, preview};

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    summary: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: String,
    url: String,
}

/// Client for the optional content-publishing service.
pub struct ContentPublisher {
    base_url: String,
    token: String,
    public_base: Option<String>,
    client: reqwest::Client,
}

impl ContentPublisher {
    /// Build from config; `None` when no publisher is configured.
    pub fn from_config(config: &BridgeConfig) -> Option<Self> {
        if config.publisher_url.is_empty() || config.publisher_token.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        let public_base = (!config.publisher_public_url.is_empty())
            .then(|| config.publisher_public_url.trim_end_matches('/').to_owned());
        Some(Self {
            base_url: config.publisher_url.trim_end_matches('/').to_owned(),
            token: config.publisher_token.clone(),
            public_base,
            client,
        })
    }

    /// Publish `message` and return the short summary that replaces it.
    /// `None` means "deliver the original message instead".
    pub async fn publish(&self, message: &str) -> Option<String> {
        let title = extract_title(message);
        let summary = preview(message);
        let request = PublishRequest { title: &title, body: message, kind: "markdown", summary: &summary };

        let response = match self
            .client
            .post(format!("{}/api/publish", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(err = %e, "content publish request failed");
                return None;
            }
        };

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(err = %e, "content publish rejected");
                return None;
            }
        };

        let published: PublishResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(err = %e, "content publish returned invalid JSON");
                return None;
            }
        };

        let public_url = match &self.public_base {
            Some(base) => format!("{base}/p/{}", published.id),
            None => published.url,
        };
        tracing::info!(url = %public_url, bytes = message.len(), "oversized message published");
        Some(compose_summary(&title, &summary, &public_url))
    }
}

/// The reply delivered in place of a published message.
fn compose_summary(title: &str, preview: &str, public_url: &str) -> String {
    format!("{title}\n\n{preview}\n\nLire la suite : {public_url}")
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
