//! HTTP client for the external synthesis service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::engine::Engine;
use super::models::{SynthesisRequest, SynthesizedClip};
use super::SynthesisBackend;
use crate::library::SoundParameters;

/// HTTP client for communicating with the synthesis service.
pub struct HttpSynthesisClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSynthesisClient {
    /// Create a new synthesis client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the synthesis service (e.g., "http://localhost:8090")
    /// * `timeout_sec` - Request timeout in seconds; generations can take
    ///   seconds to low minutes, so this should be generous
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self { client, base_url }
    }

    /// Check if the synthesis service is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to synthesis service")?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!(
                "Synthesis health check failed with status: {}",
                response.status()
            )
        }
    }

    /// Get the base URL of the synthesis service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SynthesisBackend for HttpSynthesisClient {
    async fn generate(
        &self,
        engine: Engine,
        prompt: &str,
        parameters: &SoundParameters,
    ) -> Result<SynthesizedClip> {
        let url = format!("{}/generate", self.base_url);
        let body = SynthesisRequest {
            engine,
            prompt,
            parameters,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach synthesis service")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Synthesis on engine {} failed with status: {}",
                engine,
                response.status()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse synthesis response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpSynthesisClient::new("http://localhost:8090".to_string(), 300);
        assert_eq!(client.base_url(), "http://localhost:8090");
    }

    #[test]
    fn test_trailing_slash_removal() {
        let client = HttpSynthesisClient::new("http://localhost:8090/".to_string(), 300);
        assert_eq!(client.base_url(), "http://localhost:8090");
    }
}
