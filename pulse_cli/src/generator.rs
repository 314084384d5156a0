//! Client for the external profile generator.
//!
//! Posts the parameter set and validates the returned segment array. The
//! response is untrusted: it goes through [`ParsedProfile::from_value`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use pulse_core::{GeneratorParams, ParsedProfile};

/// Current application version (from Cargo.toml)
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GeneratorClient {
    url: String,
    client: reqwest::blocking::Client,
}

impl GeneratorClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("Pulsetrace/{}", CURRENT_VERSION))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request a profile for `params`.
    pub fn generate(&self, params: &GeneratorParams) -> Result<ParsedProfile> {
        log::info!("Requesting profile from {}", self.url);
        log::debug!("Generator request: {:?}", params);

        let response = self
            .client
            .post(&self.url)
            .json(params)
            .send()
            .with_context(|| format!("Network error contacting {}", self.url))?;

        if !response.status().is_success() {
            bail!("Generator returned {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .context("Failed to parse generator response")?;

        let parsed = ParsedProfile::from_value(&body)?;
        if !parsed.is_clean() {
            log::warn!(
                "Generator response had {} unusable segments",
                parsed.issues.len()
            );
        }
        Ok(parsed)
    }
}
