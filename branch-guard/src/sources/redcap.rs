//! REDCap API client.

use super::json::rows_from_json;
use super::{MetadataSource, RecordSource, Source};
use crate::log_data_op;
use crate::logging::truncate_field;
use crate::prelude::*;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;
use zeroize::{Zeroize, ZeroizeOnDrop};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A REDCap API token, cleared from memory when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct ApiToken(String);

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiToken(***)")
    }
}

impl ApiToken {
    /// Wraps a token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token. Avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Converts to a plain string, clearing this token.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

/// Connection settings for a REDCap project.
#[derive(Debug, Clone)]
pub struct RedcapConfig {
    /// API endpoint, usually `https://<host>/api/`
    pub url: String,
    /// Project API token
    pub token: ApiToken,
    /// Request timeout
    pub timeout: Duration,
}

impl RedcapConfig {
    /// Creates a configuration with the default timeout.
    pub fn new(url: impl Into<String>, token: ApiToken) -> Self {
        Self {
            url: url.into(),
            token,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `REDCAP_API_URL`, `REDCAP_API_TOKEN` and the optional
    /// `REDCAP_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Result<Self> {
        let url = required_env("REDCAP_API_URL")?;
        let token = ApiToken::new(required_env("REDCAP_API_TOKEN")?);
        let mut config = Self::new(url, token);

        if let Ok(secs) = std::env::var("REDCAP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                GuardError::Configuration(format!(
                    "REDCAP_TIMEOUT_SECS must be a number of seconds, got '{secs}'"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(GuardError::Configuration(format!(
            "environment variable {name} is not set"
        ))),
    }
}

/// Fetches metadata and flat raw records from the REDCap API.
#[derive(Debug, Clone)]
pub struct RedcapSource {
    config: RedcapConfig,
    client: Client,
    log_config: LogConfig,
}

impl RedcapSource {
    /// Creates a source for the configured project.
    pub fn new(config: RedcapConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GuardError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            log_config: LogConfig::default(),
        })
    }

    /// Creates a source from the environment. See [`RedcapConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(RedcapConfig::from_env()?)
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    #[instrument(skip(self, params), fields(url = %self.config.url))]
    async fn export(&self, content: &str, params: &[(&str, &str)]) -> Result<RecordSet> {
        let mut form = vec![
            ("token", self.config.token.expose()),
            ("content", content),
            ("format", "json"),
            ("returnFormat", "json"),
        ];
        form.extend_from_slice(params);

        let response = self.client.post(&self.config.url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| truncate_field(&body, self.log_config.max_field_length));
            return Err(GuardError::data_source(
                "REDCap",
                format!("export of '{content}' failed ({status}): {message}"),
            ));
        }

        let rows = rows_from_json(&body, "REDCap")?;
        log_data_op!(
            self.log_config,
            content,
            rows = rows.len(),
            "Exported from REDCap"
        );
        Ok(RecordSet::from_json_rows(rows))
    }
}

impl Source for RedcapSource {
    fn description(&self) -> String {
        format!("REDCap API: {}", self.config.url)
    }
}

#[async_trait]
impl MetadataSource for RedcapSource {
    async fn load_metadata(&self) -> Result<Vec<FieldMetadata>> {
        let rows = self.export("metadata", &[]).await?;
        FieldMetadata::from_records(&rows)
    }
}

#[async_trait]
impl RecordSource for RedcapSource {
    async fn load_records(&self) -> Result<RecordSet> {
        self.export("record", &[("type", "flat"), ("rawOrLabel", "raw")])
            .await
    }
}
