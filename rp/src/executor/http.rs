//! HTTP executor built on reqwest

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::Executor;
use crate::classify::{Classifier, Verdict};
use crate::config::HttpConfig;

/// Errors reported by a single HTTP try
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Raw result of one HTTP try
pub type HttpOutcome = Result<HttpResponse, HttpError>;

/// Request description, reused unchanged across retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpRequest {
    /// Plain GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: default_method(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, method: impl Into<String>, body: impl Into<String>) -> Self {
        self.method = method.into();
        self.body = Some(body.into());
        self
    }
}

/// Response status, headers and body of a completed try
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes `HttpRequest`s with a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor from HTTP configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, HttpError> {
        debug!(?config, "HttpExecutor::from_config: called");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, request: &HttpRequest) -> HttpOutcome {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| HttpError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse { status, headers, body })
    }
}

#[async_trait]
impl Executor<HttpRequest> for HttpExecutor {
    type Output = HttpOutcome;

    async fn execute(&self, request: &HttpRequest) -> HttpOutcome {
        debug!(method = %request.method, url = %request.url, "HttpExecutor::execute: called");
        let outcome = self.send(request).await;
        match &outcome {
            Ok(response) => debug!(status = response.status, "HttpExecutor::execute: response received"),
            Err(e) => debug!(%e, "HttpExecutor::execute: request failed"),
        }
        outcome
    }
}

/// Retries transport errors, 429 and 5xx responses; accepts everything else
#[derive(Debug, Clone, Default)]
pub struct StatusClassifier {
    extra: Vec<u16>,
}

impl StatusClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also retry responses with this status
    pub fn with_status(mut self, status: u16) -> Self {
        self.extra.push(status);
        self
    }

    fn is_retryable(&self, status: u16) -> bool {
        status == 429 || status >= 500 || self.extra.contains(&status)
    }
}

#[async_trait]
impl Classifier<HttpOutcome> for StatusClassifier {
    async fn classify(&self, output: &HttpOutcome) -> Verdict {
        match output {
            Ok(response) if self.is_retryable(response.status) => Verdict::Retry(format!("HTTP {}", response.status)),
            Ok(_) => Verdict::Accept,
            Err(e) => Verdict::Retry(e.to_string()),
        }
    }
}
