//! The wire-level half of `<sraix>`: an async trait so request dispatch is
//! mockable in tests, plus the `reqwest`-backed production implementation
//! (§4.5, §9 injectable collaborators).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use golem_config::HttpMethod;

use crate::error::SraixError;

#[derive(Debug, Clone)]
pub struct SraixRequest {
    pub method: HttpMethod,
    pub url: String,
    pub params: HashMap<String, String>,
    pub timeout: Duration,
    pub headers: HashMap<String, String>,
    /// POST body encoding: JSON object (`{"input": ..., "wildcards": {...}}`)
    /// instead of form-encoded `params`, per a service's `include_wildcards`.
    pub json_body: bool,
    pub wildcards: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SraixResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait SraixTransport: Send + Sync {
    async fn send(&self, request: SraixRequest) -> Result<SraixResponse, SraixError>;
}

/// Production transport: GET params go on the query string, POST params go
/// in a form body.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SraixTransport for ReqwestTransport {
    async fn send(&self, request: SraixRequest) -> Result<SraixResponse, SraixError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url).query(&request.params),
            HttpMethod::Post if request.json_body => {
                let mut body = serde_json::Map::new();
                if let Some(input) = request.params.get("input") {
                    body.insert("input".to_string(), serde_json::Value::String(input.clone()));
                }
                if !request.wildcards.is_empty() {
                    body.insert(
                        "wildcards".to_string(),
                        serde_json::Value::Array(
                            request.wildcards.iter().cloned().map(serde_json::Value::String).collect(),
                        ),
                    );
                }
                self.client.post(&request.url).json(&serde_json::Value::Object(body))
            }
            HttpMethod::Post => self.client.post(&request.url).form(&request.params),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SraixError::Timeout(request.url.clone())
                } else {
                    SraixError::Request(err)
                }
            })?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(SraixResponse { status, body })
    }
}
