//! Ties a [`golem_config::SraixConfig`] service table to a [`SraixTransport`]:
//! resolve placeholders, dispatch, extract the answer, and fall back to the
//! tag's own `default` attribute (or empty) on any failure (§4.5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use golem_config::{HttpMethod, ResponseFormat, SraixConfig, SraixServiceConfig};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::SraixError;
use crate::placeholder::{parse_hint, substitute, PlaceholderSource};
use crate::transport::{SraixRequest, SraixTransport};

pub struct SraixDispatcher {
    config: RwLock<SraixConfig>,
    transport: Arc<dyn SraixTransport>,
    default_timeout: Duration,
}

impl SraixDispatcher {
    pub fn new(config: SraixConfig, transport: Arc<dyn SraixTransport>, default_timeout: Duration) -> Self {
        Self { config: RwLock::new(config), transport, default_timeout }
    }

    /// Replace the service table wholesale (§6 `LoadSRAIXConfig`). Takes
    /// effect for the next `dispatch` call; in-flight dispatches already
    /// hold their own resolved service config.
    pub async fn set_config(&self, config: SraixConfig) {
        *self.config.write().await = config;
    }

    /// Dispatch one `<sraix service="..." hint="...">input</sraix>` call.
    /// Never returns an `Err` to the template layer: unknown services,
    /// HTTP error statuses, transport failures, and unparsable responses all
    /// fall back through the tag's own `default` attribute, then the
    /// service's configured fallback, then an empty string, with the reason
    /// logged.
    pub async fn dispatch(
        &self,
        service: &str,
        hint: &str,
        input: &str,
        wildcards: &[String],
        tag_default: Option<&str>,
        source: &dyn PlaceholderSource,
    ) -> String {
        match self.try_dispatch(service, hint, input, wildcards, source).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(service, error = %err, "sraix dispatch failed, falling back to default");
                // Fallback chain (§4.5): the tag's own `default` attribute,
                // then the service's configured fallback, then empty.
                let fallback = self.config.read().await.find(service).and_then(|svc| svc.fallback.clone());
                tag_default.map(str::to_string).or(fallback).unwrap_or_default()
            }
        }
    }

    async fn try_dispatch(
        &self,
        service: &str,
        hint: &str,
        input: &str,
        wildcards: &[String],
        source: &dyn PlaceholderSource,
    ) -> Result<String, SraixError> {
        let config = self.config.read().await;
        let svc = config.find(service).ok_or_else(|| SraixError::UnknownService(service.to_string()))?;
        let hints = parse_hint(hint);

        let url = substitute(&svc.endpoint, &hints, input, wildcards, source);
        let mut params: HashMap<String, String> = svc
            .params
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, &hints, input, wildcards, source)))
            .collect();
        if svc.include_wildcards {
            params.insert("input".to_string(), input.to_string());
            for (i, w) in wildcards.iter().enumerate() {
                params.insert(format!("wildcard{i}"), w.clone());
            }
        } else if !params.contains_key("input") && matches!(svc.method, HttpMethod::Post) {
            params.insert("input".to_string(), input.to_string());
        }

        let request = SraixRequest {
            method: svc.method,
            url,
            params,
            timeout: svc.timeout_secs.map(Duration::from_secs).unwrap_or(self.default_timeout),
            headers: svc.headers.clone(),
            json_body: svc.include_wildcards && matches!(svc.method, HttpMethod::Post),
            wildcards: wildcards.to_vec(),
        };
        let response = self.transport.send(request).await?;
        if response.status >= 400 {
            return Err(SraixError::HttpStatus(response.status));
        }
        extract(&svc.response, &response.body)
    }
}

fn extract(format: &ResponseFormat, body: &str) -> Result<String, SraixError> {
    match format {
        ResponseFormat::Text => Ok(body.trim().to_string()),
        ResponseFormat::Json { path } => {
            let value: Value = serde_json::from_str(body)?;
            let found = navigate(&value, path).ok_or_else(|| SraixError::MissingPath(path.clone()))?;
            Ok(leaf_string(found))
        }
    }
}

fn navigate<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = if let Ok(index) = segment.parse::<usize>() {
            current.get(index)?
        } else {
            current.get(segment)?
        };
    }
    Some(current)
}

fn leaf_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SraixResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockTransport {
        response: SraixResponse,
        last_request: Mutex<Option<SraixRequest>>,
    }

    #[async_trait]
    impl SraixTransport for MockTransport {
        async fn send(&self, request: SraixRequest) -> Result<SraixResponse, SraixError> {
            *self.last_request.lock().unwrap() = Some(request);
            Ok(self.response.clone())
        }
    }

    fn config_with(service: SraixServiceConfig) -> SraixConfig {
        SraixConfig { services: vec![service] }
    }

    #[tokio::test]
    async fn text_response_is_trimmed_verbatim() {
        let transport = Arc::new(MockTransport {
            response: SraixResponse { status: 200, body: "  42 degrees  \n".to_string() },
            last_request: Mutex::new(None),
        });
        let dispatcher = SraixDispatcher::new(
            config_with(SraixServiceConfig {
                name: "weather".to_string(),
                endpoint: "https://example.test/weather?q={location}".to_string(),
                ..Default::default()
            }),
            transport,
            Duration::from_secs(5),
        );
        let source: HashMap<String, String> = HashMap::new();
        let out = dispatcher.dispatch("weather", "Paris", "how hot is it", &[], None, &source).await;
        assert_eq!(out, "42 degrees");
    }

    #[tokio::test]
    async fn json_path_extracts_nested_leaf() {
        let transport = Arc::new(MockTransport {
            response: SraixResponse {
                status: 200,
                body: r#"{"results":[{"answer":"Paris is the capital"}]}"#.to_string(),
            },
            last_request: Mutex::new(None),
        });
        let dispatcher = SraixDispatcher::new(
            config_with(SraixServiceConfig {
                name: "trivia".to_string(),
                endpoint: "https://example.test/trivia".to_string(),
                response: ResponseFormat::Json { path: "results.0.answer".to_string() },
                ..Default::default()
            }),
            transport,
            Duration::from_secs(5),
        );
        let source: HashMap<String, String> = HashMap::new();
        let out = dispatcher.dispatch("trivia", "", "capital of france", &[], None, &source).await;
        assert_eq!(out, "Paris is the capital");
    }

    #[tokio::test]
    async fn http_error_status_falls_back_to_service_fallback() {
        let transport = Arc::new(MockTransport {
            response: SraixResponse { status: 503, body: "unavailable".to_string() },
            last_request: Mutex::new(None),
        });
        let dispatcher = SraixDispatcher::new(
            config_with(SraixServiceConfig {
                name: "weather".to_string(),
                endpoint: "https://example.test/weather".to_string(),
                fallback: Some("it's probably nice out".to_string()),
                ..Default::default()
            }),
            transport,
            Duration::from_secs(5),
        );
        let source: HashMap<String, String> = HashMap::new();
        let out = dispatcher.dispatch("weather", "", "how hot is it", &[], None, &source).await;
        assert_eq!(out, "it's probably nice out");
    }

    #[tokio::test]
    async fn unknown_service_falls_back_to_tag_default() {
        let transport = Arc::new(MockTransport {
            response: SraixResponse { status: 200, body: String::new() },
            last_request: Mutex::new(None),
        });
        let dispatcher = SraixDispatcher::new(SraixConfig::default(), transport, Duration::from_secs(5));
        let source: HashMap<String, String> = HashMap::new();
        let out = dispatcher.dispatch("nope", "", "x", &[], Some("fallback"), &source).await;
        assert_eq!(out, "fallback");
    }
}
