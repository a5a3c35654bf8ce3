//! Descriptors for `<sraix>` external services (§4.5): which services a bot
//! knows about, how to reach them, and how to pull an answer back out of the
//! response. The dispatcher itself (`golem-sraix`) owns the HTTP mechanics;
//! this crate only owns the declarative, file-loadable shape of a service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

/// How to pull the answer out of a service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Use the raw response body verbatim.
    Text,
    /// Navigate a JSON body via a dotted/indexed path (e.g. `results.0.answer`).
    Json { path: String },
}

impl Default for ResponseFormat {
    fn default() -> Self {
        Self::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SraixServiceConfig {
    pub name: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub response: ResponseFormat,
    /// Extra static query/body parameters merged in alongside the
    /// placeholder-substituted ones.
    pub params: HashMap<String, String>,
    /// Per-service timeout override; falls back to `EngineConfig::sraix_timeout_secs`.
    pub timeout_secs: Option<u64>,
    /// When set, `{input}` and wildcard captures are sent as a JSON body
    /// (`{"input": ...}` or `{"input": ..., "wildcards": {...}}`) instead of
    /// being substituted into `endpoint`/`params`.
    pub include_wildcards: bool,
    /// Static headers sent with every request to this service (e.g.
    /// `Authorization`), merged in alongside whatever the transport sets.
    pub headers: HashMap<String, String>,
    /// Consulted after the tag's own `default` attribute and before an
    /// empty string, when dispatch fails for any reason.
    pub fallback: Option<String>,
}

impl Default for SraixServiceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            endpoint: String::new(),
            method: HttpMethod::default(),
            response: ResponseFormat::default(),
            params: HashMap::new(),
            timeout_secs: None,
            include_wildcards: false,
            headers: HashMap::new(),
            fallback: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SraixConfig {
    pub services: Vec<SraixServiceConfig>,
}

impl SraixConfig {
    pub fn find(&self, name: &str) -> Option<&SraixServiceConfig> {
        self.services.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}
