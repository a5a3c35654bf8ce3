//! Shared scaffolding for handler unit tests: a no-op `TemplateHost` and
//! small AST-building helpers so individual handler tests stay short.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use golem_kb::{KnowledgeBase, TemplateNode};
use golem_session::Session;
use tokio::sync::Mutex;

use crate::context::{EvalContext, FixedRandom, RandomSource, TemplateHost, Wildcards};

pub struct NoopHost;

#[async_trait]
impl TemplateHost for NoopHost {
    async fn srai(&mut self, _input: &str) -> String {
        String::new()
    }
    async fn sraix(&mut self, _service: &str, _hint: &str, _input: &str, tag_default: Option<&str>) -> String {
        tag_default.unwrap_or_default().to_string()
    }
    async fn learn(&mut self, _xml: &str) -> bool {
        false
    }
    async fn learnf(&mut self, _xml: &str) -> bool {
        false
    }
    async fn unlearn(&mut self, _xml: &str) -> bool {
        false
    }
    async fn unlearnf(&mut self, _xml: &str) -> bool {
        false
    }
    async fn uniq_assert(&mut self, _subj: &str, _pred: &str, _obj: &str) {}
    async fn uniq_query(&mut self, _subj: &str, _pred: &str) -> Option<String> {
        None
    }
}

/// A `TemplateHost` that records every `learn`/`learnf` call and backs
/// `<uniq>` with an in-memory triple store, for handler tests that need to
/// observe those side effects directly.
pub struct RecordingHost {
    pub learned: Vec<String>,
    triples: HashMap<(String, String), String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self { learned: Vec::new(), triples: HashMap::new() }
    }
}

#[async_trait]
impl TemplateHost for RecordingHost {
    async fn srai(&mut self, _input: &str) -> String {
        String::new()
    }
    async fn sraix(&mut self, _service: &str, _hint: &str, _input: &str, tag_default: Option<&str>) -> String {
        tag_default.unwrap_or_default().to_string()
    }
    async fn learn(&mut self, xml: &str) -> bool {
        self.learned.push(xml.to_string());
        true
    }
    async fn learnf(&mut self, xml: &str) -> bool {
        self.learned.push(xml.to_string());
        true
    }
    async fn unlearn(&mut self, _xml: &str) -> bool {
        true
    }
    async fn unlearnf(&mut self, _xml: &str) -> bool {
        true
    }
    async fn uniq_assert(&mut self, subj: &str, pred: &str, obj: &str) {
        self.triples.insert((subj.to_string(), pred.to_string()), obj.to_string());
    }
    async fn uniq_query(&mut self, subj: &str, pred: &str) -> Option<String> {
        self.triples.get(&(subj.to_string(), pred.to_string())).cloned()
    }
}

pub fn tag(name: &str, attrs: &[(&str, &str)], children: Vec<TemplateNode>) -> TemplateNode {
    TemplateNode::Tag {
        name: name.to_string(),
        attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        children,
    }
}

pub fn text(s: &str) -> TemplateNode {
    TemplateNode::Text(s.to_string())
}

/// Build a scratch `EvalContext` over fresh owned state, for handler tests
/// that don't need a shared knowledge base across calls. Generic over the
/// host so tests that need to observe `learn`/`uniq` side effects can swap
/// in [`RecordingHost`] instead of the default no-op.
pub struct TestFixture<H: TemplateHost = NoopHost> {
    pub kb: KnowledgeBase,
    pub host: H,
    pub rng: FixedRandom,
}

impl TestFixture<NoopHost> {
    pub fn new() -> Self {
        Self { kb: KnowledgeBase::new(), host: NoopHost, rng: FixedRandom(0) }
    }
}

impl<H: TemplateHost> TestFixture<H> {
    pub fn with_host(host: H) -> Self {
        Self { kb: KnowledgeBase::new(), host, rng: FixedRandom(0) }
    }

    pub fn ctx(&mut self, session: Session, wildcards: Wildcards) -> EvalContext<'_> {
        EvalContext {
            session: Arc::new(Mutex::new(session)),
            wildcards,
            locals: HashMap::new(),
            kb: &self.kb,
            host: &mut self.host as &mut dyn TemplateHost,
            rng: &mut self.rng as &mut dyn RandomSource,
            now: chrono::Utc::now(),
            warnings: Vec::new(),
        }
    }
}
