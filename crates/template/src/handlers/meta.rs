//! Introspection self-closing tags (§4.3, §9 self-closing tag set):
//! `<size/>` (category count), `<version/>` (bot `version` property),
//! `<id/>` (current session id), and `<system/>` (reserved, always empty).

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("size", Box::new(SizeHandler));
    reg.register("version", Box::new(VersionHandler));
    reg.register("id", Box::new(IdHandler));
    reg.register("system", Box::new(SystemHandler));
}

struct SizeHandler;

#[async_trait]
impl TagHandler for SizeHandler {
    async fn eval(&self, _node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        ctx.kb.categories.len().to_string()
    }
}

struct VersionHandler;

#[async_trait]
impl TagHandler for VersionHandler {
    async fn eval(&self, _node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        ctx.kb.get_property("version").unwrap_or_default()
    }
}

struct IdHandler;

#[async_trait]
impl TagHandler for IdHandler {
    async fn eval(&self, _node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        ctx.session.lock().await.id.clone()
    }
}

/// `<system/>`: spec-reserved, not implemented (§4.3).
struct SystemHandler;

#[async_trait]
impl TagHandler for SystemHandler {
    async fn eval(&self, _node: &TemplateNode, _registry: &TagRegistry, _ctx: &mut EvalContext<'_>) -> String {
        String::new()
    }
}
