use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("star", Box::new(StarHandler(StarKind::Pattern)));
    reg.register("thatstar", Box::new(StarHandler(StarKind::That)));
    reg.register("topicstar", Box::new(StarHandler(StarKind::Topic)));
    reg.register("get", Box::new(GetHandler));
    reg.register("set", Box::new(SetHandler));
    reg.register("bot", Box::new(BotHandler));
    reg.register("think", Box::new(ThinkHandler));
}

fn index_attr(node: &TemplateNode, default: usize) -> usize {
    node.attr("index").and_then(|s| s.trim().parse::<usize>().ok()).unwrap_or(default)
}

enum StarKind {
    Pattern,
    That,
    Topic,
}

struct StarHandler(StarKind);

#[async_trait]
impl TagHandler for StarHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let index = index_attr(node, 1);
        if index == 0 {
            return String::new();
        }
        let spans = match self.0 {
            StarKind::Pattern => &ctx.wildcards.pattern,
            StarKind::That => &ctx.wildcards.that,
            StarKind::Topic => &ctx.wildcards.topic,
        };
        spans.get(index - 1).cloned().unwrap_or_default()
    }
}

struct GetHandler;

#[async_trait]
impl TagHandler for GetHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        if let Some(name) = node.attr("var") {
            ctx.get_var_scoped(name).await.unwrap_or_default()
        } else if let Some(name) = node.attr("name") {
            ctx.get_named(name).await.unwrap_or_default()
        } else {
            String::new()
        }
    }
}

/// `<set name="v">X</set>` / `<set var="v">X</set>`: session/local variable
/// assignment (§4.3). `<set name="N" operation="OP">X</set>` is a different
/// tag in the same AIML surface — the named-collection tag (§4.3
/// "Collections") — distinguished by the presence of `operation`; route to
/// `collections::eval_set_collection` for that case so both uses of `<set>`
/// share one registry entry instead of the second permanently shadowing the
/// first (the variable form has no `operation` attribute).
struct SetHandler;

#[async_trait]
impl TagHandler for SetHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        if node.attr("operation").is_some() {
            return crate::handlers::collections::eval_set_collection(node, registry, ctx).await;
        }
        let value = eval_children(node, registry, ctx).await;
        if let Some(name) = node.attr("var") {
            ctx.set_var_scoped(name, value.clone());
        } else if let Some(name) = node.attr("name") {
            ctx.set_named(name, value.clone()).await;
        }
        value
    }
}

struct BotHandler;

#[async_trait]
impl TagHandler for BotHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        match node.attr("name") {
            Some(name) => ctx.kb.get_property(name).unwrap_or_default(),
            None => String::new(),
        }
    }
}

struct ThinkHandler;

#[async_trait]
impl TagHandler for ThinkHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        // Evaluate for side effects only; the result is always discarded
        // (§8 "think silence": `<think>X</think>Y` renders identically to
        // `Y`, for every `X` whose side effects don't leak into `Y`).
        let _ = eval_children(node, registry, ctx).await;
        String::new()
    }
}
