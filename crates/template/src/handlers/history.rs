//! Session-history tags: `<input>`, `<request>`, `<response>`, `<that>`
//! (§4.4). All are 1-based, most-recent-first, and empty on out-of-range.

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("input", Box::new(InputHandler));
    reg.register("request", Box::new(RequestHandler));
    reg.register("response", Box::new(ResponseHandler));
    reg.register("that", Box::new(ThatHandler));
}

fn index_attr(node: &TemplateNode, default: usize) -> usize {
    node.attr("index").and_then(|s| s.trim().parse::<usize>().ok()).unwrap_or(default)
}

/// `<input/>` with no index is the most recent user utterance (index 1).
struct InputHandler;

#[async_trait]
impl TagHandler for InputHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let index = index_attr(node, 1);
        ctx.session.lock().await.request(index).unwrap_or_default().to_string()
    }
}

struct RequestHandler;

#[async_trait]
impl TagHandler for RequestHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let index = index_attr(node, 1);
        ctx.session.lock().await.request(index).unwrap_or_default().to_string()
    }
}

struct ResponseHandler;

#[async_trait]
impl TagHandler for ResponseHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let index = index_attr(node, 1);
        ctx.session.lock().await.response(index).unwrap_or_default().to_string()
    }
}

/// `<that index="n"/>` (no `that`/`topic` attrs, which would instead select
/// a pattern sub-match — not modeled here since this tag only ever appears
/// inside templates, never inside a `<pattern>`): the n-th previous bot
/// response, same indexing as `<response>`.
struct ThatHandler;

#[async_trait]
impl TagHandler for ThatHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let index = index_attr(node, 1);
        ctx.session.lock().await.response(index).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Wildcards;
    use crate::eval::eval_template;
    use crate::registry::default_registry;
    use crate::test_support::{tag, TestFixture};
    use golem_session::Session;

    #[tokio::test]
    async fn input_and_that_read_most_recent_history() {
        let mut fixture = TestFixture::new();
        let mut session = Session::new("s1");
        session.record_request("hello there");
        session.record_response("Hi! How are you?");
        let mut ctx = fixture.ctx(session, Wildcards::default());
        let registry = default_registry();

        let input_node = tag("template", &[], vec![tag("input", &[], vec![])]);
        assert_eq!(eval_template(&input_node, &registry, &mut ctx).await, "hello there");

        let that_node = tag("template", &[], vec![tag("that", &[], vec![])]);
        assert_eq!(eval_template(&that_node, &registry, &mut ctx).await, "Hi! How are you?");
    }

    #[tokio::test]
    async fn out_of_range_index_is_empty() {
        let mut fixture = TestFixture::new();
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let node = tag("template", &[], vec![tag("request", &[("index", "3")], vec![])]);
        assert_eq!(eval_template(&node, &registry, &mut ctx).await, "");
    }
}
