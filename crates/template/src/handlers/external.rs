//! Tags that cross the `TemplateHost` boundary: `<sraix>`, the
//! `<learn>`/`<learnf>`/`<unlearn>`/`<unlearnf>` family, and `<uniq>` (§4.3,
//! §4.5). The learn family needs the *raw*, unevaluated `<category>` markup
//! (a learned template shouldn't be pre-evaluated before it's even stored),
//! so these handlers serialize children back to XML via `golem_kb::node_to_xml`
//! rather than calling `eval_children`.

use async_trait::async_trait;
use golem_kb::{node_to_xml, TemplateNode};

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("sraix", Box::new(SraixHandler));
    reg.register("learn", Box::new(LearnHandler { mode: LearnMode::Learn }));
    reg.register("learnf", Box::new(LearnHandler { mode: LearnMode::LearnF }));
    reg.register("unlearn", Box::new(LearnHandler { mode: LearnMode::Unlearn }));
    reg.register("unlearnf", Box::new(LearnHandler { mode: LearnMode::UnlearnF }));
    reg.register("uniq", Box::new(UniqHandler));
}

struct SraixHandler;

#[async_trait]
impl TagHandler for SraixHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let Some(service) = node.attr("service") else { return String::new() };
        let hint = node.attr("hint").unwrap_or_default();
        let tag_default = node.attr("default");
        let input = eval_children(node, registry, ctx).await;
        ctx.host.sraix(service, hint, input.trim(), tag_default).await
    }
}

#[derive(Clone, Copy)]
enum LearnMode {
    Learn,
    LearnF,
    Unlearn,
    UnlearnF,
}

struct LearnHandler {
    mode: LearnMode,
}

#[async_trait]
impl TagHandler for LearnHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        // Raw children, not evaluated: <learn> wraps a literal <category>
        // the user wants stored, not a value the user wants computed.
        let xml: String = node.children().iter().map(node_to_xml).collect();
        let ok = match self.mode {
            LearnMode::Learn => ctx.host.learn(&xml).await,
            LearnMode::LearnF => ctx.host.learnf(&xml).await,
            LearnMode::Unlearn => ctx.host.unlearn(&xml).await,
            LearnMode::UnlearnF => ctx.host.unlearnf(&xml).await,
        };
        if !ok {
            ctx.warn("learn/unlearn family: invalid or no-op content");
        }
        String::new()
    }
}

/// `<uniq><subj>S</subj><pred>P</pred><obj>O</obj></uniq>`: assert the triple
/// unless `obj` begins with `?`, in which case query `(subj, pred)` and store
/// the result into the variable named by the rest of `obj` (§4.3). The
/// matched object — or empty on a failed query — is emitted either way.
struct UniqHandler;

#[async_trait]
impl TagHandler for UniqHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let subj = child_text(node, "subj", registry, ctx).await;
        let pred = child_text(node, "pred", registry, ctx).await;
        let obj = child_text(node, "obj", registry, ctx).await;

        if let Some(var_name) = obj.strip_prefix('?') {
            match ctx.host.uniq_query(subj.trim(), pred.trim()).await {
                Some(value) => {
                    ctx.set_named(var_name.trim(), value.clone()).await;
                    value
                }
                None => String::new(),
            }
        } else {
            ctx.host.uniq_assert(subj.trim(), pred.trim(), obj.trim()).await;
            obj
        }
    }
}

async fn child_text(node: &TemplateNode, name: &str, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
    match node.children().iter().find(|c| c.name() == Some(name)) {
        Some(child) => eval_children(child, registry, ctx).await,
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Wildcards;
    use crate::eval::eval_template;
    use crate::registry::default_registry;
    use crate::test_support::{tag, text, RecordingHost, TestFixture};
    use golem_session::Session;

    #[tokio::test]
    async fn learn_passes_raw_unevaluated_category_xml() {
        let mut fixture = TestFixture::with_host(RecordingHost::new());
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let category = tag(
            "category",
            &[],
            vec![tag("pattern", &[], vec![text("HELLO")]), tag("template", &[], vec![text("Hi!")])],
        );
        let root = tag("template", &[], vec![tag("learn", &[], vec![category])]);
        eval_template(&root, &registry, &mut ctx).await;
        assert_eq!(fixture.host.learned.len(), 1);
        assert!(fixture.host.learned[0].contains("<pattern>HELLO</pattern>"));
    }

    #[tokio::test]
    async fn uniq_asserts_then_answers_query() {
        let mut fixture = TestFixture::with_host(RecordingHost::new());
        let session = Session::new("s1");
        let registry = default_registry();

        {
            let mut ctx = fixture.ctx(session.clone(), Wildcards::default());
            let assert_node = tag(
                "uniq",
                &[],
                vec![
                    tag("subj", &[], vec![text("Bob")]),
                    tag("pred", &[], vec![text("likes")]),
                    tag("obj", &[], vec![text("Pizza")]),
                ],
            );
            eval_template(&tag("template", &[], vec![assert_node]), &registry, &mut ctx).await;
        }

        let mut ctx = fixture.ctx(session, Wildcards::default());
        let query_node = tag(
            "uniq",
            &[],
            vec![
                tag("subj", &[], vec![text("Bob")]),
                tag("pred", &[], vec![text("likes")]),
                tag("obj", &[], vec![text("?FAVORITE")]),
            ],
        );
        let out = eval_template(&tag("template", &[], vec![query_node]), &registry, &mut ctx).await;
        assert_eq!(out, "Pizza");
        assert_eq!(ctx.get_named("FAVORITE").await.as_deref(), Some("Pizza"));
    }
}
