//! Control-flow tags: these inspect raw children rather than blindly calling
//! `eval_children`, so unchosen branches never run (§8 "think silence"
//! extends to any branch the control tag doesn't choose).

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("srai", Box::new(SraiHandler));
    reg.register("sr", Box::new(SrHandler));
    reg.register("condition", Box::new(ConditionHandler));
    reg.register("random", Box::new(RandomHandler));
    reg.register("eval", Box::new(EvalHandler));
}

struct SraiHandler;

#[async_trait]
impl TagHandler for SraiHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let input = eval_children(node, registry, ctx).await;
        ctx.host.srai(input.trim()).await
    }
}

/// `<sr/>` is shorthand for `<srai><star/></srai>` (§4.4).
struct SrHandler;

#[async_trait]
impl TagHandler for SrHandler {
    async fn eval(&self, _node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let input = ctx.wildcards.pattern.first().cloned().unwrap_or_default();
        ctx.host.srai(input.trim()).await
    }
}

/// `<condition>`: either the single-value form (`name`/`var` + `value`
/// attribute directly on `<condition>`, content is the consequent) or the
/// block form (one or more `<li>` children, each with `name`/`var` + `value`,
/// or a final bare `<li>` as the default/else branch). Only the matching
/// `<li>`'s children are evaluated — every other branch's side effects never
/// run.
struct ConditionHandler;

#[async_trait]
impl TagHandler for ConditionHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        if let Some(value) = node.attr("value") {
            if condition_matches(node, Some(value), ctx).await {
                return eval_children(node, registry, ctx).await;
            }
            return String::new();
        }

        let branches: Vec<&TemplateNode> =
            node.children().iter().filter(|c| c.name() == Some("li")).collect();

        for li in &branches {
            // A bare `<li>` with no `value` attribute is the default/else
            // branch, regardless of whether it inherits `name`/`var` from
            // the enclosing `<condition>` — there is nothing to compare
            // against, so it always matches.
            let Some(value) = li.attr("value") else {
                return eval_children(li, registry, ctx).await;
            };
            let name = li.attr("name").or_else(|| node.attr("name"));
            let var = li.attr("var").or_else(|| node.attr("var"));
            if condition_matches_for(name, var, Some(value), ctx).await {
                return eval_children(li, registry, ctx).await;
            }
        }
        String::new()
    }
}

async fn condition_matches(node: &TemplateNode, value: Option<&str>, ctx: &EvalContext<'_>) -> bool {
    condition_matches_for(node.attr("name"), node.attr("var"), value, ctx).await
}

async fn condition_matches_for(name: Option<&str>, var: Option<&str>, value: Option<&str>, ctx: &EvalContext<'_>) -> bool {
    let Some(expected) = value else { return false };
    let actual = if let Some(var) = var {
        ctx.get_var_scoped(var).await
    } else if let Some(name) = name {
        ctx.get_named(name).await
    } else {
        None
    };
    actual.is_some_and(|a| a.eq_ignore_ascii_case(expected))
}

/// `<random>`: one `<li>` chosen uniformly via the injectable `RandomSource`,
/// only that branch's children are evaluated (§4.4, §9).
struct RandomHandler;

#[async_trait]
impl TagHandler for RandomHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let branches: Vec<&TemplateNode> =
            node.children().iter().filter(|c| c.name() == Some("li")).collect();
        if branches.is_empty() {
            return String::new();
        }
        let choice = ctx.rng.choose(branches.len());
        eval_children(branches[choice], registry, ctx).await
    }
}

/// `<eval>`: evaluate children normally, then re-evaluate the resulting text
/// as if it were template markup is out of scope — AIML's `<eval>` simply
/// forces evaluation of an otherwise-raw subtree (used inside `<condition>`
/// predicates and learned templates), which `eval_children` already does.
struct EvalHandler;

#[async_trait]
impl TagHandler for EvalHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        eval_children(node, registry, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Wildcards;
    use crate::eval::eval_template;
    use crate::registry::default_registry;
    use crate::test_support::{tag, text, TestFixture};
    use golem_session::Session;

    #[tokio::test]
    async fn condition_block_form_picks_matching_li_only() {
        let mut fixture = TestFixture::new();
        fixture.kb.set_global("mood", "happy");
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let root = tag(
            "template",
            &[],
            vec![tag(
                "condition",
                &[("name", "mood")],
                vec![
                    tag("li", &[("value", "sad")], vec![text("oh no")]),
                    tag("li", &[("value", "happy")], vec![text("great!")]),
                    tag("li", &[], vec![text("default")]),
                ],
            )],
        );
        assert_eq!(eval_template(&root, &registry, &mut ctx).await, "great!");
    }

    #[tokio::test]
    async fn condition_falls_through_to_bare_default_li() {
        let mut fixture = TestFixture::new();
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let root = tag(
            "template",
            &[],
            vec![tag(
                "condition",
                &[("name", "mood")],
                vec![tag("li", &[("value", "sad")], vec![text("oh no")]), tag("li", &[], vec![text("default")])],
            )],
        );
        assert_eq!(eval_template(&root, &registry, &mut ctx).await, "default");
    }

    #[tokio::test]
    async fn condition_single_value_form_emits_body_on_match() {
        let mut fixture = TestFixture::new();
        fixture.kb.set_global("mood", "happy");
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let root = tag(
            "template",
            &[],
            vec![tag("condition", &[("name", "mood"), ("value", "happy")], vec![text(":)")])],
        );
        assert_eq!(eval_template(&root, &registry, &mut ctx).await, ":)");
    }

    #[tokio::test]
    async fn condition_single_value_form_empty_on_mismatch() {
        let mut fixture = TestFixture::new();
        fixture.kb.set_global("mood", "sad");
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let root = tag(
            "template",
            &[],
            vec![tag("condition", &[("name", "mood"), ("value", "happy")], vec![text(":)")])],
        );
        assert_eq!(eval_template(&root, &registry, &mut ctx).await, "");
    }

    #[tokio::test]
    async fn random_picks_branch_by_injected_index() {
        let mut fixture = TestFixture::new();
        fixture.rng.0 = 1;
        let mut ctx = fixture.ctx(Session::new("s1"), Wildcards::default());
        let registry = default_registry();
        let root = tag(
            "template",
            &[],
            vec![tag(
                "random",
                &[],
                vec![tag("li", &[], vec![text("a")]), tag("li", &[], vec![text("b")]), tag("li", &[], vec![text("c")])],
            )],
        );
        assert_eq!(eval_template(&root, &registry, &mut ctx).await, "b");
    }
}
