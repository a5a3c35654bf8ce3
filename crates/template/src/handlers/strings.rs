//! Attribute-driven string operations (§4.3 "String ops").

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("substring", Box::new(SubstringHandler));
    reg.register("replace", Box::new(ReplaceHandler));
    reg.register("length", Box::new(LengthHandler));
    reg.register("count", Box::new(CountHandler));
    reg.register("split", Box::new(SplitHandler));
    reg.register("join", Box::new(JoinHandler));
    reg.register("indent", Box::new(IndentHandler));
    reg.register("dedent", Box::new(DedentHandler));
    reg.register("repeat", Box::new(RepeatHandler));
    reg.register("first", Box::new(HeadTailHandler { head: true }));
    reg.register("rest", Box::new(HeadTailHandler { head: false }));
}

fn attr_usize(node: &TemplateNode, name: &str, default: usize) -> usize {
    node.attr(name).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

struct SubstringHandler;

#[async_trait]
impl TagHandler for SubstringHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let chars: Vec<char> = text.chars().collect();
        let start = attr_usize(node, "start", 0).min(chars.len());
        let end = attr_usize(node, "end", chars.len()).min(chars.len());
        if start >= end {
            return String::new();
        }
        chars[start..end].iter().collect()
    }
}

struct ReplaceHandler;

#[async_trait]
impl TagHandler for ReplaceHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let from = node.attr("from").unwrap_or_default();
        let to = node.attr("to").unwrap_or_default();
        if from.is_empty() {
            text
        } else {
            text.replace(from, to)
        }
    }
}

struct LengthHandler;

#[async_trait]
impl TagHandler for LengthHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        text.chars().count().to_string()
    }
}

struct CountHandler;

#[async_trait]
impl TagHandler for CountHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        match node.attr("of") {
            Some(needle) if !needle.is_empty() => text.matches(needle).count().to_string(),
            _ => text.split_whitespace().count().to_string(),
        }
    }
}

struct SplitHandler;

#[async_trait]
impl TagHandler for SplitHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let sep = node.attr("sep").unwrap_or(" ");
        text.split(sep).collect::<Vec<_>>().join("\n")
    }
}

struct JoinHandler;

#[async_trait]
impl TagHandler for JoinHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let sep = node.attr("sep").unwrap_or(" ");
        text.lines().collect::<Vec<_>>().join(sep)
    }
}

struct IndentHandler;

#[async_trait]
impl TagHandler for IndentHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let n = attr_usize(node, "n", 1);
        let ch = node.attr("char").unwrap_or(" ");
        let prefix = ch.repeat(n);
        text.lines().map(|l| format!("{prefix}{l}")).collect::<Vec<_>>().join("\n")
    }
}

struct DedentHandler;

#[async_trait]
impl TagHandler for DedentHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let n = attr_usize(node, "n", 1);
        text.lines()
            .map(|l| {
                let mut rest = l;
                for _ in 0..n {
                    rest = rest.strip_prefix(' ').unwrap_or(rest);
                }
                rest
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct RepeatHandler;

#[async_trait]
impl TagHandler for RepeatHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let n = attr_usize(node, "n", 1);
        text.repeat(n)
    }
}

struct HeadTailHandler {
    head: bool,
}

#[async_trait]
impl TagHandler for HeadTailHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return String::new();
        }
        if self.head {
            words[0].to_string()
        } else {
            words[1..].join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_template;
    use crate::registry::default_registry;
    use crate::test_support::{tag, text, TestFixture};
    use golem_session::Session;

    async fn render(node: TemplateNode) -> String {
        let mut fixture = TestFixture::new();
        let mut ctx = fixture.ctx(Session::new("s1"), Default::default());
        eval_template(&node, &default_registry(), &mut ctx).await
    }

    #[tokio::test]
    async fn substring_slices_by_char_index() {
        let node = tag("template", &[], vec![tag("substring", &[("start", "0"), ("end", "5")], vec![text("hello world")])]);
        assert_eq!(render(node).await, "hello");
    }

    #[tokio::test]
    async fn first_and_rest_split_on_whitespace() {
        let first = tag("template", &[], vec![tag("first", &[], vec![text("a b c")])]);
        let rest = tag("template", &[], vec![tag("rest", &[], vec![text("a b c")])]);
        assert_eq!(render(first).await, "a");
        assert_eq!(render(rest).await, "b c");
    }

    #[tokio::test]
    async fn replace_substitutes_literal_text() {
        let node = tag("template", &[], vec![tag("replace", &[("from", "cat"), ("to", "dog")], vec![text("my cat")])]);
        assert_eq!(render(node).await, "my dog");
    }
}
