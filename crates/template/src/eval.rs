use std::future::Future;
use std::pin::Pin;

use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::registry::TagRegistry;

/// Evaluate a single AST node against the tag registry. Text nodes emit
/// verbatim; tag nodes dispatch to their handler (or the lenient
/// concatenate-children fallback for unknown tags, §9).
///
/// Boxed because tag handlers recurse back into this function (via
/// `eval_children`), and Rust doesn't allow unboxed recursive `async fn`.
pub fn eval_node<'a>(
    node: &'a TemplateNode,
    registry: &'a TagRegistry,
    ctx: &'a mut EvalContext<'_>,
) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
    Box::pin(async move {
        match node {
            TemplateNode::Text(text) => text.clone(),
            TemplateNode::Tag { name, .. } => {
                let key = name.to_lowercase();
                if let Some(handler) = registry.get(&key) {
                    handler.eval(node, registry, ctx).await
                } else {
                    // Unknown tag: round-trip as its evaluated children,
                    // preserving the tag name's original attributes is not
                    // meaningful for output text (§9 lenient XML parsing).
                    eval_children(node, registry, ctx).await
                }
            }
        }
    })
}

/// Evaluate every child of `node` in order and concatenate the results —
/// the default post-order behavior most tag handlers want (§4.3).
pub fn eval_children<'a>(
    node: &'a TemplateNode,
    registry: &'a TagRegistry,
    ctx: &'a mut EvalContext<'_>,
) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
    Box::pin(async move {
        let mut out = String::new();
        for child in node.children() {
            let piece = eval_node(child, registry, ctx).await;
            append_collapsing_whitespace(&mut out, &piece);
        }
        out
    })
}

/// Append `piece` to `out`, collapsing the adjacent whitespace that an
/// empty substitution (a missed `get`/`bot`/`star`) would otherwise leave
/// behind as a double space (§4.3 whitespace contract).
fn append_collapsing_whitespace(out: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if out.ends_with(' ') && piece.starts_with(' ') {
        out.push_str(piece.trim_start_matches(' '));
    } else {
        out.push_str(piece);
    }
}

/// Evaluate a whole `<template>` root: concatenate children, then trim
/// surrounding whitespace (§4.3).
pub async fn eval_template(root: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
    eval_children(root, registry, ctx).await.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_around_empty_substitution() {
        let mut out = String::from("Hi ");
        append_collapsing_whitespace(&mut out, "");
        append_collapsing_whitespace(&mut out, " there");
        assert_eq!(out, "Hi there");
    }
}
