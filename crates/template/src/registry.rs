use std::collections::HashMap;

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;

/// A single tag kind's evaluation rule (§9 "Polymorphism across tag kinds":
/// a dispatch table `kind -> handler(node, ctx) -> string`, not a class
/// hierarchy).
///
/// Handlers receive the raw, unevaluated `node` — most call
/// [`crate::eval::eval_children`] themselves to get ordinary post-order
/// behavior; a few (`random`, `condition`, `uniq`, `learn`/`learnf`,
/// `unlearn`/`unlearnf`) inspect specific children directly so they can
/// skip evaluating branches that weren't chosen, preserving §8's "think
/// silence" guarantee for unchosen branches.
#[async_trait]
pub trait TagHandler: Send + Sync {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String;
}

/// Tag name (lowercase) → handler. Built once at process start via
/// [`default_registry`] and shared (read-only) across every evaluation.
#[derive(Default)]
pub struct TagRegistry {
    handlers: HashMap<String, Box<dyn TagHandler>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn TagHandler>) {
        self.handlers.insert(name.into().to_lowercase(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn TagHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }
}

/// Build the registry of every built-in tag kind (~30, §4.3). `golem-eval`
/// calls this once and reuses the resulting table for every request.
pub fn default_registry() -> TagRegistry {
    let mut reg = TagRegistry::new();
    crate::handlers::vars::register(&mut reg);
    crate::handlers::text::register(&mut reg);
    crate::handlers::strings::register(&mut reg);
    crate::handlers::control::register(&mut reg);
    crate::handlers::history::register(&mut reg);
    crate::handlers::datetime::register(&mut reg);
    crate::handlers::collections::register(&mut reg);
    crate::handlers::external::register(&mut reg);
    crate::handlers::meta::register(&mut reg);
    reg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_core_tags() {
        let reg = default_registry();
        for tag in ["star", "get", "set", "bot", "think", "srai", "sr", "condition", "random", "sraix"] {
            assert!(reg.get(tag).is_some(), "missing handler for <{tag}>");
        }
    }
}
