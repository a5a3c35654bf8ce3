//! Tree-walking template evaluator: ~30 tag kinds dispatched through a single
//! [`TagRegistry`], against a per-evaluation [`EvalContext`] (§4.3, §9).
//!
//! This crate deliberately does not depend on `golem-match` or `golem-sraix`
//! — the [`TemplateHost`] trait inverts that dependency so `golem-eval` can
//! supply `srai`/`sraix`/`learn` behavior without a cyclic crate graph.

mod context;
mod eval;
mod handlers;
mod registry;
#[cfg(test)]
mod test_support;

pub use context::{
    EvalContext, FixedRandom, FixedRandomFactory, RandomSource, RandomSourceFactory, SessionHandle,
    TemplateHost, ThreadRandom, ThreadRandomFactory, Wildcards,
};
pub use eval::{eval_children, eval_node, eval_template};
pub use registry::{default_registry, TagHandler, TagRegistry};
