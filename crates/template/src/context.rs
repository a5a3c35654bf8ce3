use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use golem_kb::KnowledgeBase;
use golem_session::Session;
use tokio::sync::Mutex;

/// A session checked out of `golem-session`'s `SessionStore` for one request.
/// Shared (not cloned) between the outer `EvalContext` and whatever
/// `TemplateHost` constructs for nested `srai` evaluation, so a mutation
/// made three `srai` hops deep is visible to the template that triggered it.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Captured wildcard spans for the current match, one ordered sequence per
/// section (§3 "Wildcard capture").
#[derive(Debug, Clone, Default)]
pub struct Wildcards {
    pub pattern: Vec<String>,
    pub that: Vec<String>,
    pub topic: Vec<String>,
}

/// The cross-crate boundary a template evaluation needs but `golem-template`
/// itself must not depend on: recursive `srai` matching, external `sraix`
/// dispatch, and KB/session category mutation for `learn`/`unlearn`. The
/// concrete implementation lives in `golem-eval`, which owns the match tree
/// and the sraix dispatcher (§9 "isolate behind an interface").
#[async_trait]
pub trait TemplateHost: Send {
    /// Evaluate `input` as a fresh user utterance: re-normalize, match, and
    /// evaluate the result. Empty string on no-match or recursion overflow.
    async fn srai(&mut self, input: &str) -> String;

    /// Dispatch `<sraix service="..">`. `tag_default` is the tag's own
    /// `default` attribute, consulted before the service's configured
    /// fallback (§4.5).
    async fn sraix(&mut self, service: &str, hint: &str, input: &str, tag_default: Option<&str>) -> String;

    /// Parse `xml` as one or more `<category>` elements and add them
    /// session-locally. Returns `false` (silently) on invalid content.
    async fn learn(&mut self, xml: &str) -> bool;

    /// As `learn`, but KB-scoped and persisted to the learnf file.
    async fn learnf(&mut self, xml: &str) -> bool;

    /// Remove session-local categories matching the pattern description.
    async fn unlearn(&mut self, pattern_xml: &str) -> bool;

    /// Remove KB categories matching the pattern description.
    async fn unlearnf(&mut self, pattern_xml: &str) -> bool;

    /// `<uniq>` triple store: assert `(subj, pred, obj)`.
    async fn uniq_assert(&mut self, subj: &str, pred: &str, obj: &str);

    /// `<uniq>` triple store: query `(subj, pred)` for its object.
    async fn uniq_query(&mut self, subj: &str, pred: &str) -> Option<String>;
}

/// Injectable randomness for `<random>`, per §9 ("accept an injectable RNG
/// seeded per-session or per-request; tests must be able to fix the seed").
pub trait RandomSource: Send {
    /// Returns an index in `0..n`. Called only with `n > 0`.
    fn choose(&mut self, n: usize) -> usize;
}

/// `rand`-backed production source.
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn choose(&mut self, n: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..n)
    }
}

/// Deterministic source for tests: always returns a fixed index (clamped).
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn choose(&mut self, n: usize) -> usize {
        self.0.min(n.saturating_sub(1))
    }
}

/// Manufactures a fresh [`RandomSource`] per top-level request/`srai`
/// recursion. Needed because `EvalContext` holds `rng` and `host` as two
/// separate `&mut dyn` borrows of the same owning struct (`golem-eval`'s
/// evaluator); a factory lets that struct hand out a new boxed source
/// on demand instead of trying to alias one long-lived `&mut` across both.
pub trait RandomSourceFactory: Send + Sync {
    fn make(&self) -> Box<dyn RandomSource>;
}

pub struct ThreadRandomFactory;

impl RandomSourceFactory for ThreadRandomFactory {
    fn make(&self) -> Box<dyn RandomSource> {
        Box::new(ThreadRandom)
    }
}

/// Test factory: every manufactured source is fixed to the same index.
pub struct FixedRandomFactory(pub usize);

impl RandomSourceFactory for FixedRandomFactory {
    fn make(&self) -> Box<dyn RandomSource> {
        Box::new(FixedRandom(self.0))
    }
}

/// Per-evaluation state threaded through the tree walk (§4.3, §9).
///
/// `session` is a shared handle, not an owned value: the caller
/// (`golem-eval`) checks a `Session` out of its `SessionStore` guard once
/// per request and clones the `Arc` into every nested `srai` context, so a
/// mutation made inside a recursive `srai` call is immediately visible to
/// the template that triggered it, and to any sibling tag evaluated after
/// it returns. Locks are held only long enough to read or write a single
/// field — never across an `.await` that could re-enter `srai`.
pub struct EvalContext<'a> {
    pub session: SessionHandle,
    pub wildcards: Wildcards,
    /// The `var`-scoped local frame, pushed conceptually at the root
    /// `<template>` and at each `<srai>` entry (§9) — realized here as one
    /// frame per `EvalContext`, since every `srai` constructs a fresh
    /// context for its own template evaluation.
    pub locals: HashMap<String, String>,
    pub kb: &'a KnowledgeBase,
    pub host: &'a mut (dyn TemplateHost + 'a),
    pub rng: &'a mut (dyn RandomSource + 'a),
    pub now: chrono::DateTime<chrono::Utc>,
    /// Recoverable-error trace for `RespondVerbose.debug_trace` (§7).
    pub warnings: Vec<String>,
}

impl<'a> EvalContext<'a> {
    /// Scope-chain read for `<get name="v"/>`: session → KB global → bot
    /// property (§9: `name` addresses the session, not the local frame).
    pub async fn get_named(&self, name: &str) -> Option<String> {
        let from_session = self.session.lock().await.get_var(name);
        from_session.or_else(|| self.kb.get_global(name)).or_else(|| self.kb.get_property(name))
    }

    /// Scope-chain read for `<get var="v"/>`: local frame first, then the
    /// same chain as `get_named` (§3, §9).
    pub async fn get_var_scoped(&self, name: &str) -> Option<String> {
        if let Some(value) = self.locals.get(&name.to_uppercase()) {
            return Some(value.clone());
        }
        self.get_named(name).await
    }

    pub async fn set_named(&mut self, name: &str, value: impl Into<String>) {
        self.session.lock().await.set_var(name, value);
    }

    pub fn set_var_scoped(&mut self, name: &str, value: impl Into<String>) {
        self.locals.insert(name.to_uppercase(), value.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "template evaluation warning");
        self.warnings.push(message);
    }
}
