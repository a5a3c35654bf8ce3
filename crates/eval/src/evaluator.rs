//! Top-level "match one utterance, evaluate its template" entry point used
//! by `golem-engine`'s `Respond`/`RespondVerbose` (§4.2, §4.3, §6).

use std::path::PathBuf;
use std::sync::Arc;

use golem_kb::KnowledgeBase;
use golem_match::MatchTree;
use golem_sraix::SraixDispatcher;
use golem_template::{
    default_registry, eval_template, EvalContext, RandomSourceFactory, SessionHandle, TagRegistry,
    ThreadRandomFactory, Wildcards,
};
use tokio::sync::RwLock;

use crate::host::EngineHost;
use crate::set_lookup::KbSetLookup;

/// Everything a caller might want out of one evaluation cycle: the rendered
/// text plus enough provenance for `RespondVerbose`'s debug trace (§7).
#[derive(Debug, Clone, Default)]
pub struct EvalOutcome {
    pub text: String,
    pub matched_pattern: Option<String>,
    pub matched_that: Option<String>,
    pub matched_topic: Option<String>,
    pub wildcards: Wildcards,
    pub warnings: Vec<String>,
}

pub struct Evaluator {
    registry: Arc<TagRegistry>,
    rng_factory: Arc<dyn RandomSourceFactory>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self { registry: Arc::new(default_registry()), rng_factory: Arc::new(ThreadRandomFactory) }
    }

    pub fn with_rng_factory(rng_factory: Arc<dyn RandomSourceFactory>) -> Self {
        Self { registry: Arc::new(default_registry()), rng_factory }
    }

    /// Match `input` against the session's local categories first, then the
    /// shared knowledge base, and evaluate the winning template. No match
    /// yields an empty-text outcome (the caller supplies the fallback
    /// message, per §6/§7).
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate(
        &self,
        input: &str,
        kb: Arc<RwLock<KnowledgeBase>>,
        match_tree: Arc<RwLock<MatchTree>>,
        sraix: Arc<SraixDispatcher>,
        session: SessionHandle,
        recursion_limit: u32,
        learnf_path: Option<PathBuf>,
    ) -> EvalOutcome {
        let (input_norm, input_raw) = golem_kb::pattern::tokenize_preserving_case(input);
        let (that_tokens, topic_tokens, local_categories) = {
            let s = session.lock().await;
            (golem_kb::pattern::tokenize(&s.that()), golem_kb::pattern::tokenize(s.get_topic()), s.local_categories.clone())
        };

        let kb_guard = kb.read().await;
        let sets = KbSetLookup(&kb_guard);

        let outcome = if !local_categories.is_empty() {
            MatchTree::build(&local_categories).find(
                &input_norm,
                &input_raw,
                &that_tokens,
                &that_tokens,
                &topic_tokens,
                &topic_tokens,
                &sets,
            )
        } else {
            None
        };
        let outcome = match outcome {
            Some(o) => Some(o),
            None => {
                let tree = match_tree.read().await;
                tree.find(&input_norm, &input_raw, &that_tokens, &that_tokens, &topic_tokens, &topic_tokens, &sets)
            }
        };

        let Some(outcome) = outcome else {
            return EvalOutcome::default();
        };

        let matched_pattern = Some(outcome.matched_pattern.clone());
        let matched_that = Some(outcome.matched_that.clone());
        let matched_topic = Some(outcome.matched_topic.clone());
        let wildcards = Wildcards {
            pattern: outcome.captures.pattern,
            that: outcome.captures.that,
            topic: outcome.captures.topic,
        };
        let wildcards_out = wildcards.clone();

        let mut host = EngineHost {
            kb: kb.clone(),
            match_tree: match_tree.clone(),
            sraix,
            registry: self.registry.clone(),
            rng_factory: self.rng_factory.clone(),
            session: session.clone(),
            recursion_limit,
            learnf_path,
            depth: 0,
        };
        let mut rng = self.rng_factory.make();
        let mut ctx = EvalContext {
            session: session.clone(),
            wildcards,
            locals: Default::default(),
            kb: &kb_guard,
            host: &mut host,
            rng: rng.as_mut(),
            now: chrono::Utc::now(),
            warnings: Vec::new(),
        };
        let text = eval_template(&outcome.category.template, &self.registry, &mut ctx).await;
        let warnings = std::mem::take(&mut ctx.warnings);

        EvalOutcome { text, matched_pattern, matched_that, matched_topic, wildcards: wildcards_out, warnings }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golem_kb::{Category, TemplateNode};
    use golem_session::Session;
    use golem_sraix::{ReqwestTransport, SraixDispatcher};
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn tag(name: &str, children: Vec<TemplateNode>) -> TemplateNode {
        TemplateNode::Tag { name: name.to_string(), attrs: Default::default(), children }
    }

    fn text(s: &str) -> TemplateNode {
        TemplateNode::Text(s.to_string())
    }

    fn template(root: Vec<TemplateNode>) -> TemplateNode {
        tag("template", root)
    }

    fn no_op_sraix() -> Arc<SraixDispatcher> {
        Arc::new(SraixDispatcher::new(
            Default::default(),
            Arc::new(ReqwestTransport::new()),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn evaluates_matched_category_template() {
        let mut kb = KnowledgeBase::new();
        kb.add_category(Category::new("HELLO", template(vec![text("Hi!")])));
        let kb = Arc::new(RwLock::new(kb));
        let tree = Arc::new(RwLock::new(MatchTree::build(&kb.read().await.categories)));
        let session: SessionHandle = Arc::new(Mutex::new(Session::new("s1")));

        let evaluator = Evaluator::new();
        let outcome = evaluator.evaluate("hello", kb, tree, no_op_sraix(), session, 50, None).await;
        assert_eq!(outcome.text, "Hi!");
        assert_eq!(outcome.matched_pattern.as_deref(), Some("HELLO"));
    }

    #[tokio::test]
    async fn no_match_yields_empty_outcome() {
        let kb = Arc::new(RwLock::new(KnowledgeBase::new()));
        let tree = Arc::new(RwLock::new(MatchTree::build(&[])));
        let session: SessionHandle = Arc::new(Mutex::new(Session::new("s1")));

        let evaluator = Evaluator::new();
        let outcome = evaluator.evaluate("anything", kb, tree, no_op_sraix(), session, 50, None).await;
        assert_eq!(outcome.text, "");
        assert!(outcome.matched_pattern.is_none());
    }

    #[tokio::test]
    async fn srai_redirects_to_another_category() {
        let mut kb = KnowledgeBase::new();
        kb.add_category(Category::new("HELLO", template(vec![text("Hi!")])));
        kb.add_category(Category::new("HI", template(vec![tag("srai", vec![text("HELLO")])])));
        let kb = Arc::new(RwLock::new(kb));
        let tree = Arc::new(RwLock::new(MatchTree::build(&kb.read().await.categories)));
        let session: SessionHandle = Arc::new(Mutex::new(Session::new("s1")));

        let evaluator = Evaluator::new();
        let outcome = evaluator.evaluate("hi", kb, tree, no_op_sraix(), session, 50, None).await;
        assert_eq!(outcome.text, "Hi!");
    }

    #[tokio::test]
    async fn learn_adds_session_local_category_visible_to_later_input() {
        let kb = Arc::new(RwLock::new(KnowledgeBase::new()));
        let tree = Arc::new(RwLock::new(MatchTree::build(&[])));
        let session: SessionHandle = Arc::new(Mutex::new(Session::new("s1")));
        let evaluator = Evaluator::new();

        let learn_template = template(vec![tag(
            "learn",
            vec![tag(
                "category",
                vec![tag("pattern", vec![text("PING")]), tag("template", vec![text("PONG")])],
            )],
        )]);
        let mut learn_kb = KnowledgeBase::new();
        learn_kb.add_category(Category::new("DO LEARN", learn_template));
        *kb.write().await = learn_kb;
        *tree.write().await = MatchTree::build(&kb.read().await.categories);

        let outcome = evaluator.evaluate("do learn", kb.clone(), tree.clone(), no_op_sraix(), session.clone(), 50, None).await;
        assert_eq!(outcome.text, "");
        assert_eq!(session.lock().await.local_categories.len(), 1);

        let pong = evaluator.evaluate("ping", kb, tree, no_op_sraix(), session, 50, None).await;
        assert_eq!(pong.text, "PONG");
    }
}
