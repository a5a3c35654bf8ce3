//! [`EngineHost`]: the `golem-eval` implementation of `golem-template`'s
//! `TemplateHost` boundary (§4.3, §9). Owns everything a recursive `srai`
//! needs — the shared knowledge base and match tree, the sraix dispatcher,
//! and the session handle — so `golem-template` itself never has to depend
//! on `golem-match`/`golem-sraix`/`golem-session` directly.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use golem_kb::{parse_learned_categories, CategoryOrigin, KnowledgeBase};
use golem_match::MatchTree;
use golem_sraix::{PlaceholderSource, SraixDispatcher};
use golem_template::{
    eval_template, EvalContext, RandomSourceFactory, SessionHandle, TagRegistry, TemplateHost, Wildcards,
};
use tokio::sync::RwLock;
use tracing::warn;

use crate::set_lookup::KbSetLookup;

/// A `golem-session` var lookup exposed as a [`PlaceholderSource`] for
/// `<sraix>` placeholder substitution, without `golem-sraix` depending on
/// `golem-session` directly.
struct SessionPlaceholders<'a> {
    session: &'a golem_session::Session,
    kb: &'a KnowledgeBase,
}

impl PlaceholderSource for SessionPlaceholders<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.session.get_var(name).or_else(|| self.kb.get_global(name)).or_else(|| self.kb.get_property(name))
    }
}

pub struct EngineHost {
    pub(crate) kb: Arc<RwLock<KnowledgeBase>>,
    pub(crate) match_tree: Arc<RwLock<MatchTree>>,
    pub(crate) sraix: Arc<SraixDispatcher>,
    pub(crate) registry: Arc<TagRegistry>,
    pub(crate) rng_factory: Arc<dyn RandomSourceFactory>,
    pub(crate) session: SessionHandle,
    pub(crate) recursion_limit: u32,
    pub(crate) learnf_path: Option<PathBuf>,
    pub(crate) depth: u32,
}

impl EngineHost {
    /// A child host for a nested `srai`, sharing every collaborator but with
    /// the recursion counter advanced by one.
    fn child(&self) -> Self {
        Self {
            kb: self.kb.clone(),
            match_tree: self.match_tree.clone(),
            sraix: self.sraix.clone(),
            registry: self.registry.clone(),
            rng_factory: self.rng_factory.clone(),
            session: self.session.clone(),
            recursion_limit: self.recursion_limit,
            learnf_path: self.learnf_path.clone(),
            depth: self.depth + 1,
        }
    }

    async fn rebuild_match_tree(&self) {
        let kb = self.kb.read().await;
        let tree = MatchTree::build(&kb.categories);
        drop(kb);
        *self.match_tree.write().await = tree;
    }

    async fn persist_learnf(&self, categories: &[golem_kb::Category]) {
        let Some(path) = &self.learnf_path else { return };
        let session_id = self.session.lock().await.id.clone();
        let timestamp = chrono::Utc::now().to_rfc3339();
        let mut xml = format!("<!-- learnf: {session_id}, {timestamp} -->\n");
        for cat in categories {
            xml.push_str(&golem_kb::category_to_xml(cat));
        }
        if let Err(err) = append_to_file(path, &xml) {
            warn!(path = %path.display(), error = %err, "failed to persist learnf categories");
        }
    }
}

fn append_to_file(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(contents.as_bytes())
}

#[async_trait]
impl TemplateHost for EngineHost {
    async fn srai(&mut self, input: &str) -> String {
        if self.depth >= self.recursion_limit {
            warn!(depth = self.depth, "srai recursion limit reached");
            return String::new();
        }

        let (input_norm, input_raw) = golem_kb::pattern::tokenize_preserving_case(input);
        let (that_tokens, topic_tokens, local_categories) = {
            let session = self.session.lock().await;
            (
                golem_kb::pattern::tokenize(&session.that()),
                golem_kb::pattern::tokenize(session.get_topic()),
                session.local_categories.clone(),
            )
        };

        let kb = self.kb.read().await;
        let sets = KbSetLookup(&kb);

        let outcome = if !local_categories.is_empty() {
            let local_tree = MatchTree::build(&local_categories);
            local_tree
                .find(&input_norm, &input_raw, &that_tokens, &that_tokens, &topic_tokens, &topic_tokens, &sets)
        } else {
            None
        };
        let outcome = match outcome {
            Some(o) => Some(o),
            None => {
                let tree = self.match_tree.read().await;
                tree.find(&input_norm, &input_raw, &that_tokens, &that_tokens, &topic_tokens, &topic_tokens, &sets)
            }
        };

        let Some(outcome) = outcome else {
            return String::new();
        };

        let wildcards = Wildcards {
            pattern: outcome.captures.pattern,
            that: outcome.captures.that,
            topic: outcome.captures.topic,
        };

        let mut child_host = self.child();
        let mut rng = self.rng_factory.make();
        let mut ctx = EvalContext {
            session: self.session.clone(),
            wildcards,
            locals: Default::default(),
            kb: &kb,
            host: &mut child_host,
            rng: rng.as_mut(),
            now: chrono::Utc::now(),
            warnings: Vec::new(),
        };
        eval_template(&outcome.category.template, &self.registry, &mut ctx).await
    }

    async fn sraix(&mut self, service: &str, hint: &str, input: &str, tag_default: Option<&str>) -> String {
        let wildcards: Vec<String> = Vec::new();
        let kb = self.kb.read().await;
        let session = self.session.lock().await;
        let source = SessionPlaceholders { session: &session, kb: &kb };
        self.sraix.dispatch(service, hint, input, &wildcards, tag_default, &source).await
    }

    async fn learn(&mut self, xml: &str) -> bool {
        match parse_learned_categories(xml, CategoryOrigin::Learn) {
            Ok(cats) => {
                let mut session = self.session.lock().await;
                session.local_categories.extend(cats);
                true
            }
            Err(err) => {
                warn!(error = %err, "learn: invalid category content");
                false
            }
        }
    }

    async fn learnf(&mut self, xml: &str) -> bool {
        match parse_learned_categories(xml, CategoryOrigin::LearnF) {
            Ok(cats) => {
                {
                    let mut kb = self.kb.write().await;
                    for cat in &cats {
                        kb.add_category(cat.clone());
                    }
                }
                self.persist_learnf(&cats).await;
                self.rebuild_match_tree().await;
                true
            }
            Err(err) => {
                warn!(error = %err, "learnf: invalid category content");
                false
            }
        }
    }

    async fn unlearn(&mut self, pattern_xml: &str) -> bool {
        match parse_learned_categories(pattern_xml, CategoryOrigin::Learn) {
            Ok(cats) => {
                let mut session = self.session.lock().await;
                let before = session.local_categories.len();
                for cat in &cats {
                    session.local_categories.retain(|c| !(c.pattern == cat.pattern && c.that == cat.that && c.topic == cat.topic));
                }
                session.local_categories.len() < before
            }
            Err(err) => {
                warn!(error = %err, "unlearn: invalid category description");
                false
            }
        }
    }

    async fn unlearnf(&mut self, pattern_xml: &str) -> bool {
        match parse_learned_categories(pattern_xml, CategoryOrigin::LearnF) {
            Ok(cats) => {
                let removed = {
                    let mut kb = self.kb.write().await;
                    cats.iter().map(|cat| kb.remove_category(&cat.pattern, &cat.that, &cat.topic)).any(|r| r)
                };
                if removed {
                    self.rebuild_match_tree().await;
                }
                removed
            }
            Err(err) => {
                warn!(error = %err, "unlearnf: invalid category description");
                false
            }
        }
    }

    async fn uniq_assert(&mut self, subj: &str, pred: &str, obj: &str) {
        self.kb.write().await.assert_triple(subj, pred, obj);
    }

    async fn uniq_query(&mut self, subj: &str, pred: &str) -> Option<String> {
        self.kb.read().await.query_triple(subj, pred)
    }
}
