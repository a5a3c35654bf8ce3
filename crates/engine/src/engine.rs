use std::path::{Path, PathBuf};
use std::sync::Arc;

use golem_config::{EngineConfig, SraixConfig};
use golem_eval::Evaluator;
use golem_kb::KnowledgeBase;
use golem_match::MatchTree;
use golem_session::{Session, SessionStore};
use golem_sraix::{ReqwestTransport, SraixDispatcher, SraixTransport};
use golem_template::{RandomSourceFactory, SessionHandle, Wildcards};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The full result of one evaluation cycle, with enough provenance for
/// introspection (§6 `RespondVerbose`, §7 "recoverable errors are
/// observable through `RespondVerbose.debug_trace`").
#[derive(Debug, Clone, Default)]
pub struct VerboseResponse {
    pub text: String,
    pub matched_pattern: Option<String>,
    pub matched_that: Option<String>,
    pub matched_topic: Option<String>,
    pub wildcards: Wildcards,
    pub debug_trace: Vec<String>,
}

/// The top-level engine (§2, §6): owns the knowledge base, its derived match
/// tree, the session store, and the sraix dispatcher, and exposes the
/// public programmatic surface a host (CLI, Telegram bridge, or any other
/// embedder) drives.
///
/// `Respond`/`RespondVerbose` are the sole reentrant entry points (§5): safe
/// to call concurrently for distinct session IDs, serialized per session by
/// `SessionStore`'s per-session lock.
pub struct Engine {
    kb: Arc<RwLock<KnowledgeBase>>,
    match_tree: Arc<RwLock<MatchTree>>,
    sessions: SessionStore,
    sraix: Arc<SraixDispatcher>,
    evaluator: Evaluator,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig, sraix_config: SraixConfig) -> Self {
        Self::with_transport(config, sraix_config, Arc::new(ReqwestTransport::new()))
    }

    /// As [`Self::new`], with an injectable sraix transport (§9 "isolate
    /// behind an interface... so tests can mock without network").
    pub fn with_transport(config: EngineConfig, sraix_config: SraixConfig, transport: Arc<dyn SraixTransport>) -> Self {
        let timeout = std::time::Duration::from_secs(config.sraix_timeout_secs);
        Self {
            kb: Arc::new(RwLock::new(KnowledgeBase::new())),
            match_tree: Arc::new(RwLock::new(MatchTree::new())),
            sessions: SessionStore::new(),
            sraix: Arc::new(SraixDispatcher::new(sraix_config, transport, timeout)),
            evaluator: Evaluator::new(),
            config,
        }
    }

    /// As [`Self::new`], with an injectable `<random>` source factory (§9
    /// "accept an injectable RNG... tests must be able to fix the seed").
    pub fn with_rng_factory(
        config: EngineConfig,
        sraix_config: SraixConfig,
        rng_factory: Arc<dyn RandomSourceFactory>,
    ) -> Self {
        let timeout = std::time::Duration::from_secs(config.sraix_timeout_secs);
        Self {
            kb: Arc::new(RwLock::new(KnowledgeBase::new())),
            match_tree: Arc::new(RwLock::new(MatchTree::new())),
            sessions: SessionStore::new(),
            sraix: Arc::new(SraixDispatcher::new(sraix_config, Arc::new(ReqwestTransport::new()), timeout)),
            evaluator: Evaluator::with_rng_factory(rng_factory),
            config,
        }
    }

    // ── Loading (§6 external interfaces) ─────────────────────────────────

    /// Load a single AIML file and fold its categories into the knowledge
    /// base. Directory/zip discovery is an external collaborator's job
    /// (§1 non-goals) — callers walk a directory themselves and call this
    /// once per file.
    pub async fn load_aiml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let count = self.kb.write().await.load_aiml_file(path)?;
        self.rebuild_index().await;
        Ok(count)
    }

    /// As [`Self::load_aiml_file`], from any `Read` source rather than a
    /// path (§6 `LoadAIML(pathOrReader)`).
    pub async fn load_aiml_reader(&self, reader: impl std::io::BufRead, origin_label: &str) -> anyhow::Result<usize> {
        let count = self.kb.write().await.load_aiml_reader(reader, origin_label)?;
        self.rebuild_index().await;
        Ok(count)
    }

    pub async fn load_set_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.kb.write().await.load_set_file(path)
    }

    pub async fn load_map_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.kb.write().await.load_map_file(path)
    }

    pub async fn load_properties_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.kb.write().await.load_properties_file(path)
    }

    /// Replace the `sraix` service table from a TOML file (§6
    /// `LoadSRAIXConfig`). Takes effect for subsequent `<sraix>` dispatches.
    pub async fn load_sraix_config(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let raw = std::fs::read_to_string(path)?;
        let config: golem_config::SraixConfig = toml::from_str(&raw)?;
        self.sraix.set_config(config).await;
        Ok(())
    }

    /// Rebuild the match tree from the current category list. Called
    /// automatically after every `load_aiml_*` call; exposed so a caller
    /// that mutates the knowledge base through `with_kb_mut` can rebuild
    /// once after a batch of changes instead of per-file.
    pub async fn rebuild_index(&self) {
        let categories = self.kb.read().await.categories.clone();
        let count = categories.len();
        *self.match_tree.write().await = MatchTree::build(&categories);
        info!(categories = count, "match tree rebuilt");
    }

    /// Escape hatch for bulk setup (bot properties, globals, seed sets) that
    /// doesn't go through a file — e.g. the CLI setting `bot` properties
    /// from command-line flags. Does not rebuild the match tree; call
    /// [`Self::rebuild_index`] afterward if categories were added.
    pub async fn with_kb_mut<R>(&self, f: impl FnOnce(&mut KnowledgeBase) -> R) -> R {
        f(&mut self.kb.write().await)
    }

    pub async fn category_count(&self) -> usize {
        self.kb.read().await.categories.len()
    }

    // ── Session lifecycle (§6) ───────────────────────────────────────────

    pub fn create_session(&self, id: &str) -> SessionHandle {
        self.sessions.get_or_create_with_bound(id, self.config.history_bound)
    }

    pub fn destroy_session(&self, id: &str) -> bool {
        self.sessions.destroy(id)
    }

    pub async fn session_snapshot(&self, id: &str) -> Option<golem_session::SessionSnapshot> {
        let handle = self.sessions.get(id)?;
        Some(handle.lock().await.snapshot())
    }

    // ── Respond (§2, §6, §8) ──────────────────────────────────────────────

    /// Primary entry point: match `input` against the knowledge base in the
    /// context of session `session_id`, evaluate the winning template, and
    /// record the exchange in the session's history. Never fails except for
    /// catastrophic conditions (§7 propagation policy) — a no-match or any
    /// recoverable template-evaluation error resolves to the configured
    /// fallback message or an empty-tag contract, not an `Err`.
    pub async fn respond(&self, input: &str, session_id: &str) -> anyhow::Result<String> {
        Ok(self.respond_verbose(input, session_id).await?.text)
    }

    /// As [`Self::respond`], with matched-pattern/wildcard/warning
    /// introspection (§6 `RespondVerbose`).
    pub async fn respond_verbose(&self, input: &str, session_id: &str) -> anyhow::Result<VerboseResponse> {
        let session = self.create_session(session_id);

        let outcome = self
            .evaluator
            .evaluate(
                input,
                self.kb.clone(),
                self.match_tree.clone(),
                self.sraix.clone(),
                session.clone(),
                self.config.srai_recursion_limit,
                Some(PathBuf::from(&self.config.learnf_file)),
            )
            .await;

        let mut debug_trace = outcome.warnings.clone();
        let text = if outcome.matched_pattern.is_none() {
            debug_trace.push("no category matched input/that/topic".to_string());
            self.config.default_no_match_message.clone()
        } else {
            outcome.text
        };

        {
            let mut session = session.lock().await;
            session.record_request(input);
            session.record_response(&text);
        }

        Ok(VerboseResponse {
            text,
            matched_pattern: outcome.matched_pattern,
            matched_that: outcome.matched_that,
            matched_topic: outcome.matched_topic,
            wildcards: outcome.wildcards,
            debug_trace,
        })
    }

    /// Convenience used by hosts that want to seed a session's variables or
    /// topic before the first `respond` call (e.g. the CLI's `--topic` flag).
    pub async fn with_session_mut<R>(&self, session_id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let handle = self.create_session(session_id);
        let mut session = handle.lock().await;
        f(&mut session)
    }
}

impl Default for Engine {
    fn default() -> Self {
        warn!("golem_engine::Engine::default() constructs an empty knowledge base — load AIML content before serving traffic");
        Self::new(EngineConfig::default(), SraixConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use golem_sraix::{SraixError, SraixRequest, SraixResponse};

    struct MockTransport {
        body: String,
    }

    #[async_trait]
    impl SraixTransport for MockTransport {
        async fn send(&self, _request: SraixRequest) -> Result<SraixResponse, SraixError> {
            Ok(SraixResponse { status: 200, body: self.body.clone() })
        }
    }

    fn write_tmp_aiml(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn scenario_1_exact_match_records_history() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "hello.aiml",
            r#"<aiml><category><pattern>HELLO</pattern><template>Hi!</template></category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("hello", "s1").await.unwrap();
        assert_eq!(response, "Hi!");

        let snapshot = engine.session_snapshot("s1").await.unwrap();
        assert_eq!(snapshot.response_history, vec!["Hi!".to_string()]);
    }

    #[tokio::test]
    async fn scenario_2_wildcard_capture_preserves_input_case() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "name.aiml",
            r#"<aiml><category><pattern>MY NAME IS *</pattern><template>Nice to meet you, <star/>!</template></category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("my name is alice", "s2").await.unwrap();
        assert_eq!(response, "Nice to meet you, alice!");
    }

    #[tokio::test]
    async fn scenario_3_srai_reduction() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "srai.aiml",
            r#"<aiml>
                <category><pattern>HI</pattern><template>Hello</template></category>
                <category><pattern>HELLO</pattern><template><srai>HI</srai></template></category>
            </aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("hello", "s3").await.unwrap();
        assert_eq!(response, "Hello");
    }

    #[tokio::test]
    async fn scenario_4_sraix_weather_lookup() {
        let transport = Arc::new(MockTransport { body: r#"{"description":"Sunny"}"#.to_string() });
        let sraix_config = golem_config::SraixConfig {
            services: vec![golem_config::SraixServiceConfig {
                name: "w".to_string(),
                endpoint: "https://api/?q={location}".to_string(),
                response: golem_config::ResponseFormat::Json { path: "description".to_string() },
                ..Default::default()
            }],
        };
        let engine = Engine::with_transport(EngineConfig::default(), sraix_config, transport);
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "weather.aiml",
            r#"<aiml><category><pattern>WEATHER IN *</pattern>
                <template><sraix service="w" hint="{\\*}">weather</sraix></template>
            </category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("weather in boston", "s4").await.unwrap();
        assert_eq!(response, "Sunny");
    }

    #[tokio::test]
    async fn load_sraix_config_replaces_service_table_at_runtime() {
        let transport = Arc::new(MockTransport { body: "bonjour".to_string() });
        let engine = Engine::with_transport(EngineConfig::default(), SraixConfig::default(), transport);
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "greet.aiml",
            r#"<aiml><category><pattern>GREETING</pattern>
                <template><sraix service="greeter">x</sraix></template>
            </category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        // Before loading a config, the service is unknown and sraix falls back to empty.
        let before = engine.respond("greeting", "s4b").await.unwrap();
        assert_eq!(before, "");

        let toml_path = dir.path().join("sraix.toml");
        std::fs::write(
            &toml_path,
            r#"[[services]]
name = "greeter"
endpoint = "https://example.test/greet"
"#,
        )
        .unwrap();
        engine.load_sraix_config(&toml_path).await.unwrap();

        let after = engine.respond("greeting", "s4c").await.unwrap();
        assert_eq!(after, "bonjour");
    }

    #[tokio::test]
    async fn scenario_5_think_sets_variable_visible_to_get() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "think.aiml",
            r#"<aiml><category><pattern>I AM *</pattern>
                <template><think><set name="n"><star/></set></think>Hi <get name="n"/>!</template>
            </category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("i am bob", "s5").await.unwrap();
        assert_eq!(response, "Hi bob!");

        let snapshot = engine.session_snapshot("s5").await.unwrap();
        assert_eq!(snapshot.vars.get("N").map(String::as_str), Some("bob"));
    }

    #[tokio::test]
    async fn scenario_6_condition_on_session_variable() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "mood.aiml",
            r#"<aiml><category><pattern>HOW DO I FEEL</pattern>
                <template><condition name="mood">
                    <li value="happy">:)</li>
                    <li value="sad">:(</li>
                    <li>neutral</li>
                </condition></template>
            </category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        engine.with_session_mut("s6a", |s| s.set_var("mood", "sad")).await;
        assert_eq!(engine.respond("how do i feel", "s6a").await.unwrap(), ":(");

        assert_eq!(engine.respond("how do i feel", "s6b").await.unwrap(), "neutral");
    }

    #[tokio::test]
    async fn no_match_yields_configured_default_message() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let verbose = engine.respond_verbose("anything at all", "s7").await.unwrap();
        assert_eq!(verbose.text, "I don't have any knowledge loaded yet.");
        assert!(verbose.matched_pattern.is_none());
        assert!(verbose.debug_trace.iter().any(|w| w.contains("no category matched")));
    }

    #[tokio::test]
    async fn empty_input_returns_default_message_not_an_error() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let response = engine.respond("", "s8").await.unwrap();
        assert_eq!(response, "I don't have any knowledge loaded yet.");
    }

    #[tokio::test]
    async fn srai_recursion_overflow_yields_empty_not_stack_overflow() {
        let engine = Engine::new(EngineConfig::default(), SraixConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp_aiml(
            &dir,
            "recurse.aiml",
            r#"<aiml><category><pattern>LOOP</pattern><template><srai>LOOP</srai></template></category></aiml>"#,
        );
        engine.load_aiml_file(&path).await.unwrap();

        let response = engine.respond("loop", "s9").await.unwrap();
        assert_eq!(response, "");
    }
}
