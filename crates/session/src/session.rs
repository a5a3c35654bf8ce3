use std::collections::{HashMap, VecDeque};

use golem_kb::Category;

use crate::collections::Collections;

/// Default history bound (§3 Session invariant): oldest entries evicted
/// FIFO once a history exceeds this length.
pub const DEFAULT_HISTORY_BOUND: usize = 16;

/// Per-user conversational state (§3 Session, §4.4 SessionStore).
///
/// A `Session` is mutated only by its owning request; callers are expected
/// to hold the session's lock (see [`crate::store::SessionStore`]) for the
/// duration of one `Respond` call, including any `srai` recursion.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    vars: HashMap<String, String>,
    topic: String,
    request_history: VecDeque<String>,
    response_history: VecDeque<String>,
    that_history: VecDeque<String>,
    /// Categories added via `<learn>` (session-scoped, lost with the
    /// session; `<learnf>` instead writes to the shared knowledge base).
    pub local_categories: Vec<Category>,
    history_bound: usize,
    pub collections: Collections,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: chrono::Utc::now(),
            vars: HashMap::new(),
            topic: "*".to_string(),
            request_history: VecDeque::new(),
            response_history: VecDeque::new(),
            that_history: VecDeque::new(),
            local_categories: Vec::new(),
            history_bound: DEFAULT_HISTORY_BOUND,
            collections: Collections::new(),
        }
    }

    pub fn with_history_bound(mut self, bound: usize) -> Self {
        self.history_bound = bound.max(1);
        self
    }

    // ── Variables ────────────────────────────────────────────────────────

    /// `TOPIC` is special-cased to the dedicated `topic` field rather than
    /// the general var map, so `<set name="topic">X</set>` (the standard
    /// AIML convention) and `SetTopic`/`GetTopic` always agree — there is
    /// exactly one topic, not two independently-settable copies of it.
    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name.eq_ignore_ascii_case("topic") {
            self.set_topic(value);
        } else {
            self.vars.insert(name.to_uppercase(), value);
        }
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("topic") {
            return Some(self.topic.clone());
        }
        self.vars.get(&name.to_uppercase()).cloned()
    }

    pub fn clear_vars(&mut self) {
        self.vars.clear();
    }

    // ── Topic ────────────────────────────────────────────────────────────

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        self.topic = if topic.trim().is_empty() { "*".to_string() } else { topic.to_uppercase() };
    }

    pub fn get_topic(&self) -> &str {
        &self.topic
    }

    // ── History ──────────────────────────────────────────────────────────

    pub fn record_request(&mut self, utterance: impl Into<String>) {
        push_bounded(&mut self.request_history, utterance.into(), self.history_bound);
    }

    pub fn record_response(&mut self, text: impl Into<String>) {
        let text = text.into();
        for sentence in split_sentences(&text) {
            push_bounded(&mut self.that_history, sentence, self.history_bound);
        }
        push_bounded(&mut self.response_history, text, self.history_bound);
    }

    /// The most recent non-empty sentence of the last bot response,
    /// uppercased and normalized, for use as the next `Match` call's `that`
    /// context (§4.4). Defaults to `*` when there is no prior response.
    pub fn that(&self) -> String {
        match self.that_history.back() {
            Some(s) => golem_kb::pattern::normalize_input(s),
            None => "*".to_string(),
        }
    }

    /// `<input/>`/`<request index="n"/>`: the n-th (1-based) previous user
    /// utterance, most recent first, excluding the input currently being
    /// processed (which the caller records only after evaluation). Empty on
    /// out-of-range.
    pub fn request(&self, index: usize) -> Option<&str> {
        nth_from_back(&self.request_history, index)
    }

    /// `<response index="n"/>`/`<that index="n"/>`: the n-th previous bot
    /// output.
    pub fn response(&self, index: usize) -> Option<&str> {
        nth_from_back(&self.response_history, index)
    }
}

fn nth_from_back(history: &VecDeque<String>, index: usize) -> Option<&str> {
    if index == 0 {
        return None;
    }
    history.iter().rev().nth(index - 1).map(|s| s.as_str())
}

fn push_bounded(history: &mut VecDeque<String>, value: String, bound: usize) {
    history.push_back(value);
    while history.len() > bound {
        history.pop_front();
    }
}

/// A serializable read-only view of a session, used by `RespondVerbose`'s
/// debug trace and the CLI's `/session` introspection command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub topic: String,
    pub vars: HashMap<String, String>,
    pub request_history: Vec<String>,
    pub response_history: Vec<String>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            topic: self.topic.clone(),
            vars: self.vars.clone(),
            request_history: self.request_history.iter().cloned().collect(),
            response_history: self.response_history.iter().cloned().collect(),
        }
    }

    pub fn snapshot_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

/// Split bot output into sentences on `.`/`!`/`?`, trimming whitespace and
/// dropping empties. The punctuation itself is dropped (§4.4/§9: the
/// sentence-splitter used for `that` is underspecified in source; this
/// fixes split-on-`.!?`).
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
