//! Orchestration layer (§2, §9): wires `golem-kb`, `golem-match`,
//! `golem-session`, `golem-sraix`, and `golem-eval` into the public
//! programmatic surface named in §6 — `Respond`/`RespondVerbose`,
//! `LoadAIML`/`LoadSet`/`LoadMap`/`LoadProperties`/`LoadSRAIXConfig`, and
//! session lifecycle management.
//!
//! This is the one crate allowed to hold every lock kind the concurrency
//! model (§5) names: the KB reader/writer lock (via `golem-eval`'s already-
//! locked collaborators) and the `SessionStore` map lock. It never acquires
//! more than one at a time itself — `golem-eval`'s `Evaluator`/`EngineHost`
//! own the nested acquisition order (KB before session) for a single
//! evaluation cycle.

mod engine;

pub use engine::{Engine, VerboseResponse};
