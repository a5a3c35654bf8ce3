use thiserror::Error;

/// Load-time and learn-time error taxonomy (§7). These never propagate past
/// a load/learn call boundary with a hard failure for a *single* category —
/// callers collect them as warnings and keep going.
#[derive(Debug, Error)]
pub enum GolemKbError {
    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("category missing pattern or template")]
    MissingRequiredField,

    #[error("learned content lacks a pattern or template")]
    LearnValidation,

    #[error("failed to persist learned category: {0}")]
    Persist(String),
}
