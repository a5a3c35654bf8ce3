//! Orchestrates matching and template evaluation into one request cycle:
//! owns the `TemplateHost` implementation (§9 "isolate behind an
//! interface") so `golem-engine` only has to drive `Evaluator`, never the
//! match tree and template evaluator separately.

mod evaluator;
mod host;
mod set_lookup;

pub use evaluator::{EvalOutcome, Evaluator};
pub use host::EngineHost;
