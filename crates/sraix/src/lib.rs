//! External-service dispatch for `<sraix>` (§4.5): resolves placeholders
//! from the tag's `hint` attribute and the caller's scope, sends the
//! request over a pluggable [`SraixTransport`], and extracts the answer from
//! the response.

mod dispatcher;
mod error;
mod placeholder;
mod transport;

pub use dispatcher::SraixDispatcher;
pub use error::SraixError;
pub use placeholder::{parse_hint, substitute, PlaceholderSource};
pub use transport::{ReqwestTransport, SraixRequest, SraixResponse, SraixTransport};
