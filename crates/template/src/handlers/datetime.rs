//! `<date>`/`<time>`: render `ctx.now` (injectable for deterministic tests,
//! §9) through a strftime-like `format` attribute.

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    // Default formats are ISO-8601 date / 24-hour time (§4.3); callers
    // override with a strftime-like `format` attribute for anything else.
    reg.register("date", Box::new(DateTimeHandler { default_format: "%Y-%m-%d" }));
    reg.register("time", Box::new(DateTimeHandler { default_format: "%H:%M:%S" }));
}

struct DateTimeHandler {
    default_format: &'static str,
}

#[async_trait]
impl TagHandler for DateTimeHandler {
    async fn eval(&self, node: &TemplateNode, _registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let format = node.attr("format").unwrap_or(self.default_format);
        ctx.now.format(format).to_string()
    }
}
