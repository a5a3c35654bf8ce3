//! `<list>`/`<array>`/`<map>`/`<set>` template tags (§4.3 "Collections").
//! Each operates on a session-scoped named collection (`golem_session::Collections`).
//! Invalid indices and unknown operations yield empty, never an error.

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("list", Box::new(ListHandler));
    reg.register("array", Box::new(ArrayHandler));
    reg.register("map", Box::new(MapHandler));
    // `<set>` itself is registered by `vars::register` (it must also cover
    // plain `<set name="v">X</set>` variable assignment); `vars::SetHandler`
    // dispatches here via [`eval_set_collection`] whenever an `operation`
    // attribute is present.
}

fn op_of(node: &TemplateNode, default: &str) -> String {
    node.attr("operation").unwrap_or(default).to_lowercase()
}

fn index_of(node: &TemplateNode) -> Option<usize> {
    node.attr("index").and_then(|s| s.trim().parse().ok())
}

struct ListHandler;

#[async_trait]
impl TagHandler for ListHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let Some(name) = node.attr("name") else { return String::new() };
        let op = op_of(node, "get");
        let content = eval_children(node, registry, ctx).await;
        let mut session = ctx.session.lock().await;
        let c = &mut session.collections;
        match op.as_str() {
            "add" => {
                c.list_add(name, content);
                String::new()
            }
            "insert" => {
                let Some(index) = index_of(node) else { return String::new() };
                c.list_insert(name, index, content);
                String::new()
            }
            "remove" => {
                let Some(index) = index_of(node) else { return String::new() };
                c.list_remove(name, index).unwrap_or_default()
            }
            "clear" => {
                c.list_clear(name);
                String::new()
            }
            "size" => c.list_size(name).to_string(),
            "contains" => c.list_contains(name, &content).to_string(),
            "get" => match index_of(node) {
                Some(index) => c.list_get(name, index).unwrap_or_default().to_string(),
                None => c.list_all(name),
            },
            _ => c.list_all(name),
        }
    }
}

struct ArrayHandler;

#[async_trait]
impl TagHandler for ArrayHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let Some(name) = node.attr("name") else { return String::new() };
        let op = op_of(node, "get");
        let content = eval_children(node, registry, ctx).await;
        let mut session = ctx.session.lock().await;
        let c = &mut session.collections;
        match op.as_str() {
            "add" => {
                c.array_add(name, content);
                String::new()
            }
            "insert" => {
                let Some(index) = index_of(node) else { return String::new() };
                c.array_insert(name, index, content);
                String::new()
            }
            "remove" => {
                let Some(index) = index_of(node) else { return String::new() };
                c.array_remove(name, index).unwrap_or_default()
            }
            "set" => {
                let Some(index) = index_of(node) else { return String::new() };
                c.array_set(name, index, content);
                String::new()
            }
            "resize" => {
                let Some(new_len) = index_of(node) else { return String::new() };
                c.array_resize(name, new_len);
                String::new()
            }
            "clear" => {
                c.array_clear(name);
                String::new()
            }
            "size" => c.array_size(name).to_string(),
            "contains" => c.array_contains(name, &content).to_string(),
            "get" => match index_of(node) {
                Some(index) => c.array_get(name, index).unwrap_or_default().to_string(),
                None => c.array_all(name),
            },
            _ => c.array_all(name),
        }
    }
}

struct MapHandler;

#[async_trait]
impl TagHandler for MapHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let Some(name) = node.attr("name") else { return String::new() };
        let op = op_of(node, "list");
        let content = eval_children(node, registry, ctx).await;
        let mut session = ctx.session.lock().await;
        let c = &mut session.collections;
        match op.as_str() {
            "set" => {
                let Some(key) = node.attr("key") else { return String::new() };
                c.map_set(name, key, content);
                String::new()
            }
            "get" => match node.attr("key") {
                Some(key) => c.map_get(name, key).unwrap_or_default().to_string(),
                None => c.map_list(name),
            },
            "remove" => {
                let Some(key) = node.attr("key") else { return String::new() };
                c.map_remove(name, key).unwrap_or_default()
            }
            "clear" => {
                c.map_clear(name);
                String::new()
            }
            "size" => c.map_size(name).to_string(),
            "contains" => match node.attr("key") {
                Some(key) => c.map_contains(name, key).to_string(),
                None => "false".to_string(),
            },
            "keys" => c.map_keys(name),
            "values" => c.map_values(name),
            _ => c.map_list(name),
        }
    }
}

/// `<set>` as a collection tag (distinct from a `<set>NAME</set>` pattern
/// reference, which the matcher handles separately and never reaches here,
/// and from plain `<set name="v">X</set>` variable assignment, which
/// `vars::SetHandler` keeps handling itself). Called only when the `<set>`
/// element carries an `operation` attribute — see `vars::SetHandler`.
pub(crate) async fn eval_set_collection(node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
    let Some(name) = node.attr("name") else { return String::new() };
    let op = op_of(node, "list");
    let content = eval_children(node, registry, ctx).await;
    let mut session = ctx.session.lock().await;
    let c = &mut session.collections;
    match op.as_str() {
        "add" => {
            c.set_add(name, &content);
            String::new()
        }
        "remove" => {
            c.set_remove(name, &content);
            String::new()
        }
        "contains" => c.set_contains(name, &content).to_string(),
        "size" => c.set_size(name).to_string(),
        "clear" => {
            c.set_clear(name);
            String::new()
        }
        _ => c.set_all(name),
    }
}
