//! Text processors that apply to their fully-evaluated inner text (§4.3).

use async_trait::async_trait;
use golem_kb::TemplateNode;

use crate::context::EvalContext;
use crate::eval::eval_children;
use crate::registry::{TagHandler, TagRegistry};

pub fn register(reg: &mut TagRegistry) {
    reg.register("uppercase", Box::new(Processor(uppercase)));
    reg.register("lowercase", Box::new(Processor(lowercase)));
    reg.register("formal", Box::new(Processor(formal)));
    reg.register("capitalize", Box::new(Processor(capitalize)));
    reg.register("sentence", Box::new(Processor(sentence)));
    reg.register("word", Box::new(Processor(word)));
    reg.register("explode", Box::new(Processor(explode)));
    reg.register("reverse", Box::new(Processor(reverse)));
    reg.register("acronym", Box::new(Processor(acronym)));
    reg.register("trim", Box::new(Processor(trim)));
    reg.register("pluralize", Box::new(Processor(pluralize)));
    reg.register("unique", Box::new(Processor(unique)));
    reg.register("normalize", Box::new(TableProcessor("normal")));
    reg.register("denormalize", Box::new(TableProcessor("denormal")));
    reg.register("person", Box::new(TableProcessor("person")));
    reg.register("person2", Box::new(TableProcessor("person2")));
    reg.register("gender", Box::new(TableProcessor("gender")));
    reg.register("shuffle", Box::new(ShuffleHandler));
}

type ProcFn = fn(&str) -> String;

struct Processor(ProcFn);

#[async_trait]
impl TagHandler for Processor {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        (self.0)(&text)
    }
}

fn uppercase(s: &str) -> String {
    s.to_uppercase()
}

fn lowercase(s: &str) -> String {
    s.to_lowercase()
}

fn formal(s: &str) -> String {
    s.split_whitespace().map(title_case_word).collect::<Vec<_>>().join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn sentence(s: &str) -> String {
    let mut out = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if capitalize_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
        if matches!(c, '.' | '!' | '?') {
            capitalize_next = true;
        }
    }
    out
}

fn word(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn explode(s: &str) -> String {
    s.chars().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

fn acronym(s: &str) -> String {
    s.split_whitespace()
        .filter_map(|w| w.chars().next())
        .map(|c| c.to_uppercase().to_string())
        .collect::<Vec<_>>()
        .join("")
}

fn trim(s: &str) -> String {
    s.trim().to_string()
}

/// Naive English pluralization (ES after s/x/z/ch/sh, IES replacing a
/// trailing consonant Y, S otherwise) — no irregular-plural table.
fn pluralize(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let lower = w.to_lowercase();
            if lower.ends_with(['s', 'x', 'z']) || lower.ends_with("ch") || lower.ends_with("sh") {
                format!("{w}es")
            } else if lower.ends_with('y') && !lower.ends_with(['a', 'e', 'i', 'o', 'u']) && lower.len() > 1 {
                let consonant_before_y = !"aeiou".contains(lower.chars().rev().nth(1).unwrap_or('a'));
                if consonant_before_y {
                    format!("{}ies", &w[..w.len() - 1])
                } else {
                    format!("{w}s")
                }
            } else {
                format!("{w}s")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn unique(s: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    s.split_whitespace()
        .filter(|w| seen.insert(w.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `<normalize>`/`<denormalize>`/`<person>`/`<person2>`/`<gender>`: apply a
/// KB substitution table (§4.3) word-by-word, leaving unmapped words as-is.
struct TableProcessor(&'static str);

#[async_trait]
impl TagHandler for TableProcessor {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        text.split_whitespace()
            .map(|w| ctx.kb.lookup_map(self.0, w).unwrap_or_else(|| w.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct ShuffleHandler;

#[async_trait]
impl TagHandler for ShuffleHandler {
    async fn eval(&self, node: &TemplateNode, registry: &TagRegistry, ctx: &mut EvalContext<'_>) -> String {
        let text = eval_children(node, registry, ctx).await;
        let mut words: Vec<&str> = text.split_whitespace().collect();
        // Fisher-Yates using the injectable RandomSource, so tests can fix
        // the outcome (§9 "Concurrency of `<random>`" — the same
        // injectability applies to any other random template behavior).
        for i in (1..words.len()).rev() {
            let j = ctx.rng.choose(i + 1);
            words.swap(i, j);
        }
        words.join(" ")
    }
}
