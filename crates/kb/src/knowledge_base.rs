use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::info;

use crate::aiml::load_aiml;
use crate::aux_files::{name_from_path, parse_map_file, parse_properties_file, parse_set_file};
use crate::category::Category;
use crate::error::GolemKbError;
use crate::pattern::normalize_section;

/// An ordered collection of categories plus the auxiliary tables referenced
/// by templates and patterns: sets, maps, bot properties, and global
/// variables (§3).
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    pub categories: Vec<Category>,
    sets: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, String>>,
    properties: HashMap<String, String>,
    globals: HashMap<String, String>,
    /// `<uniq>` subject/predicate/object triples (§4.3): a flat, process-wide
    /// fact store, distinct from the per-bot properties/globals tables.
    triples: HashMap<(String, String), String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes pattern/that/topic and inserts, replacing any existing
    /// category with the exact same normalized triple (idempotent add).
    pub fn add_category(&mut self, mut cat: Category) {
        cat.pattern = normalize_section(&cat.pattern);
        cat.that = normalize_maybe_empty(&cat.that);
        cat.topic = normalize_maybe_empty(&cat.topic);
        self.categories
            .retain(|c| !(c.pattern == cat.pattern && c.that == cat.that && c.topic == cat.topic));
        self.categories.push(cat);
    }

    pub fn remove_category(&mut self, pattern: &str, that: &str, topic: &str) -> bool {
        let pattern = normalize_section(pattern);
        let that = normalize_maybe_empty(that);
        let topic = normalize_maybe_empty(topic);
        let before = self.categories.len();
        self.categories
            .retain(|c| !(c.pattern == pattern && c.that == that && c.topic == topic));
        self.categories.len() < before
    }

    pub fn lookup_set(&self, name: &str, token: &str) -> bool {
        self.sets
            .get(&name.to_uppercase())
            .is_some_and(|tokens| tokens.iter().any(|t| t.eq_ignore_ascii_case(token)))
    }

    pub fn lookup_map(&self, name: &str, key: &str) -> Option<String> {
        self.maps.get(&name.to_uppercase()).and_then(|m| m.get(&key.to_uppercase()).cloned())
    }

    pub fn get_property(&self, name: &str) -> Option<String> {
        self.properties.get(&name.to_uppercase()).cloned()
    }

    pub fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_uppercase(), value.to_string());
    }

    pub fn get_global(&self, name: &str) -> Option<String> {
        self.globals.get(&name.to_uppercase()).cloned()
    }

    pub fn set_global(&mut self, name: &str, value: &str) {
        self.globals.insert(name.to_uppercase(), value.to_string());
    }

    pub fn assert_triple(&mut self, subj: &str, pred: &str, obj: &str) {
        self.triples.insert((subj.to_uppercase(), pred.to_uppercase()), obj.to_string());
    }

    pub fn query_triple(&self, subj: &str, pred: &str) -> Option<String> {
        self.triples.get(&(subj.to_uppercase(), pred.to_uppercase())).cloned()
    }

    pub fn add_set(&mut self, name: &str, tokens: Vec<String>) {
        let entry = self.sets.entry(name.to_uppercase()).or_default();
        let mut seen: std::collections::HashSet<String> = entry.iter().cloned().collect();
        for tok in tokens {
            let tok = tok.to_uppercase();
            if seen.insert(tok.clone()) {
                entry.push(tok);
            }
        }
    }

    pub fn add_map(&mut self, name: &str, entries: HashMap<String, String>) {
        let entry = self.maps.entry(name.to_uppercase()).or_default();
        for (k, v) in entries {
            entry.insert(k.to_uppercase(), v.to_uppercase());
        }
    }

    /// Concatenate `other`'s categories, union sets (insertion order
    /// preserved, duplicates removed), overlay maps/properties/globals
    /// (later — i.e. `other`'s — values win on conflicting keys).
    pub fn merge(&mut self, other: KnowledgeBase) {
        for cat in other.categories {
            self.add_category(cat);
        }
        for (name, tokens) in other.sets {
            self.add_set(&name, tokens);
        }
        for (name, entries) in other.maps {
            self.add_map(&name, entries);
        }
        for (k, v) in other.properties {
            self.properties.insert(k, v);
        }
        for (k, v) in other.globals {
            self.globals.insert(k, v);
        }
        for (k, v) in other.triples {
            self.triples.insert(k, v);
        }
    }

    // ── File loading ─────────────────────────────────────────────────────

    pub fn load_aiml_reader(&mut self, reader: impl BufRead, origin_label: &str) -> Result<usize, GolemKbError> {
        let cats = load_aiml(reader, origin_label)?;
        let count = cats.len();
        for cat in cats {
            self.add_category(cat);
        }
        info!(origin = origin_label, categories = count, "aiml loaded");
        Ok(count)
    }

    pub fn load_aiml_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(self.load_aiml_reader(reader, &path.display().to_string())?)
    }

    pub fn load_set_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let name = name_from_path(path);
        self.add_set(&name, parse_set_file(&contents));
        Ok(())
    }

    pub fn load_map_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let name = name_from_path(path);
        self.add_map(&name, parse_map_file(&contents));
        Ok(())
    }

    pub fn load_properties_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        for (k, v) in parse_properties_file(&contents) {
            self.set_property(&k, &v);
        }
        Ok(())
    }
}

fn normalize_maybe_empty(section: &str) -> String {
    if section.trim().is_empty() {
        "*".to_string()
    } else {
        normalize_section(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_ast::TemplateNode;

    fn template(text: &str) -> TemplateNode {
        TemplateNode::Tag {
            name: "template".to_string(),
            attrs: HashMap::new(),
            children: vec![TemplateNode::Text(text.to_string())],
        }
    }

    #[test]
    fn add_then_remove_leaves_kb_unchanged() {
        let mut kb = KnowledgeBase::new();
        kb.add_category(Category::new("HELLO", template("Hi!")));
        assert_eq!(kb.categories.len(), 1);
        assert!(kb.remove_category("hello", "", ""));
        assert_eq!(kb.categories.len(), 0);
    }

    #[test]
    fn add_category_is_idempotent_on_exact_triple() {
        let mut kb = KnowledgeBase::new();
        kb.add_category(Category::new("HELLO", template("Hi!")));
        kb.add_category(Category::new("HELLO", template("Hello there!")));
        assert_eq!(kb.categories.len(), 1);
    }

    #[test]
    fn set_and_map_lookups_are_case_insensitive() {
        let mut kb = KnowledgeBase::new();
        kb.add_set("colors", vec!["red".to_string(), "blue".to_string()]);
        assert!(kb.lookup_set("COLORS", "Red"));
        assert!(!kb.lookup_set("colors", "green"));

        let mut entries = HashMap::new();
        entries.insert("he".to_string(), "him".to_string());
        kb.add_map("pronouns", entries);
        assert_eq!(kb.lookup_map("PRONOUNS", "HE").as_deref(), Some("HIM"));
    }

    #[test]
    fn triple_store_round_trips_case_insensitively() {
        let mut kb = KnowledgeBase::new();
        kb.assert_triple("Bob", "likes", "Pizza");
        assert_eq!(kb.query_triple("BOB", "LIKES").as_deref(), Some("Pizza"));
        assert_eq!(kb.query_triple("bob", "hates"), None);
    }

    #[test]
    fn merge_unions_sets_and_overlays_properties() {
        let mut kb1 = KnowledgeBase::new();
        kb1.add_set("colors", vec!["red".to_string()]);
        kb1.set_property("name", "OldBot");

        let mut kb2 = KnowledgeBase::new();
        kb2.add_set("colors", vec!["red".to_string(), "blue".to_string()]);
        kb2.set_property("name", "NewBot");

        kb1.merge(kb2);
        assert_eq!(kb1.get_property("name").as_deref(), Some("NewBot"));
    }
}
