use std::collections::HashMap;

use golem_kb::pattern::{normalize_input, tokenize, tokenize_preserving_case};
use golem_kb::{Category, TemplateNode};

use crate::node::MatchTree;
use crate::walk::SetLookup;

struct Sets(HashMap<String, Vec<String>>);

impl SetLookup for Sets {
    fn contains(&self, set_name: &str, token: &str) -> bool {
        self.0
            .get(&set_name.to_uppercase())
            .is_some_and(|v| v.iter().any(|t| t.eq_ignore_ascii_case(token)))
    }
}

fn no_sets() -> Sets {
    Sets(HashMap::new())
}

fn cat(pattern: &str) -> Category {
    Category::new(
        pattern,
        TemplateNode::Tag { name: "template".into(), attrs: HashMap::new(), children: vec![] },
    )
}

fn find(tree: &MatchTree, input: &str, that: &str, topic: &str, sets: &dyn SetLookup) -> Option<crate::MatchOutcome> {
    let (in_n, in_r) = tokenize_preserving_case(input);
    let (that_n, that_r) = tokenize_preserving_case(that);
    let (topic_n, topic_r) = tokenize_preserving_case(topic);
    tree.find(&in_n, &in_r, &that_n, &that_r, &topic_n, &topic_r, sets)
}

#[test]
fn exact_literal_match() {
    let mut tree = MatchTree::new();
    tree.insert(&cat("HELLO"));
    let outcome = find(&tree, "hello", "", "", &no_sets()).unwrap();
    assert_eq!(outcome.matched_pattern, "HELLO");
    assert!(outcome.captures.pattern.is_empty());
}

#[test]
fn star_captures_preserve_input_casing() {
    let mut tree = MatchTree::new();
    tree.insert(&cat("MY NAME IS *"));
    let outcome = find(&tree, "my name is Alice", "", "", &no_sets()).unwrap();
    assert_eq!(outcome.captures.pattern, vec!["Alice".to_string()]);
}

#[test]
fn literal_beats_wildcard_at_same_position() {
    let mut tree = MatchTree::new();
    tree.insert(&cat("I LIKE *"));
    tree.insert(&cat("I LIKE PIZZA"));
    let outcome = find(&tree, "i like pizza", "", "", &no_sets()).unwrap();
    assert_eq!(outcome.matched_pattern, "I LIKE PIZZA");
    assert!(outcome.captures.pattern.is_empty());
}

#[test]
fn dollar_literal_wins_over_set_and_wildcard() {
    let mut tree = MatchTree::new();
    let mut sets = HashMap::new();
    sets.insert("YESNO".to_string(), vec!["YES".to_string(), "NO".to_string()]);
    tree.insert(&cat("$YES"));
    tree.insert(&cat("<set>YESNO</set>"));
    tree.insert(&cat("*"));
    let outcome = find(&tree, "yes", "", "", &Sets(sets)).unwrap();
    assert_eq!(outcome.matched_pattern, "$YES");
}

#[test]
fn set_beats_hash_and_star() {
    let mut tree = MatchTree::new();
    let mut sets = HashMap::new();
    sets.insert("COLORS".to_string(), vec!["RED".to_string(), "BLUE".to_string()]);
    tree.insert(&cat("I LIKE <set>colors</set>"));
    tree.insert(&cat("I LIKE #"));
    tree.insert(&cat("I LIKE *"));
    let outcome = find(&tree, "i like red", "", "", &Sets(sets)).unwrap();
    assert_eq!(outcome.matched_pattern, "I LIKE <SET>COLORS</SET>");
    assert_eq!(outcome.captures.pattern, vec!["red".to_string()]);
}

#[test]
fn that_context_selects_more_specific_category() {
    let mut tree = MatchTree::new();
    let mut specific = cat("YES");
    specific.that = "DO YOU LIKE PIZZA".to_string();
    let mut generic = cat("YES");
    generic.that = "*".to_string();
    tree.insert(&specific);
    tree.insert(&generic);

    let outcome = find(&tree, "yes", "do you like pizza", "", &no_sets()).unwrap();
    assert_eq!(outcome.matched_that, "DO YOU LIKE PIZZA");

    let outcome2 = find(&tree, "yes", "what is your name", "", &no_sets()).unwrap();
    assert_eq!(outcome2.matched_that, "*");
}

#[test]
fn topic_scoped_category_is_preferred_within_topic() {
    let mut tree = MatchTree::new();
    let mut scoped = cat("HELLO");
    scoped.topic = "GREETING".to_string();
    let generic = cat("HELLO");
    tree.insert(&scoped);
    tree.insert(&generic);

    let outcome = find(&tree, "hello", "", "greeting", &no_sets()).unwrap();
    assert_eq!(outcome.matched_topic, "GREETING");

    let outcome2 = find(&tree, "hello", "", "other", &no_sets()).unwrap();
    assert_eq!(outcome2.matched_topic, "*");
}

#[test]
fn hash_consumes_shortest_span_first() {
    let mut tree = MatchTree::new();
    tree.insert(&cat("# WORLD"));
    let outcome = find(&tree, "hello big world", "", "", &no_sets()).unwrap();
    assert_eq!(outcome.captures.pattern, vec!["hello big".to_string()]);
}

#[test]
fn no_match_returns_none() {
    let mut tree = MatchTree::new();
    tree.insert(&cat("HELLO"));
    assert!(find(&tree, "goodbye", "", "", &no_sets()).is_none());
}

#[test]
fn cyclic_like_deep_pattern_does_not_overflow() {
    let mut tree = MatchTree::new();
    // A pattern with many leading wildcards forces many backtracking
    // attempts; this should resolve (or cleanly fail) well under the
    // recursion bound rather than blow the stack.
    tree.insert(&cat("* * * * * HELLO"));
    let long_input = "a ".repeat(60) + "hello";
    // Many candidate splits; either a bounded answer or None, but must return.
    let _ = find(&tree, &long_input, "", "", &no_sets());
}

#[test]
fn normalize_input_matches_tokenize_contract() {
    assert_eq!(normalize_input(""), "*");
    assert_eq!(tokenize("*"), vec!["*".to_string()]);
}
