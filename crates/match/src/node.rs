use std::collections::BTreeMap;

use golem_kb::Category;

use crate::token::{parse_tokens, Token};
use crate::walk::{match_pattern, Captures, MatchOutcome, SetLookup};

/// A single node shared by all three trie levels (pattern, that, topic).
/// Which level a node belongs to is tracked by the caller, not the node
/// itself — the structure (children + wildcard slots + optional
/// continuation) is identical at every level.
#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) dollar: BTreeMap<String, Node>,
    pub(crate) literal: BTreeMap<String, Node>,
    pub(crate) set_children: BTreeMap<String, Node>,
    pub(crate) hash: Option<Box<Node>>,
    pub(crate) under: Option<Box<Node>>,
    pub(crate) caret: Option<Box<Node>>,
    pub(crate) star: Option<Box<Node>>,
    /// Populated at a pattern-leaf (root of the `that` trie) or a that-leaf
    /// (root of the `topic` trie). `None` at a topic-leaf, where `category`
    /// is consulted instead.
    pub(crate) next: Option<Box<Node>>,
    /// Populated only at a topic-leaf: the terminal category.
    pub(crate) category: Option<Category>,
}

fn step<'a>(node: &'a mut Node, tok: &Token) -> &'a mut Node {
    match tok {
        Token::Dollar(w) => node.dollar.entry(w.clone()).or_default(),
        Token::Literal(w) => node.literal.entry(w.clone()).or_default(),
        Token::SetRef(n) => node.set_children.entry(n.clone()).or_default(),
        Token::Hash => node.hash.get_or_insert_with(|| Box::new(Node::default())).as_mut(),
        Token::Under => node.under.get_or_insert_with(|| Box::new(Node::default())).as_mut(),
        Token::Caret => node.caret.get_or_insert_with(|| Box::new(Node::default())).as_mut(),
        Token::Star => node.star.get_or_insert_with(|| Box::new(Node::default())).as_mut(),
    }
}

fn insert_section<'a>(mut node: &'a mut Node, tokens: &[Token]) -> &'a mut Node {
    for tok in tokens {
        node = step(node, tok);
    }
    node
}

/// The three-level match trie over a knowledge base's categories.
#[derive(Debug, Default)]
pub struct MatchTree {
    root: Node,
}

impl MatchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh tree from a full category list. Cheap enough to call
    /// after every knowledge-base mutation rather than maintaining
    /// incremental removal (tries don't shrink cleanly without reference
    /// counting child occupancy, and `learn`/`unlearn` are rare compared to
    /// `Match` calls).
    pub fn build(categories: &[Category]) -> Self {
        let mut tree = Self::new();
        for cat in categories {
            tree.insert(cat);
        }
        tree
    }

    pub fn insert(&mut self, category: &Category) {
        let pattern = parse_tokens(&category.pattern);
        let that = parse_tokens(&category.that);
        let topic = parse_tokens(&category.topic);

        let pattern_leaf = insert_section(&mut self.root, &pattern);
        let that_root = pattern_leaf.next.get_or_insert_with(|| Box::new(Node::default()));
        let that_leaf = insert_section(that_root, &that);
        let topic_root = that_leaf.next.get_or_insert_with(|| Box::new(Node::default()));
        let topic_leaf = insert_section(topic_root, &topic);
        topic_leaf.category = Some(category.clone());
    }

    /// Find the most specific category matching `input`/`that`/`topic`,
    /// already normalized-and-tokenized by the caller (§4.2).
    pub fn find(
        &self,
        input_norm: &[String],
        input_raw: &[String],
        that_norm: &[String],
        that_raw: &[String],
        topic_norm: &[String],
        topic_raw: &[String],
        sets: &dyn SetLookup,
    ) -> Option<MatchOutcome> {
        let mut depth = 0u32;
        let (category, pattern_caps, that_caps, topic_caps) = match_pattern(
            &self.root, input_norm, input_raw, that_norm, that_raw, topic_norm, topic_raw, sets, &mut depth,
        )?;
        Some(MatchOutcome {
            matched_pattern: category.pattern.clone(),
            matched_that: category.that.clone(),
            matched_topic: category.topic.clone(),
            category,
            captures: Captures { pattern: pattern_caps, that: that_caps, topic: topic_caps },
        })
    }
}
