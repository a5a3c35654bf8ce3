use std::collections::HashMap;

/// Tag names that AIML 1.0-era files may leave unclosed (`<star>` instead of
/// `<star/>`). The parser auto-closes these wherever they appear inside a
/// `<template>`, independent of whether the source used a trailing slash.
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "star", "sr", "that", "get", "bot", "size", "version", "id", "input",
    "request", "response", "first", "rest",
];

pub fn is_self_closing(tag: &str) -> bool {
    SELF_CLOSING_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// A node in a parsed `<template>` AST.
///
/// Unknown tags round-trip as ordinary `Tag` nodes — the evaluator's
/// fallback handler renders them by concatenating their children, so no
/// separate "opaque node" variant is needed.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Text(String),
    Tag {
        name: String,
        attrs: HashMap<String, String>,
        children: Vec<TemplateNode>,
    },
}

impl TemplateNode {
    pub fn tag(name: impl Into<String>, attrs: HashMap<String, String>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::Tag { name: name.into(), attrs, children }
    }

    pub fn empty_template() -> Self {
        TemplateNode::Tag { name: "template".to_string(), attrs: HashMap::new(), children: vec![] }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TemplateNode::Tag { name, .. } => Some(name.as_str()),
            TemplateNode::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            TemplateNode::Tag { attrs, .. } => attrs.get(key).map(|s| s.as_str()),
            TemplateNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::Tag { children, .. } => children.as_slice(),
            TemplateNode::Text(_) => &[],
        }
    }
}
