//! A lenient generic XML tree reader used both for `<category>` extraction
//! and for `<template>` AST construction. Unknown elements round-trip with
//! their attributes and children intact.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::GolemKbError;
use crate::template_ast::is_self_closing;

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Text(String),
    Element(XmlElement),
}

impl XmlElement {
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|n| match n {
            XmlNode::Element(e) if e.name.eq_ignore_ascii_case(name) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of all direct text children (used for leaf elements
    /// like `<pattern>`, `<that>`, `<topic>` whose content is plain text
    /// possibly interspersed with `<set>` references).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) if e.name.eq_ignore_ascii_case("set") => {
                    out.push_str(&format!("<set>{}</set>", e.text_content()));
                }
                XmlNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

/// Parse a full XML document into its top-level elements.
pub fn parse_document(reader: impl BufRead) -> Result<Vec<XmlElement>, GolemKbError> {
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.config_mut().trim_text_start = true;
    xml_reader.config_mut().trim_text_end = true;
    xml_reader.config_mut().check_end_names = false;
    xml_reader.config_mut().expand_empty_elements = false;

    let mut buf = Vec::new();
    let nodes = parse_nodes(&mut xml_reader, &mut buf, None, false)?;
    Ok(nodes
        .into_iter()
        .filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
        .collect())
}

fn local_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_string()
}

fn extract_attrs(start: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if let Ok(value) = attr.unescape_value() {
            attrs.insert(key, value.into_owned());
        }
    }
    attrs
}

fn parse_nodes<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    end_tag: Option<&str>,
    in_template: bool,
) -> Result<Vec<XmlNode>, GolemKbError> {
    let mut nodes = Vec::new();
    loop {
        let event = reader
            .read_event_into(buf)
            .map_err(|e| GolemKbError::Parse(e.to_string()))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                let attrs = extract_attrs(&e);
                if in_template && is_self_closing(&name) {
                    // Legacy unclosed self-closing tag: take no children.
                    nodes.push(XmlNode::Element(XmlElement { name, attrs, children: vec![] }));
                } else {
                    let entering_template = in_template || name.eq_ignore_ascii_case("template");
                    let children = parse_nodes(reader, buf, Some(&name), entering_template)?;
                    nodes.push(XmlNode::Element(XmlElement { name, attrs, children }));
                }
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                let attrs = extract_attrs(&e);
                nodes.push(XmlNode::Element(XmlElement { name, attrs, children: vec![] }));
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| GolemKbError::Parse(e.to_string()))?;
                if !text.is_empty() {
                    nodes.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                nodes.push(XmlNode::Text(text));
            }
            Event::End(e) => {
                let name = local_name(&e);
                if end_tag.is_some_and(|expected| expected.eq_ignore_ascii_case(&name)) {
                    return Ok(nodes);
                }
                // Stray/unbalanced close tag (legacy self-closing tag with no
                // explicit close, or generally malformed input) — ignore and
                // keep reading siblings; never abort the whole parse for it.
            }
            Event::Eof => return Ok(nodes),
            _ => {}
        }
        buf.clear();
    }
}
