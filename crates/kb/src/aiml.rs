//! AIML file loading: `<aiml version="...">` containing `<category>`
//! children, each with `<pattern>`, optional `<that>`/`<topic>`, and a
//! `<template>`.

use std::io::BufRead;

use tracing::warn;

use crate::category::{Category, CategoryOrigin};
use crate::error::GolemKbError;
use crate::template_ast::TemplateNode;
use crate::xml::{parse_document, XmlElement, XmlNode};

/// Parse an AIML document, skipping malformed categories with a warning
/// rather than aborting the whole load (§7 ParseError policy).
pub fn load_aiml(reader: impl BufRead, origin_label: &str) -> Result<Vec<Category>, GolemKbError> {
    let roots = parse_document(reader)?;
    let mut categories = Vec::new();

    let aiml_roots: Vec<&XmlElement> = roots.iter().filter(|e| e.name.eq_ignore_ascii_case("aiml")).collect();
    let category_sources: Vec<&XmlElement> = if aiml_roots.is_empty() {
        // Tolerate a bare sequence of <category> elements without an <aiml> wrapper.
        roots.iter().filter(|e| e.name.eq_ignore_ascii_case("category")).collect()
    } else {
        aiml_roots
            .iter()
            .flat_map(|root| root.children.iter())
            .filter_map(|n| match n {
                XmlNode::Element(e) if e.name.eq_ignore_ascii_case("category") => Some(e),
                _ => None,
            })
            .collect()
    };

    for cat_el in category_sources {
        match category_from_element(cat_el, origin_label) {
            Ok(cat) => categories.push(cat),
            Err(err) => warn!(error = %err, origin = origin_label, "skipping malformed category"),
        }
    }

    Ok(categories)
}

fn category_from_element(el: &XmlElement, origin_label: &str) -> Result<Category, GolemKbError> {
    let pattern = el
        .child("pattern")
        .map(|p| p.text_content())
        .filter(|s| !s.trim().is_empty())
        .ok_or(GolemKbError::MissingRequiredField)?;

    let template_el = el.child("template").ok_or(GolemKbError::MissingRequiredField)?;
    let template = element_to_template_node(template_el, true);

    let mut category = Category::new(pattern, template).with_origin(CategoryOrigin::File(origin_label.to_string()));
    if let Some(that) = el.child("that") {
        category = category.with_that(that.text_content());
    }
    if let Some(topic) = el.child("topic") {
        category = category.with_topic(topic.text_content());
    }
    Ok(category)
}

/// Parse learned AIML content (`<learn>`/`<learnf>` inner XML): one or more
/// bare `<category>` elements, no `<aiml>` wrapper required.
pub fn parse_learned_categories(xml: &str, origin: CategoryOrigin) -> Result<Vec<Category>, GolemKbError> {
    let roots = parse_document(xml.as_bytes())?;
    let mut out = Vec::new();
    let cat_elements: Vec<&XmlElement> = roots
        .iter()
        .flat_map(|r| {
            if r.name.eq_ignore_ascii_case("category") {
                vec![r]
            } else {
                r.children
                    .iter()
                    .filter_map(|n| match n {
                        XmlNode::Element(e) if e.name.eq_ignore_ascii_case("category") => Some(e),
                        _ => None,
                    })
                    .collect()
            }
        })
        .collect();

    for cat_el in cat_elements {
        let mut cat = category_from_element(cat_el, "learn")?;
        cat.origin = origin.clone();
        out.push(cat);
    }
    if out.is_empty() {
        return Err(GolemKbError::LearnValidation);
    }
    Ok(out)
}

/// Render a category back to canonical `<category>...</category>` XML, used
/// by `learnf` persistence.
pub fn category_to_xml(cat: &Category) -> String {
    let mut out = String::from("<category>\n");
    out.push_str(&format!("  <pattern>{}</pattern>\n", escape(&cat.pattern)));
    if cat.that != "*" {
        out.push_str(&format!("  <that>{}</that>\n", escape(&cat.that)));
    }
    if cat.topic != "*" {
        out.push_str(&format!("  <topic>{}</topic>\n", escape(&cat.topic)));
    }
    out.push_str("  <template>");
    out.push_str(&node_to_xml(&cat.template));
    out.push_str("</template>\n");
    out.push_str("</category>\n");
    out
}

/// Render a template AST node back to literal XML text. Exposed so
/// `golem-template`'s `<learn>`/`<learnf>`/`<unlearn>`/`<unlearnf>` handlers
/// can serialize their raw (unevaluated) children before re-parsing them as
/// categories (§4.5).
pub fn node_to_xml(node: &TemplateNode) -> String {
    match node {
        TemplateNode::Text(t) => escape(t),
        TemplateNode::Tag { name, attrs, children } if name == "template" => {
            children.iter().map(node_to_xml).collect::<Vec<_>>().join("")
        }
        TemplateNode::Tag { name, attrs, children } => {
            let attr_str: String = attrs.iter().map(|(k, v)| format!(" {k}=\"{}\"", escape(v))).collect();
            if children.is_empty() {
                format!("<{name}{attr_str}/>")
            } else {
                let inner: String = children.iter().map(node_to_xml).collect();
                format!("<{name}{attr_str}>{inner}</{name}>")
            }
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn element_to_template_node(el: &XmlElement, is_root: bool) -> TemplateNode {
    let children: Vec<TemplateNode> = el.children.iter().map(node_to_template_node).collect();
    TemplateNode::Tag {
        name: if is_root { "template".to_string() } else { el.name.to_lowercase() },
        attrs: el.attrs.clone(),
        children,
    }
}

fn node_to_template_node(node: &XmlNode) -> TemplateNode {
    match node {
        XmlNode::Text(t) => TemplateNode::Text(t.clone()),
        XmlNode::Element(e) => element_to_template_node(e, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <aiml version="2.0">
      <category>
        <pattern>HELLO</pattern>
        <template>Hi!</template>
      </category>
      <category>
        <pattern>MY NAME IS *</pattern>
        <template>Nice to meet you, <star/>!</template>
      </category>
      <category>
        <pattern>HI THERE</pattern>
        <that>HI</that>
        <template>Hello again.</template>
      </category>
    </aiml>
    "#;

    #[test]
    fn loads_categories_with_pattern_and_template() {
        let cats = load_aiml(SAMPLE.as_bytes(), "test.aiml").unwrap();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0].pattern, "HELLO");
        assert_eq!(cats[1].pattern, "MY NAME IS *");
        assert_eq!(cats[2].that, "HI");
    }

    #[test]
    fn star_tag_parses_as_self_closing_with_no_children() {
        let cats = load_aiml(SAMPLE.as_bytes(), "test.aiml").unwrap();
        let template = &cats[1].template;
        let star = template.children().iter().find(|n| n.name() == Some("star"));
        assert!(star.is_some());
        assert!(star.unwrap().children().is_empty());
    }

    #[test]
    fn missing_pattern_skips_category_without_aborting_load() {
        let xml = r#"<aiml><category><template>oops</template></category>
            <category><pattern>OK</pattern><template>fine</template></category></aiml>"#;
        let cats = load_aiml(xml.as_bytes(), "test.aiml").unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].pattern, "OK");
    }

    #[test]
    fn round_trips_category_to_xml() {
        let cats = load_aiml(SAMPLE.as_bytes(), "test.aiml").unwrap();
        let xml = category_to_xml(&cats[0]);
        assert!(xml.contains("<pattern>HELLO</pattern>"));
    }
}
