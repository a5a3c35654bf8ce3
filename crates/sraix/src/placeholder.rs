//! Turning a `<sraix>` call's `hint` attribute and caller-supplied input into
//! the named placeholders an endpoint template or param value can reference
//! (§4.5). Kept free of `golem-session` — callers hand in whatever scoped
//! lookup (session vars, bot properties, ...) they already have via
//! [`PlaceholderSource`].
use std::collections::HashMap;

/// Something that can resolve a bare name to a value — typically backed by
/// the same scope chain `<get name="...">` walks (session var, then bot
/// property). Implemented by the evaluation layer, not by this crate.
pub trait PlaceholderSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl PlaceholderSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Parse a `hint` attribute into named placeholders:
/// - empty: no hints
/// - contains `=`: comma-separated `key=value` pairs
/// - contains `,` but no `=`: positional `lat,lon`
/// - otherwise: a single bare value bound to `location`
pub fn parse_hint(hint: &str) -> HashMap<String, String> {
    let hint = hint.trim();
    let mut out = HashMap::new();
    if hint.is_empty() {
        return out;
    }
    if hint.contains('=') {
        for pair in hint.split(',') {
            if let Some((k, v)) = pair.split_once('=') {
                out.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    } else if let Some((lat, lon)) = hint.split_once(',') {
        out.insert("lat".to_string(), lat.trim().to_string());
        out.insert("lon".to_string(), lon.trim().to_string());
    } else {
        out.insert("location".to_string(), hint.to_string());
    }
    out
}

/// Resolve every `{name}` placeholder in `template`, checking (in order)
/// the hint map, `{input}`/`{wildcard0}`..`{wildcardN}`, then `source`.
/// Unresolvable placeholders are left untouched.
pub fn substitute(
    template: &str,
    hints: &HashMap<String, String>,
    input: &str,
    wildcards: &[String],
    source: &dyn PlaceholderSource,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let name = &template[i + 1..i + 1 + end];
                let resolved = resolve_one(name, hints, input, wildcards, source);
                match resolved {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                i += end + 2;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = &mut chars;
    out
}

fn resolve_one(
    name: &str,
    hints: &HashMap<String, String>,
    input: &str,
    wildcards: &[String],
    source: &dyn PlaceholderSource,
) -> Option<String> {
    if name.eq_ignore_ascii_case("input") {
        return Some(input.to_string());
    }
    if let Some(rest) = name.strip_prefix("wildcard") {
        if let Ok(idx) = rest.parse::<usize>() {
            return wildcards.get(idx).cloned();
        }
    }
    hints.get(name).cloned().or_else(|| source.lookup(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_hints() {
        let hints = parse_hint("unit=metric, lang=en");
        assert_eq!(hints.get("unit").map(String::as_str), Some("metric"));
        assert_eq!(hints.get("lang").map(String::as_str), Some("en"));
    }

    #[test]
    fn parses_positional_lat_lon() {
        let hints = parse_hint("40.7,-74.0");
        assert_eq!(hints.get("lat").map(String::as_str), Some("40.7"));
        assert_eq!(hints.get("lon").map(String::as_str), Some("-74.0"));
    }

    #[test]
    fn bare_value_becomes_location() {
        let hints = parse_hint("Paris");
        assert_eq!(hints.get("location").map(String::as_str), Some("Paris"));
    }

    #[test]
    fn substitutes_input_and_hints_leaves_unknown_untouched() {
        let hints = parse_hint("Paris");
        let source: HashMap<String, String> = HashMap::new();
        let out = substitute("q={location}&text={input}&x={missing}", &hints, "hello", &[], &source);
        assert_eq!(out, "q=Paris&text=hello&x={missing}");
    }
}
