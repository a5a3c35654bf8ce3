//! `.set`, `.map`, and `.properties` auxiliary file formats (§6).

use std::collections::HashMap;
use std::io::BufRead;

/// Parse a `.set` file: a JSON array of strings, or newline-separated
/// strings. Blank lines and `#`-prefixed lines are ignored. Values are
/// uppercased and trimmed; duplicates are removed, insertion order kept.
pub fn parse_set_file(contents: &str) -> Vec<String> {
    let trimmed = contents.trim_start();
    let raw_values: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_default()
    } else {
        contents
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.to_string())
            .collect()
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for v in raw_values {
        let normalized = v.trim().to_uppercase();
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

/// Parse a `.map` file: a JSON object, or lines of `key value...` separated
/// by whitespace. Keys and values are uppercased and trimmed.
pub fn parse_map_file(contents: &str) -> HashMap<String, String> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('{') {
        let raw: HashMap<String, String> = serde_json::from_str(trimmed).unwrap_or_default();
        return raw
            .into_iter()
            .map(|(k, v)| (k.trim().to_uppercase(), v.trim().to_uppercase()))
            .collect();
    }

    let mut out = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let Some(key) = parts.next() else { continue };
        let value = parts.next().unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        out.insert(key.trim().to_uppercase(), value.to_uppercase());
    }
    out
}

/// Parse a `.properties` file: `key=value` lines, with `${ENV_VAR}`
/// substituted from the process environment at load time.
pub fn parse_properties_file(contents: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        let key = key.trim().to_string();
        let value = substitute_env(value.trim());
        out.insert(key, value);
    }
    out
}

fn substitute_env(value: &str) -> String {
    let mut out = String::new();
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        if let Some(end) = after.find('}') {
            let var_name = &after[..end];
            if let Ok(v) = std::env::var(var_name) {
                out.push_str(&v);
            }
            rest = &after[end + 1..];
        } else {
            out.push_str("${");
            rest = after;
            break;
        }
    }
    out.push_str(rest);
    out
}

/// Derive a set/map name from a file path's basename, extension stripped,
/// uppercased.
pub fn name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

pub fn read_lines(reader: impl BufRead) -> std::io::Result<String> {
    let mut out = String::new();
    for line in reader.lines() {
        out.push_str(&line?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_newline_separated_set() {
        let contents = "red\nblue\n# comment\n\ngreen\nred\n";
        assert_eq!(parse_set_file(contents), vec!["RED", "BLUE", "GREEN"]);
    }

    #[test]
    fn parses_json_array_set() {
        let contents = r#"["red", "blue", "red"]"#;
        assert_eq!(parse_set_file(contents), vec!["RED", "BLUE"]);
    }

    #[test]
    fn parses_whitespace_map() {
        let contents = "he him\nshe her\n";
        let map = parse_map_file(contents);
        assert_eq!(map.get("HE").unwrap(), "HIM");
        assert_eq!(map.get("SHE").unwrap(), "HER");
    }

    #[test]
    fn parses_json_object_map() {
        let contents = r#"{"he": "him"}"#;
        let map = parse_map_file(contents);
        assert_eq!(map.get("HE").unwrap(), "HIM");
    }

    #[test]
    fn substitutes_env_vars_in_properties() {
        unsafe { std::env::set_var("GOLEM_TEST_VAR", "bar") };
        let contents = "foo=${GOLEM_TEST_VAR}\nbaz=qux\n";
        let props = parse_properties_file(contents);
        assert_eq!(props.get("foo").unwrap(), "bar");
        assert_eq!(props.get("baz").unwrap(), "qux");
    }
}
