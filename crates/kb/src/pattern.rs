//! Normalization rules for pattern/that/topic sections (§4.1 normalization
//! contract): uppercase, whitespace-collapsed, punctuation stripped except
//! for the wildcard characters `* _ ^ # $`, with `<set>NAME</set>` references
//! preserved as a single token.

const WILDCARD_CHARS: [char; 5] = ['*', '_', '^', '#', '$'];

/// Normalize a pattern/that/topic section to the canonical form stored on a
/// [`crate::Category`] and used as a match key.
pub fn normalize_section(raw: &str) -> String {
    let collapsed: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = collapsed.to_uppercase();
    let tokens: Vec<String> = upper
        .split(' ')
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect();
    tokens.join(" ")
}

fn normalize_token(tok: &str) -> String {
    if is_set_ref(tok) {
        return tok.to_string();
    }
    tok.chars()
        .filter(|c| c.is_alphanumeric() || WILDCARD_CHARS.contains(c))
        .collect()
}

/// Split an already-normalized section into its tokens.
pub fn tokenize(normalized: &str) -> Vec<String> {
    if normalized.is_empty() {
        return vec!["*".to_string()];
    }
    normalized.split(' ').map(|s| s.to_string()).collect()
}

/// Normalize a free-form input utterance (not yet a pattern) the same way,
/// so it tokenizes consistently with stored patterns. Empty input becomes
/// the single wildcard token `*`.
pub fn normalize_input(raw: &str) -> String {
    let normalized = normalize_section(raw);
    if normalized.is_empty() {
        "*".to_string()
    } else {
        normalized
    }
}

/// Tokenize a raw input utterance two ways in lockstep: normalized uppercase
/// (for trie matching) and original casing with the same punctuation
/// stripped (for wildcard capture text — §3 "Captured spans preserve input
/// token casing when available"). Empty input yields a single `*` token in
/// both, matching [`normalize_input`].
pub fn tokenize_preserving_case(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut normalized = Vec::new();
    let mut original = Vec::new();
    for word in raw.split_whitespace() {
        let stripped: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || WILDCARD_CHARS.contains(c))
            .collect();
        if stripped.is_empty() {
            continue;
        }
        normalized.push(stripped.to_uppercase());
        original.push(stripped);
    }
    if normalized.is_empty() {
        return (vec!["*".to_string()], vec!["*".to_string()]);
    }
    (normalized, original)
}

pub fn is_set_ref(tok: &str) -> bool {
    let t = tok.to_uppercase();
    t.starts_with("<SET>") && t.ends_with("</SET>") && t.len() > "<SET></SET>".len()
}

/// Extract the set name from a `<SET>NAME</SET>` token, already uppercased.
pub fn set_ref_name(tok: &str) -> Option<String> {
    let t = tok.to_uppercase();
    if is_set_ref(&t) {
        Some(
            t.trim_start_matches("<SET>")
                .trim_end_matches("</SET>")
                .to_string(),
        )
    } else {
        None
    }
}
