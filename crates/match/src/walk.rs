//! Recursive, priority-ordered backtracking search over the trie (§4.2).
//!
//! At every node the branch alternatives are attempted in the fixed
//! priority order (dollar > literal > set > hash > under > caret > star);
//! the first alternative whose recursive
//! continuation succeeds is kept. Because ties are broken by trying
//! higher-specificity branches first and returning on first success, this
//! single backtracking walk realizes the tie-break rules without a separate
//! comparison pass.

use golem_kb::Category;

use crate::node::Node;
use crate::MAX_DEPTH;

/// Knowledge-base set membership, injected so the match crate doesn't need
/// to depend on `golem-kb`'s storage types directly.
pub trait SetLookup {
    fn contains(&self, set_name: &str, token: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct Captures {
    pub pattern: Vec<String>,
    pub that: Vec<String>,
    pub topic: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub category: Category,
    pub matched_pattern: String,
    pub matched_that: String,
    pub matched_topic: String,
    pub captures: Captures,
}

type PatternResult = (Category, Vec<String>, Vec<String>, Vec<String>);
type ThatResult = (Category, Vec<String>, Vec<String>);
type TopicResult = (Category, Vec<String>);

fn enter(depth: &mut u32) -> bool {
    *depth += 1;
    *depth <= MAX_DEPTH
}

fn leave(depth: &mut u32) {
    *depth -= 1;
}

pub(crate) fn match_pattern(
    node: &Node,
    p: &[String],
    p_raw: &[String],
    that_n: &[String],
    that_r: &[String],
    topic_n: &[String],
    topic_r: &[String],
    sets: &dyn SetLookup,
    depth: &mut u32,
) -> Option<PatternResult> {
    if !enter(depth) {
        leave(depth);
        return None;
    }
    let result = if p.is_empty() {
        node.next
            .as_deref()
            .and_then(|next| match_that(next, that_n, that_r, topic_n, topic_r, sets, depth))
            .map(|(cat, that_caps, topic_caps)| (cat, Vec::new(), that_caps, topic_caps))
    } else {
        try_pattern_branches(node, p, p_raw, that_n, that_r, topic_n, topic_r, sets, depth)
    };
    leave(depth);
    result
}

fn try_pattern_branches(
    node: &Node,
    p: &[String],
    p_raw: &[String],
    that_n: &[String],
    that_r: &[String],
    topic_n: &[String],
    topic_r: &[String],
    sets: &dyn SetLookup,
    depth: &mut u32,
) -> Option<PatternResult> {
    let tok = &p[0];

    // Priority 1: `$TOKEN` exact literal (no capture).
    if let Some(child) = node.dollar.get(tok) {
        if let Some(found) =
            match_pattern(child, &p[1..], &p_raw[1..], that_n, that_r, topic_n, topic_r, sets, depth)
        {
            return Some(found);
        }
    }

    // Priority 2: literal word.
    if let Some(child) = node.literal.get(tok) {
        if let Some(found) =
            match_pattern(child, &p[1..], &p_raw[1..], that_n, that_r, topic_n, topic_r, sets, depth)
        {
            return Some(found);
        }
    }

    // Priority 3: set membership (captures the matched token).
    for (set_name, child) in &node.set_children {
        if sets.contains(set_name, tok) {
            if let Some((cat, mut caps, t, tp)) =
                match_pattern(child, &p[1..], &p_raw[1..], that_n, that_r, topic_n, topic_r, sets, depth)
            {
                caps.insert(0, p_raw[0].clone());
                return Some((cat, caps, t, tp));
            }
        }
    }

    // Priority 4: `#`, one or more tokens, shortest span first.
    if let Some(child) = &node.hash {
        for len in 1..=p.len() {
            if let Some((cat, mut caps, t, tp)) =
                match_pattern(child, &p[len..], &p_raw[len..], that_n, that_r, topic_n, topic_r, sets, depth)
            {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps, t, tp));
            }
        }
    }

    // Priority 5: `_`, exactly one token.
    if let Some(child) = &node.under {
        if !p.is_empty() {
            if let Some((cat, mut caps, t, tp)) =
                match_pattern(child, &p[1..], &p_raw[1..], that_n, that_r, topic_n, topic_r, sets, depth)
            {
                caps.insert(0, p_raw[0].clone());
                return Some((cat, caps, t, tp));
            }
        }
    }

    // Priority 6: `^`, zero or more tokens, shortest span first.
    if let Some(child) = &node.caret {
        for len in 0..=p.len() {
            if let Some((cat, mut caps, t, tp)) =
                match_pattern(child, &p[len..], &p_raw[len..], that_n, that_r, topic_n, topic_r, sets, depth)
            {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps, t, tp));
            }
        }
    }

    // Priority 7: `*`, zero or more tokens, shortest span first.
    if let Some(child) = &node.star {
        for len in 0..=p.len() {
            if let Some((cat, mut caps, t, tp)) =
                match_pattern(child, &p[len..], &p_raw[len..], that_n, that_r, topic_n, topic_r, sets, depth)
            {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps, t, tp));
            }
        }
    }

    None
}

fn match_that(
    node: &Node,
    t: &[String],
    t_raw: &[String],
    topic_n: &[String],
    topic_r: &[String],
    sets: &dyn SetLookup,
    depth: &mut u32,
) -> Option<ThatResult> {
    if !enter(depth) {
        leave(depth);
        return None;
    }
    let result = if t.is_empty() {
        node.next
            .as_deref()
            .and_then(|next| match_topic(next, topic_n, topic_r, sets, depth))
            .map(|(cat, topic_caps)| (cat, Vec::new(), topic_caps))
    } else {
        try_that_branches(node, t, t_raw, topic_n, topic_r, sets, depth)
    };
    leave(depth);
    result
}

fn try_that_branches(
    node: &Node,
    t: &[String],
    t_raw: &[String],
    topic_n: &[String],
    topic_r: &[String],
    sets: &dyn SetLookup,
    depth: &mut u32,
) -> Option<ThatResult> {
    let tok = &t[0];

    if let Some(child) = node.dollar.get(tok) {
        if let Some(found) = match_that(child, &t[1..], &t_raw[1..], topic_n, topic_r, sets, depth) {
            return Some(found);
        }
    }
    if let Some(child) = node.literal.get(tok) {
        if let Some(found) = match_that(child, &t[1..], &t_raw[1..], topic_n, topic_r, sets, depth) {
            return Some(found);
        }
    }
    for (set_name, child) in &node.set_children {
        if sets.contains(set_name, tok) {
            if let Some((cat, mut caps, tp)) = match_that(child, &t[1..], &t_raw[1..], topic_n, topic_r, sets, depth) {
                caps.insert(0, t_raw[0].clone());
                return Some((cat, caps, tp));
            }
        }
    }
    if let Some(child) = &node.hash {
        for len in 1..=t.len() {
            if let Some((cat, mut caps, tp)) = match_that(child, &t[len..], &t_raw[len..], topic_n, topic_r, sets, depth) {
                caps.insert(0, t_raw[..len].join(" "));
                return Some((cat, caps, tp));
            }
        }
    }
    if let Some(child) = &node.under {
        if !t.is_empty() {
            if let Some((cat, mut caps, tp)) = match_that(child, &t[1..], &t_raw[1..], topic_n, topic_r, sets, depth) {
                caps.insert(0, t_raw[0].clone());
                return Some((cat, caps, tp));
            }
        }
    }
    if let Some(child) = &node.caret {
        for len in 0..=t.len() {
            if let Some((cat, mut caps, tp)) = match_that(child, &t[len..], &t_raw[len..], topic_n, topic_r, sets, depth) {
                caps.insert(0, t_raw[..len].join(" "));
                return Some((cat, caps, tp));
            }
        }
    }
    if let Some(child) = &node.star {
        for len in 0..=t.len() {
            if let Some((cat, mut caps, tp)) = match_that(child, &t[len..], &t_raw[len..], topic_n, topic_r, sets, depth) {
                caps.insert(0, t_raw[..len].join(" "));
                return Some((cat, caps, tp));
            }
        }
    }
    None
}

fn match_topic(node: &Node, p: &[String], p_raw: &[String], sets: &dyn SetLookup, depth: &mut u32) -> Option<TopicResult> {
    if !enter(depth) {
        leave(depth);
        return None;
    }
    let result = if p.is_empty() {
        node.category.clone().map(|cat| (cat, Vec::new()))
    } else {
        try_topic_branches(node, p, p_raw, sets, depth)
    };
    leave(depth);
    result
}

fn try_topic_branches(node: &Node, p: &[String], p_raw: &[String], sets: &dyn SetLookup, depth: &mut u32) -> Option<TopicResult> {
    let tok = &p[0];

    if let Some(child) = node.dollar.get(tok) {
        if let Some(found) = match_topic(child, &p[1..], &p_raw[1..], sets, depth) {
            return Some(found);
        }
    }
    if let Some(child) = node.literal.get(tok) {
        if let Some(found) = match_topic(child, &p[1..], &p_raw[1..], sets, depth) {
            return Some(found);
        }
    }
    for (set_name, child) in &node.set_children {
        if sets.contains(set_name, tok) {
            if let Some((cat, mut caps)) = match_topic(child, &p[1..], &p_raw[1..], sets, depth) {
                caps.insert(0, p_raw[0].clone());
                return Some((cat, caps));
            }
        }
    }
    if let Some(child) = &node.hash {
        for len in 1..=p.len() {
            if let Some((cat, mut caps)) = match_topic(child, &p[len..], &p_raw[len..], sets, depth) {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps));
            }
        }
    }
    if let Some(child) = &node.under {
        if !p.is_empty() {
            if let Some((cat, mut caps)) = match_topic(child, &p[1..], &p_raw[1..], sets, depth) {
                caps.insert(0, p_raw[0].clone());
                return Some((cat, caps));
            }
        }
    }
    if let Some(child) = &node.caret {
        for len in 0..=p.len() {
            if let Some((cat, mut caps)) = match_topic(child, &p[len..], &p_raw[len..], sets, depth) {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps));
            }
        }
    }
    if let Some(child) = &node.star {
        for len in 0..=p.len() {
            if let Some((cat, mut caps)) = match_topic(child, &p[len..], &p_raw[len..], sets, depth) {
                caps.insert(0, p_raw[..len].join(" "));
                return Some((cat, caps));
            }
        }
    }
    None
}
