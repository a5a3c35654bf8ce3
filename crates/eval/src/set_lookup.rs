use golem_kb::KnowledgeBase;
use golem_match::SetLookup;

/// Adapts a borrowed [`KnowledgeBase`] to `golem-match`'s [`SetLookup`],
/// so the match crate never needs to depend on `golem-kb`'s storage types.
pub struct KbSetLookup<'a>(pub &'a KnowledgeBase);

impl SetLookup for KbSetLookup<'_> {
    fn contains(&self, set_name: &str, token: &str) -> bool {
        self.0.lookup_set(set_name, token)
    }
}
