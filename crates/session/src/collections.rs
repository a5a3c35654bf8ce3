use std::collections::HashMap;

/// Named, mutable collections backing the `<list>`/`<array>`/`<map>`/`<set>`
/// template tags (§4.3 "Collections"). Session-scoped: created on first use,
/// lost when the session ends — same lifetime as session variables.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    lists: HashMap<String, Vec<String>>,
    arrays: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, Vec<String>>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    // ── list: growable, insert/remove by position ───────────────────────

    pub fn list_add(&mut self, name: &str, value: String) {
        self.lists.entry(name.to_uppercase()).or_default().push(value);
    }

    pub fn list_insert(&mut self, name: &str, index: usize, value: String) -> bool {
        let v = self.lists.entry(name.to_uppercase()).or_default();
        if index > v.len() {
            return false;
        }
        v.insert(index, value);
        true
    }

    pub fn list_remove(&mut self, name: &str, index: usize) -> Option<String> {
        let v = self.lists.get_mut(&name.to_uppercase())?;
        (index < v.len()).then(|| v.remove(index))
    }

    pub fn list_clear(&mut self, name: &str) {
        self.lists.remove(&name.to_uppercase());
    }

    pub fn list_size(&self, name: &str) -> usize {
        self.lists.get(&name.to_uppercase()).map_or(0, Vec::len)
    }

    pub fn list_get(&self, name: &str, index: usize) -> Option<&str> {
        self.lists.get(&name.to_uppercase())?.get(index).map(String::as_str)
    }

    pub fn list_contains(&self, name: &str, value: &str) -> bool {
        self.lists.get(&name.to_uppercase()).is_some_and(|v| v.iter().any(|x| x.eq_ignore_ascii_case(value)))
    }

    pub fn list_all(&self, name: &str) -> String {
        self.lists.get(&name.to_uppercase()).map(|v| v.join(" ")).unwrap_or_default()
    }

    // ── array: fixed-length, resizable, set-by-index ────────────────────

    pub fn array_add(&mut self, name: &str, value: String) {
        self.arrays.entry(name.to_uppercase()).or_default().push(value);
    }

    pub fn array_insert(&mut self, name: &str, index: usize, value: String) -> bool {
        let v = self.arrays.entry(name.to_uppercase()).or_default();
        if index > v.len() {
            return false;
        }
        v.insert(index, value);
        true
    }

    pub fn array_remove(&mut self, name: &str, index: usize) -> Option<String> {
        let v = self.arrays.get_mut(&name.to_uppercase())?;
        (index < v.len()).then(|| v.remove(index))
    }

    pub fn array_set(&mut self, name: &str, index: usize, value: String) -> bool {
        let v = self.arrays.get_mut(&name.to_uppercase());
        match v.and_then(|v| v.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn array_resize(&mut self, name: &str, new_len: usize) {
        self.arrays.entry(name.to_uppercase()).or_default().resize(new_len, String::new());
    }

    pub fn array_clear(&mut self, name: &str) {
        self.arrays.remove(&name.to_uppercase());
    }

    pub fn array_size(&self, name: &str) -> usize {
        self.arrays.get(&name.to_uppercase()).map_or(0, Vec::len)
    }

    pub fn array_get(&self, name: &str, index: usize) -> Option<&str> {
        self.arrays.get(&name.to_uppercase())?.get(index).map(String::as_str)
    }

    pub fn array_contains(&self, name: &str, value: &str) -> bool {
        self.arrays.get(&name.to_uppercase()).is_some_and(|v| v.iter().any(|x| x.eq_ignore_ascii_case(value)))
    }

    pub fn array_all(&self, name: &str) -> String {
        self.arrays.get(&name.to_uppercase()).map(|v| v.join(" ")).unwrap_or_default()
    }

    // ── map: key/value, case-insensitive keys ───────────────────────────

    pub fn map_set(&mut self, name: &str, key: &str, value: String) {
        self.maps.entry(name.to_uppercase()).or_default().insert(key.to_uppercase(), value);
    }

    pub fn map_get(&self, name: &str, key: &str) -> Option<&str> {
        self.maps.get(&name.to_uppercase())?.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn map_remove(&mut self, name: &str, key: &str) -> Option<String> {
        self.maps.get_mut(&name.to_uppercase())?.remove(&key.to_uppercase())
    }

    pub fn map_clear(&mut self, name: &str) {
        self.maps.remove(&name.to_uppercase());
    }

    pub fn map_size(&self, name: &str) -> usize {
        self.maps.get(&name.to_uppercase()).map_or(0, HashMap::len)
    }

    pub fn map_contains(&self, name: &str, key: &str) -> bool {
        self.maps.get(&name.to_uppercase()).is_some_and(|m| m.contains_key(&key.to_uppercase()))
    }

    pub fn map_keys(&self, name: &str) -> String {
        let Some(m) = self.maps.get(&name.to_uppercase()) else { return String::new() };
        let mut keys: Vec<&str> = m.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys.join(" ")
    }

    pub fn map_values(&self, name: &str) -> String {
        let Some(m) = self.maps.get(&name.to_uppercase()) else { return String::new() };
        let mut entries: Vec<(&str, &str)> = m.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries.into_iter().map(|(_, v)| v).collect::<Vec<_>>().join(" ")
    }

    pub fn map_list(&self, name: &str) -> String {
        let Some(m) = self.maps.get(&name.to_uppercase()) else { return String::new() };
        let mut entries: Vec<(&str, &str)> = m.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries.into_iter().map(|(k, v)| format!("{k}:{v}")).collect::<Vec<_>>().join(" ")
    }

    // ── set: unordered membership, insertion order preserved ────────────

    pub fn set_add(&mut self, name: &str, value: &str) {
        let v = self.sets.entry(name.to_uppercase()).or_default();
        if !v.iter().any(|x| x.eq_ignore_ascii_case(value)) {
            v.push(value.to_string());
        }
    }

    pub fn set_remove(&mut self, name: &str, value: &str) -> bool {
        let Some(v) = self.sets.get_mut(&name.to_uppercase()) else { return false };
        let before = v.len();
        v.retain(|x| !x.eq_ignore_ascii_case(value));
        v.len() < before
    }

    pub fn set_contains(&self, name: &str, value: &str) -> bool {
        self.sets.get(&name.to_uppercase()).is_some_and(|v| v.iter().any(|x| x.eq_ignore_ascii_case(value)))
    }

    pub fn set_clear(&mut self, name: &str) {
        self.sets.remove(&name.to_uppercase());
    }

    pub fn set_size(&self, name: &str) -> usize {
        self.sets.get(&name.to_uppercase()).map_or(0, Vec::len)
    }

    pub fn set_all(&self, name: &str) -> String {
        self.sets.get(&name.to_uppercase()).map(|v| v.join(" ")).unwrap_or_default()
    }
}
