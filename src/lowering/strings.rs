// src/lowering/strings.rs

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::ir::StringConstant;

/// String literals referenced by the module, labelled `.LC0`, `.LC1`, ...
#[derive(Debug)]
pub struct StringPool {
    dedupe: bool,
    /// label -> value, in first-use order.
    entries: IndexMap<String, String>,
    /// value -> label, consulted when deduplicating.
    reverse_map: HashMap<String, String>,
}

impl StringPool {
    pub fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            entries: IndexMap::new(),
            reverse_map: HashMap::new(),
        }
    }

    /// Returns the label for `value`, adding an entry when needed.
    pub fn intern(&mut self, value: &str) -> String {
        if self.dedupe {
            if let Some(label) = self.reverse_map.get(value) {
                return label.clone();
            }
        }

        let label = format!(".LC{}", self.entries.len());
        self.entries.insert(label.clone(), value.to_string());
        self.reverse_map
            .entry(value.to_string())
            .or_insert_with(|| label.clone());
        label
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_constants(self) -> Vec<StringConstant> {
        self.entries
            .into_iter()
            .map(|(label, value)| StringConstant { label, value })
            .collect()
    }
}
