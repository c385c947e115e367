//! Tokenizer for the `key: value` text dropped into object storage.
//!
//! The format is line oriented: each non-empty line is split on the first
//! `": "`; lines without that separator are dropped without error.
use std::collections::BTreeMap;

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: BTreeMap<String, String>,
}

impl KeyValues {
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(SEPARATOR) else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or `None` when absent or blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
