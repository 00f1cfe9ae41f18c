use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names used by the wizard. A draft may carry other keys too;
/// these are the ones the sheet reads or writes.
pub mod fields {
    pub const NAME: &str = "name";
    pub const ALIAS: &str = "alias";
    pub const DOB: &str = "dob";
    pub const ROLE: &str = "role";
    pub const SET: &str = "set";
    pub const TAGS: &str = "tags";
    pub const BACKSTORY: &str = "backstory";
    pub const TRAITS: &str = "traits";
    pub const LIMITS: &str = "limits";
    pub const CONNECTIONS: &str = "connections";
    pub const GOALS: &str = "goals";
    pub const SECRET: &str = "secret";
    pub const WISHES: &str = "wishes";
    pub const SCENE_1: &str = "scene_1";
    pub const SCENE_2: &str = "scene_2";
    pub const SCENE_IDS: &str = "scene_ids";
    pub const UPDATED_AT: &str = "updated_at";
}

/// The in-progress character record: field name → string value.
///
/// An absent key and an empty string mean the same thing. Keys are kept
/// sorted so the serialized form is stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    values: BTreeMap<String, String>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a field, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Trimmed value of a field.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).trim()
    }

    /// Whether a field is non-empty after trimming.
    pub fn filled(&self, key: &str) -> bool {
        !self.field(key).is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Draft {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut draft = Draft::new();
        for (k, v) in iter {
            draft.set(k, v);
        }
        draft
    }
}
