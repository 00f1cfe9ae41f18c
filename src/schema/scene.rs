use serde::{Deserialize, Serialize};

/// A scene category with the keyword fragments used to score drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub title: &'static str,
    /// Lowercase substrings searched for in the draft's free text.
    pub keywords: &'static [&'static str],
}

/// Display-only facets a template was assembled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMeta {
    pub location: String,
    pub hook: String,
    pub stake: String,
    pub twist: String,
    pub npc: String,
}

/// One entry of the scene corpus. The prompt still carries placeholder
/// tokens; see [`crate::core::filler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTemplate {
    /// `S001` … `S120`.
    pub id: String,
    pub category: String,
    pub title: String,
    pub prompt: String,
    pub meta: SceneMeta,
}

/// A template rendered against a specific draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScene {
    pub id: String,
    pub title: String,
    pub category_title: String,
    pub text: String,
}

/// Compact listing row for the scene library view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub title: String,
    pub category_title: String,
    pub location: String,
}
