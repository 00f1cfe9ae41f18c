/// Prompt filler: substitutes draft values into scene template text.
use crate::schema::draft::{fields, Draft};

/// Maximum number of characters of the wishes field used as the focus phrase.
pub const FOCUS_MAX_CHARS: usize = 120;

const NAME_FALLBACK: &str = "твой персонаж";
const ROLE_FALLBACK: &str = "роль";
const SET_FALLBACK: &str = "сет";
const FOCUS_FALLBACK: &str = "свободный сюжет (выбери тон и ставки)";

/// The placeholder tokens a scene template may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Name,
    /// Expands to ` (alias)` or nothing.
    Alias,
    Role,
    Set,
    /// Short, whitespace-collapsed excerpt of the wishes field.
    Focus,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Name,
        Placeholder::Alias,
        Placeholder::Role,
        Placeholder::Set,
        Placeholder::Focus,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Name => "{name}",
            Self::Alias => "{alias_part}",
            Self::Role => "{role}",
            Self::Set => "{set}",
            Self::Focus => "{wishes_short}",
        }
    }

    /// The text this placeholder expands to for a draft.
    pub fn value(&self, draft: &Draft) -> String {
        match self {
            Self::Name => or_fallback(draft.field(fields::NAME), NAME_FALLBACK),
            Self::Alias => {
                let alias = draft.field(fields::ALIAS);
                if alias.is_empty() {
                    String::new()
                } else {
                    format!(" ({alias})")
                }
            }
            Self::Role => or_fallback(draft.field(fields::ROLE), ROLE_FALLBACK),
            Self::Set => or_fallback(draft.field(fields::SET), SET_FALLBACK),
            Self::Focus => {
                let wishes = draft.field(fields::WISHES);
                if wishes.is_empty() {
                    FOCUS_FALLBACK.to_string()
                } else {
                    collapse_whitespace(wishes)
                        .chars()
                        .take(FOCUS_MAX_CHARS)
                        .collect()
                }
            }
        }
    }

    fn at_start_of(input: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| input.starts_with(p.token()))
    }
}

/// A piece of template text: literal prose or a placeholder slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Slot(Placeholder),
}

/// Split template text into literal runs and placeholder slots.
///
/// Braces that do not start a known token stay literal, so any text
/// can be segmented.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while let Some(offset) = text[i..].find('{') {
        let at = i + offset;
        match Placeholder::at_start_of(&text[at..]) {
            Some(p) => {
                if literal_start < at {
                    out.push(Segment::Literal(&text[literal_start..at]));
                }
                out.push(Segment::Slot(p));
                i = at + p.token().len();
                literal_start = i;
            }
            None => i = at + 1,
        }
    }

    if literal_start < text.len() {
        out.push(Segment::Literal(&text[literal_start..]));
    }
    out
}

/// Instantiate a template against a draft.
///
/// Every token is replaced in a single pass, so draft values that happen
/// to look like tokens are copied through untouched.
pub fn fill_prompt(text: &str, draft: &Draft) -> String {
    let values: Vec<(Placeholder, String)> = Placeholder::ALL
        .into_iter()
        .map(|p| (p, p.value(draft)))
        .collect();

    let mut out = String::with_capacity(text.len() + 64);
    for segment in segments(text) {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Slot(p) => {
                if let Some((_, v)) = values.iter().find(|(q, _)| *q == p) {
                    out.push_str(v);
                }
            }
        }
    }
    out
}

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_tokens(text: &str) -> bool {
        Placeholder::ALL.iter().any(|p| text.contains(p.token()))
    }

    #[test]
    fn segments_split_tokens_and_literals() {
        let segs = segments("Hi {name}{alias_part}, {unknown} {role}");
        assert_eq!(
            segs,
            vec![
                Segment::Literal("Hi "),
                Segment::Slot(Placeholder::Name),
                Segment::Slot(Placeholder::Alias),
                Segment::Literal(", {unknown} "),
                Segment::Slot(Placeholder::Role),
            ]
        );
    }

    #[test]
    fn empty_draft_uses_fallbacks() {
        let out = fill_prompt("{name}{alias_part} ({role}, {set}): {wishes_short}", &Draft::new());
        assert_eq!(
            out,
            "твой персонаж (роль, сет): свободный сюжет (выбери тон и ставки)"
        );
        assert!(!has_tokens(&out));
    }

    #[test]
    fn alias_is_parenthesized() {
        let draft: Draft = [("name", "Mona"), ("alias", " Ghost ")].into_iter().collect();
        assert_eq!(fill_prompt("{name}{alias_part}", &draft), "Mona (Ghost)");
    }

    #[test]
    fn focus_collapses_and_truncates() {
        let long = format!("  a\n\tb   {}", "ж".repeat(200));
        let draft: Draft = [("wishes", long)].into_iter().collect();
        let focus = Placeholder::Focus.value(&draft);
        assert!(focus.starts_with("a b ж"));
        assert_eq!(focus.chars().count(), FOCUS_MAX_CHARS);
    }

    #[test]
    fn replaces_every_occurrence() {
        let draft: Draft = [("set", "Davis")].into_iter().collect();
        assert_eq!(fill_prompt("{set}/{set}", &draft), "Davis/Davis");
    }

    #[test]
    fn token_like_values_are_not_expanded() {
        let draft: Draft = [("name", "{role}"), ("role", "Runner")].into_iter().collect();
        assert_eq!(fill_prompt("{name} {role}", &draft), "{role} Runner");
    }

    #[test]
    fn filling_is_idempotent() {
        let draft: Draft = [("name", "Alex"), ("wishes", "тихие сцены")].into_iter().collect();
        let template = crate::core::corpus::corpus()[3].prompt.clone();
        let once = fill_prompt(&template, &draft);
        assert_eq!(once, fill_prompt(&template, &draft));
        assert!(!has_tokens(&once));
    }
}
