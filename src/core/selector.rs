/// Scene selector: keyword scoring and the seeded, deterministic pick.
///
/// Selection never touches a platform random source: the seed is an
/// FNV-1a hash of the draft identity plus a caller-supplied salt, and
/// candidates are visited by a fixed multiplicative stride.
use log::debug;
use rustc_hash::FxHashSet;

use crate::core::corpus::{self, CATEGORIES};
use crate::core::filler::fill_prompt;
use crate::schema::draft::{fields, Draft};
use crate::schema::scene::{GeneratedScene, SceneTemplate};

/// Default number of scenes generated per request.
pub const DEFAULT_SCENE_COUNT: usize = 2;

/// Maximum number of categories used to narrow the pool.
pub const FOCUS_LIMIT: usize = 2;

/// Attempts made by the stride walk before falling back.
pub const MAX_ATTEMPTS: u32 = 999;

/// Knuth's multiplicative hashing constant, used as the walk stride.
pub const STRIDE: u32 = 2_654_435_761;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Fields searched for category keywords, in concatenation order.
const SEARCH_FIELDS: [&str; 5] = [
    fields::ROLE,
    fields::TAGS,
    fields::WISHES,
    fields::BACKSTORY,
    fields::SECRET,
];

/// 32-bit FNV-1a over the UTF-16 code units of `input`.
pub fn fnv1a(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |h, unit| {
        (h ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Seed for a draft and salt: FNV-1a of `name|role|set|salt`.
pub fn seed_for(draft: &Draft, salt: &str) -> u32 {
    fnv1a(&format!(
        "{}|{}|{}|{}",
        draft.field(fields::NAME),
        draft.field(fields::ROLE),
        draft.field(fields::SET),
        salt
    ))
}

/// Lowercased free text the category keywords are matched against.
pub fn search_text(draft: &Draft) -> String {
    SEARCH_FIELDS
        .iter()
        .map(|f| draft.field(f))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A category and the number of its keywords found in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScore {
    pub id: &'static str,
    pub score: usize,
}

/// Score every category, highest first. Ties keep table order.
pub fn score_categories(draft: &Draft) -> Vec<CategoryScore> {
    let text = search_text(draft);
    let mut scores: Vec<CategoryScore> = CATEGORIES
        .iter()
        .map(|c| CategoryScore {
            id: c.id,
            score: c
                .keywords
                .iter()
                .filter(|kw| !kw.is_empty() && text.contains(*kw))
                .count(),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}

/// Up to [`FOCUS_LIMIT`] best-scoring categories with a positive score.
pub fn focus_set(draft: &Draft) -> Vec<&'static str> {
    score_categories(draft)
        .into_iter()
        .filter(|s| s.score > 0)
        .take(FOCUS_LIMIT)
        .map(|s| s.id)
        .collect()
}

/// Templates eligible for selection: the focus categories, or the whole
/// corpus when nothing matched.
pub fn candidate_pool<'a>(corpus: &'a [SceneTemplate], focus: &[&str]) -> Vec<&'a SceneTemplate> {
    if focus.is_empty() {
        corpus.iter().collect()
    } else {
        corpus
            .iter()
            .filter(|s| focus.contains(&s.category.as_str()))
            .collect()
    }
}

/// Result of a selection run, kept for inspection and logging.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub seed: u32,
    pub focus: Vec<&'static str>,
    pub pool_size: usize,
    pub picks: Vec<&'a SceneTemplate>,
}

impl Selection<'_> {
    pub fn ids(&self) -> Vec<&str> {
        self.picks.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Pick `count` distinct templates from `corpus` for a draft.
///
/// Identical draft content and salt always produce the same ordered picks.
pub fn select_from<'a>(
    corpus: &'a [SceneTemplate],
    draft: &Draft,
    count: usize,
    salt: &str,
) -> Selection<'a> {
    let focus = focus_set(draft);
    let pool = candidate_pool(corpus, &focus);
    let seed = seed_for(draft, salt);

    let mut picks: Vec<&SceneTemplate> = Vec::with_capacity(count);
    let mut used: FxHashSet<&str> = FxHashSet::default();

    if !pool.is_empty() {
        let len = pool.len() as u32;
        for attempt in 0..MAX_ATTEMPTS {
            if picks.len() >= count {
                break;
            }
            let idx = seed.wrapping_add(attempt.wrapping_mul(STRIDE));
            let candidate = pool[(idx % len) as usize];
            if used.insert(candidate.id.as_str()) {
                picks.push(candidate);
            }
        }
    }

    // Pool exhausted: scan the corpus in order from a seed-derived offset.
    if picks.len() < count && !corpus.is_empty() {
        let start = (u64::from(seed) + picks.len() as u64) % corpus.len() as u64;
        for step in 0..corpus.len() {
            if picks.len() >= count {
                break;
            }
            let candidate = &corpus[(start as usize + step) % corpus.len()];
            if used.insert(candidate.id.as_str()) {
                picks.push(candidate);
            }
        }
    }

    debug!(
        "selected {:?} (seed {seed}, focus {focus:?}, pool {})",
        picks.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        pool.len()
    );

    Selection {
        seed,
        focus,
        pool_size: pool.len(),
        picks,
    }
}

/// Pick from the built-in corpus.
pub fn select(draft: &Draft, count: usize, salt: &str) -> Selection<'static> {
    select_from(corpus::corpus(), draft, count, salt)
}

/// Fill a picked template against the draft.
pub fn render(template: &SceneTemplate, draft: &Draft) -> GeneratedScene {
    GeneratedScene {
        id: template.id.clone(),
        title: template.title.clone(),
        category_title: corpus::category_title(&template.category).to_string(),
        text: fill_prompt(&template.prompt, draft),
    }
}
