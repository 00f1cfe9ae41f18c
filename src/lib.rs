//! RP Sheet: a step-by-step character sheet wizard with a deterministic
//! role-play scene prompt generator.
//!
//! The draft lives in a key-value store, completion is derived from it,
//! and scene prompts are picked from a fixed template corpus by a seeded
//! walk so the same inputs always give the same scenes.

pub mod core;
pub mod schema;
