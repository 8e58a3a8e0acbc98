//! Story Cards — turn-based generation of structured entity cards.
//!
//! Drives a generative model, one turn at a time, to fill bracketed
//! `[CAT: TRAIT(DESC);...]` records for characters and locations, persists
//! finished records as cards in the host's store, and periodically
//! re-summarizes them. The host calls three hooks per turn: intake,
//! assembly, and parse.

pub mod core;
pub mod schema;

pub use crate::core::config::{ProfileSet, Settings};
pub use crate::core::orchestrator::{
    GenerationState, HookOutput, PipelineError, TurnOrchestrator, TurnState,
};
pub use crate::core::store::{CardStore, MemoryCardStore};
pub use crate::schema::card::StoryCard;
