//! WASM bindings for story-cards — lets a browser host drive the three
//! turn hooks against an in-memory card store.

use wasm_bindgen::prelude::*;

use story_cards::{
    CardStore, GenerationState, MemoryCardStore, ProfileSet, StoryCard, TurnOrchestrator,
};

// ---------------------------------------------------------------------------
// Embedded profile data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const COMPACT_PROFILES: &str = include_str!("../../card_data/profiles.ron");
}

#[wasm_bindgen]
pub struct CardSession {
    orchestrator: TurnOrchestrator,
    store: MemoryCardStore,
}

#[wasm_bindgen]
impl CardSession {
    /// Create a session. `preset` is `"builtin"` or `"compact"`.
    #[wasm_bindgen(constructor)]
    pub fn new(preset: &str) -> Result<CardSession, JsError> {
        let orchestrator = build_orchestrator(preset, GenerationState::default())?;
        Ok(CardSession {
            orchestrator,
            store: MemoryCardStore::new(),
        })
    }

    /// Resume a session from exported state and cards.
    pub fn restore(preset: &str, state_json: &str, cards_json: &str) -> Result<CardSession, JsError> {
        let state = GenerationState::from_json(state_json)
            .map_err(|e| JsError::new(&format!("Invalid state JSON: {e}")))?;
        let cards: Vec<StoryCard> = serde_json::from_str(cards_json)
            .map_err(|e| JsError::new(&format!("Invalid cards JSON: {e}")))?;
        Ok(CardSession {
            orchestrator: build_orchestrator(preset, state)?,
            store: MemoryCardStore::with_cards(cards),
        })
    }

    /// Intake hook. Returns `{text, stop, notices}` as JSON.
    pub fn on_intake(&mut self, turn: u32, text: &str) -> Result<String, JsError> {
        let out = self.orchestrator.on_intake(turn, text, &mut self.store);
        to_json(&out)
    }

    /// Assembly hook. Returns `{text, stop, notices}` as JSON.
    pub fn on_assemble(&mut self, turn: u32, text: &str) -> Result<String, JsError> {
        let out = self.orchestrator.on_assemble(turn, text, &mut self.store);
        to_json(&out)
    }

    /// Parse hook. Returns `{text, stop, notices}` as JSON.
    pub fn on_parse(&mut self, turn: u32, text: &str) -> Result<String, JsError> {
        let out = self.orchestrator.on_parse(turn, text, &mut self.store);
        to_json(&out)
    }

    pub fn export_state(&self) -> Result<String, JsError> {
        self.orchestrator
            .export_state()
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// All cards in the store as a JSON array.
    pub fn export_cards(&self) -> Result<String, JsError> {
        to_json(&self.store.cards())
    }

    /// Replace the store's cards with a JSON array of cards.
    pub fn import_cards(&mut self, cards_json: &str) -> Result<(), JsError> {
        let cards: Vec<StoryCard> = serde_json::from_str(cards_json)
            .map_err(|e| JsError::new(&format!("Invalid cards JSON: {e}")))?;
        self.store = MemoryCardStore::with_cards(cards);
        Ok(())
    }

    /// Current machine state: `Idle`, `Queued`, `Generating` or `Finalizing`.
    pub fn phase(&self) -> String {
        format!("{:?}", self.orchestrator.phase())
    }

    /// Names waiting in the queue, active item first, as a JSON array.
    pub fn queue(&self) -> Result<String, JsError> {
        let state = self.orchestrator.state();
        let names: Vec<&str> = state
            .active
            .iter()
            .map(|item| item.name.as_str())
            .chain(state.queue.names())
            .collect();
        to_json(&names)
    }

    pub fn available_presets() -> String {
        r#"["builtin","compact"]"#.to_string()
    }
}

fn build_orchestrator(preset: &str, state: GenerationState) -> Result<TurnOrchestrator, JsError> {
    let profiles = match preset {
        "builtin" => ProfileSet::default(),
        "compact" => ProfileSet::parse_ron(data::COMPACT_PROFILES)
            .map_err(|e| JsError::new(&format!("Profile parse error: {e}")))?,
        _ => return Err(JsError::new(&format!("Unknown preset: {preset}"))),
    };
    TurnOrchestrator::builder()
        .profiles(profiles)
        .state(state)
        .build()
        .map_err(|e| JsError::new(&format!("Session build error: {e}")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_preset_parses() {
        let set = ProfileSet::parse_ron(data::COMPACT_PROFILES).unwrap();
        assert_eq!(set.len(), 2);
    }
}
