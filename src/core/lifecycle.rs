/// Entity card lifecycle: creation against the host store, cooldown aging,
/// and accumulation of compression summaries.

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::store::CardStore;
use crate::schema::card::{
    CardId, CardMeta, CardSeed, EntityCard, StoryCard, SummaryEntry, CONFIG_CARD_TYPE,
    CONFIG_TITLE_PREFIX, ENTITY_CARD_TYPE, ENTITY_TITLE_PREFIX,
};

/// Add requests sent to the store before creation gives up.
pub const CREATE_ATTEMPTS: u32 = 2;
/// Upper bound on the comma-joined trigger key string.
pub const MAX_KEYS_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Failed, \"{title}\" has timed out after {attempts} attempts.")]
    TimedOut { title: String, attempts: u32 },
}

/// Comparison key for entity names: lowercase, word characters only.
pub fn entity_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Every decodable entity card with its store index. Cards whose
/// metadata does not decode are skipped with a warning.
pub fn entity_cards(store: &dyn CardStore, default_cooldown: u32) -> Vec<(usize, EntityCard)> {
    let mut out = Vec::new();
    for (idx, card) in store.cards().iter().enumerate() {
        match EntityCard::decode(card, default_cooldown) {
            Ok(Some(entity)) => out.push((idx, entity)),
            Ok(None) => {}
            Err(e) => warn!(title = %card.title, error = %e, "skipping card with malformed metadata"),
        }
    }
    out
}

/// The entity card whose id matches `name`, ignoring case and punctuation.
pub fn find_card(
    store: &dyn CardStore,
    name: &str,
    default_cooldown: u32,
) -> Option<(usize, EntityCard)> {
    let key = entity_key(name);
    if key.is_empty() {
        return None;
    }
    entity_cards(store, default_cooldown)
        .into_iter()
        .find(|(_, card)| entity_key(&card.id) == key)
}

/// Names of every existing entity card, first spelling wins.
pub fn known_entries(store: &dyn CardStore, default_cooldown: u32) -> Vec<String> {
    let mut seen = FxHashSet::default();
    entity_cards(store, default_cooldown)
        .into_iter()
        .map(|(_, card)| card.id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(entity_key(id)))
        .collect()
}

/// Persist a completed record as an entity card.
///
/// An existing card for the same entity is updated in place and keeps its
/// summaries. Otherwise a new card is requested from the store, retrying
/// up to [`CREATE_ATTEMPTS`] times.
pub fn create_card(
    store: &mut dyn CardStore,
    name: &str,
    seed: CardSeed,
    record: &str,
    cooldown: u32,
) -> Result<usize, LifecycleError> {
    if let Some((idx, mut existing)) = find_card(store, name, cooldown) {
        existing.record = record.to_string();
        existing.seed = seed;
        existing.cooldown = cooldown;
        existing.write_to(&mut store.cards_mut()[idx]);
        info!(name, "updated card");
        return Ok(idx);
    }

    let meta = CardMeta {
        id: name.to_string(),
        data: seed,
        cooldown,
        summary: Vec::new(),
    };
    let template = StoryCard {
        id: CardId::Managed(meta).encode(),
        title: format!("{}{}", ENTITY_TITLE_PREFIX, name),
        keys: trigger_keys(name),
        entry: record.to_string(),
        card_type: ENTITY_CARD_TYPE.to_string(),
        description: String::new(),
    };
    let idx = find_or_add(store, &template)?;
    let card = &mut store.cards_mut()[idx];
    card.id = template.id;
    card.entry = template.entry;
    card.card_type = template.card_type;
    if card.keys.trim().is_empty() {
        card.keys = template.keys;
    }
    info!(name, "created card");
    Ok(idx)
}

/// Find or create the config card `🔧 NAME`.
pub fn ensure_config_card(store: &mut dyn CardStore, name: &str) -> Result<usize, LifecycleError> {
    let id = name.to_uppercase();
    let template = StoryCard {
        id: id.clone(),
        title: format!("{}{}", CONFIG_TITLE_PREFIX, id),
        card_type: CONFIG_CARD_TYPE.to_string(),
        ..StoryCard::default()
    };
    let idx = find_or_add(store, &template)?;
    let card = &mut store.cards_mut()[idx];
    card.id = id;
    card.card_type = template.card_type;
    Ok(idx)
}

fn find_or_add(store: &mut dyn CardStore, template: &StoryCard) -> Result<usize, LifecycleError> {
    for attempt in 0..CREATE_ATTEMPTS {
        if let Some(idx) = store.find_by_title(&template.title) {
            return Ok(idx);
        }
        if attempt > 0 {
            warn!(title = %template.title, attempt, "card not visible yet, retrying");
        }
        store.add_card(template.clone());
    }
    store
        .find_by_title(&template.title)
        .ok_or_else(|| LifecycleError::TimedOut {
            title: template.title.clone(),
            attempts: CREATE_ATTEMPTS,
        })
}

/// Trigger keys for a card: the first name token, then punctuation-bounded
/// variants while the joined list fits in [`MAX_KEYS_LEN`] characters.
/// Short tokens get space-padded variants so they do not fire inside
/// longer words.
pub fn trigger_keys(name: &str) -> String {
    let key = name
        .split(|c: char| c == ' ' || c == '_')
        .find(|t| !t.is_empty())
        .unwrap_or(name);
    const SHORT: [(&str, &str); 18] = [
        (" ", " "), (" ", "'"), ("\"", " "), (" ", "."), (" ", "?"), (" ", "!"),
        (" ", ";"), ("'", " "), ("(", " "), (" ", ")"), (" ", ":"), (" ", "\""),
        ("[", " "), (" ", "]"), ("—", " "), (" ", "—"), ("{", " "), (" ", "}"),
    ];
    const LONG: [(&str, &str); 19] = [
        ("", " "), (" ", ""), ("", "'"), ("\"", ""), ("", "."), ("", "?"), ("", "!"),
        ("", ";"), ("'", ""), ("(", ""), ("", ")"), ("", ":"), ("", "\""), ("[", ""),
        ("", "]"), ("—", ""), ("", "—"), ("{", ""), ("", "}"),
    ];
    let bounds: &[(&str, &str)] = if key.chars().count() < 6 { &SHORT } else { &LONG };

    let candidates = std::iter::once(key.to_string())
        .chain(bounds.iter().map(|(pre, post)| format!("{}{}{}", pre, key, post)));
    let mut keys: Vec<String> = Vec::new();
    let mut len = 0;
    for candidate in candidates {
        let extra = candidate.chars().count() + usize::from(!keys.is_empty());
        if len + extra > MAX_KEYS_LEN {
            break;
        }
        len += extra;
        keys.push(candidate);
    }
    if keys.is_empty() {
        return key.chars().take(MAX_KEYS_LEN).collect();
    }
    keys.join(",")
}

/// Age every auto-aging card by one idle turn. Returns the titles of
/// cards that just reached zero.
pub fn age_cards(store: &mut dyn CardStore, default_cooldown: u32) -> Vec<String> {
    let mut due = Vec::new();
    for (idx, mut card) in entity_cards(store, default_cooldown) {
        if !card.auto_aging || card.cooldown == 0 {
            continue;
        }
        card.cooldown -= 1;
        if card.cooldown == 0 {
            due.push(store.cards()[idx].title.clone());
        }
        card.write_to(&mut store.cards_mut()[idx]);
    }
    due
}

/// Auto-aging cards whose cooldown is exhausted, as `(name, seed)` pairs
/// ready to become compression requests.
pub fn due_for_compression(store: &dyn CardStore, default_cooldown: u32) -> Vec<(String, String)> {
    entity_cards(store, default_cooldown)
        .into_iter()
        .filter(|(_, card)| card.auto_aging && card.cooldown == 0)
        .map(|(_, card)| (card.id.clone(), compression_seed(&card)))
        .collect()
}

/// The card's record followed by every prior summary, oldest first.
pub fn compression_seed(card: &EntityCard) -> String {
    let mut seed = card.record.clone();
    for summary in &card.summary_history {
        seed.push('\n');
        seed.push_str(&summary.entry);
    }
    seed
}

/// Restart a card's cooldown. Returns whether the card was found.
pub fn reset_cooldown(store: &mut dyn CardStore, name: &str, interval: u32) -> bool {
    match find_card(store, name, interval) {
        Some((idx, mut card)) => {
            card.cooldown = interval;
            card.write_to(&mut store.cards_mut()[idx]);
            true
        }
        None => false,
    }
}

/// Record a compression result on the card named `name`.
///
/// The summary is appended, never replacing earlier ones, and the
/// cooldown restarts. A plain-id card starts carrying metadata from here
/// on. Returns whether the card was found.
pub fn on_compression_complete(
    store: &mut dyn CardStore,
    name: &str,
    summary: &str,
    turn: u32,
    interval: u32,
) -> bool {
    let Some((idx, mut card)) = find_card(store, name, interval) else {
        warn!(name, "compressed entity has no card");
        return false;
    };
    if !summary.trim().is_empty() {
        card.summary_history.push(SummaryEntry {
            entry: summary.trim().to_string(),
            turn,
        });
    }
    card.cooldown = interval;
    card.auto_aging = true;
    card.write_to(&mut store.cards_mut()[idx]);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryCardStore;

    /// Accepts add requests but never shows the card.
    struct LossyStore {
        cards: Vec<StoryCard>,
        adds: u32,
    }

    impl CardStore for LossyStore {
        fn cards(&self) -> &[StoryCard] {
            &self.cards
        }
        fn cards_mut(&mut self) -> &mut [StoryCard] {
            &mut self.cards
        }
        fn add_card(&mut self, _card: StoryCard) {
            self.adds += 1;
        }
    }

    fn seed(name: &str) -> CardSeed {
        CardSeed {
            name: name.to_string(),
            entry: String::new(),
        }
    }

    #[test]
    fn create_card_writes_metadata() {
        let mut store = MemoryCardStore::new();
        let idx = create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 10).unwrap();
        let card = &store.cards()[idx];
        assert_eq!(card.title, "🎴 Ada");
        assert_eq!(card.card_type, ENTITY_CARD_TYPE);
        let entity = EntityCard::decode(card, 0).unwrap().unwrap();
        assert_eq!(entity.id, "Ada");
        assert_eq!(entity.cooldown, 10);
        assert!(entity.auto_aging);
    }

    #[test]
    fn create_card_updates_existing_entity() {
        let mut store = MemoryCardStore::new();
        create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 10).unwrap();
        assert!(on_compression_complete(&mut store, "Ada", "History: ball", 4, 10));
        create_card(&mut store, "ada", seed("ada"), "[Name: Ada;Age: 30]", 10).unwrap();

        assert_eq!(store.cards().len(), 1);
        let entity = EntityCard::decode(&store.cards()[0], 0).unwrap().unwrap();
        assert_eq!(entity.record, "[Name: Ada;Age: 30]");
        assert_eq!(entity.summary_history.len(), 1);
    }

    #[test]
    fn create_card_times_out_on_lossy_store() {
        let mut store = LossyStore {
            cards: Vec::new(),
            adds: 0,
        };
        let err = create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 10).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::TimedOut {
                title: "🎴 Ada".to_string(),
                attempts: CREATE_ATTEMPTS,
            }
        );
        assert_eq!(store.adds, CREATE_ATTEMPTS);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn config_card_is_found_or_created_once() {
        let mut store = MemoryCardStore::new();
        let a = ensure_config_card(&mut store, "settings").unwrap();
        let b = ensure_config_card(&mut store, "Settings").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.cards().len(), 1);
        assert_eq!(store.cards()[0].title, "🔧 SETTINGS");
        assert_eq!(store.cards()[0].card_type, CONFIG_CARD_TYPE);
    }

    #[test]
    fn trigger_keys_short_and_long_names() {
        let short = trigger_keys("Ada Lovelace");
        assert!(short.starts_with("Ada, Ada , Ada'"));
        assert!(short.chars().count() <= MAX_KEYS_LEN);

        let long = trigger_keys("Frostspire_Keep");
        assert!(long.starts_with("Frostspire,Frostspire , Frostspire"));
        assert!(long.chars().count() <= MAX_KEYS_LEN);

        let huge = "x".repeat(150);
        assert_eq!(trigger_keys(&huge).chars().count(), MAX_KEYS_LEN);
    }

    #[test]
    fn aging_warns_once_at_zero() {
        let mut store = MemoryCardStore::new();
        create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 2).unwrap();

        assert!(age_cards(&mut store, 10).is_empty());
        assert_eq!(age_cards(&mut store, 10), vec!["🎴 Ada".to_string()]);
        // Already at zero: no further decrement or warning.
        assert!(age_cards(&mut store, 10).is_empty());

        let due = due_for_compression(&store, 10);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, "Ada");
        assert_eq!(due[0].1, "[Name: Ada]");
    }

    #[test]
    fn plain_cards_never_age() {
        let mut store = MemoryCardStore::with_cards(vec![StoryCard {
            id: "Byron".to_string(),
            title: "🎴 Byron".to_string(),
            card_type: ENTITY_CARD_TYPE.to_string(),
            ..StoryCard::default()
        }]);
        for _ in 0..20 {
            assert!(age_cards(&mut store, 1).is_empty());
        }
        assert!(due_for_compression(&store, 1).is_empty());
        assert_eq!(store.cards()[0].id, "Byron");
    }

    #[test]
    fn summaries_accumulate() {
        let mut store = MemoryCardStore::new();
        create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 0).unwrap();
        assert!(on_compression_complete(&mut store, "Ada", "History: ball", 3, 10));
        assert!(on_compression_complete(&mut store, "Ada", "Threats: debt", 9, 10));

        let (_, card) = find_card(&store, "ADA", 10).unwrap();
        assert_eq!(card.cooldown, 10);
        assert_eq!(
            card.summary_history
                .iter()
                .map(|s| (s.entry.as_str(), s.turn))
                .collect::<Vec<_>>(),
            vec![("History: ball", 3), ("Threats: debt", 9)]
        );
        assert_eq!(compression_seed(&card), "[Name: Ada]\nHistory: ball\nThreats: debt");
        assert!(!on_compression_complete(&mut store, "Nobody", "x", 1, 10));
    }

    #[test]
    fn known_entries_dedup_by_key() {
        let mut store = MemoryCardStore::new();
        create_card(&mut store, "Ada", seed("Ada"), "[Name: Ada]", 5).unwrap();
        store.add_card(StoryCard {
            id: "ada".to_string(),
            title: "🎴 ada".to_string(),
            card_type: ENTITY_CARD_TYPE.to_string(),
            ..StoryCard::default()
        });
        create_card(&mut store, "Tokyo", seed("Tokyo"), "[Name: Tokyo]", 5).unwrap();
        assert_eq!(known_entries(&store, 5), vec!["Ada", "Tokyo"]);
    }

    #[test]
    fn malformed_metadata_is_skipped() {
        let store = MemoryCardStore::with_cards(vec![StoryCard {
            id: "{broken".to_string() + "}",
            title: "🎴 Broken".to_string(),
            card_type: ENTITY_CARD_TYPE.to_string(),
            ..StoryCard::default()
        }]);
        assert!(entity_cards(&store, 10).is_empty());
    }
}
