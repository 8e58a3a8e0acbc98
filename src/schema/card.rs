use serde::{Deserialize, Serialize};

/// Card type of generated entity cards.
pub const ENTITY_CARD_TYPE: &str = "MC_CARD";
/// Card type of settings and per-profile config cards.
pub const CONFIG_CARD_TYPE: &str = "MC_CONFIG";
/// Title prefix of generated entity cards.
pub const ENTITY_TITLE_PREFIX: &str = "🎴 ";
/// Title prefix of config cards.
pub const CONFIG_TITLE_PREFIX: &str = "🔧 ";

/// A card as the host stores it. Field meanings follow the host's card
/// API; this crate only interprets `id` (see [`CardId`]) and `entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryCard {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub keys: String,
    #[serde(default)]
    pub entry: String,
    #[serde(rename = "type")]
    pub card_type: String,
    #[serde(default)]
    pub description: String,
}

/// The seed a card was generated from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSeed {
    pub name: String,
    #[serde(default)]
    pub entry: String,
}

/// One compression output, with the turn it was produced on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub entry: String,
    pub turn: u32,
}

/// Lifecycle metadata stored in a managed card's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMeta {
    pub id: String,
    #[serde(default)]
    pub data: CardSeed,
    pub cooldown: u32,
    #[serde(default)]
    pub summary: Vec<SummaryEntry>,
}

/// A decoded card identifier.
///
/// Identifiers shaped like a JSON object are reserved for lifecycle
/// metadata; anything else is a plain, user-visible identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardId {
    Managed(CardMeta),
    Plain(String),
}

impl CardId {
    pub fn is_reserved(raw: &str) -> bool {
        let raw = raw.trim();
        raw.starts_with('{') && raw.ends_with('}')
    }

    pub fn decode(raw: &str) -> Result<CardId, serde_json::Error> {
        if Self::is_reserved(raw) {
            Ok(CardId::Managed(serde_json::from_str(raw.trim())?))
        } else {
            Ok(CardId::Plain(raw.to_string()))
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // CardMeta has only string/number fields; serialization cannot fail.
            CardId::Managed(meta) => serde_json::to_string(meta).unwrap_or_default(),
            CardId::Plain(id) => id.clone(),
        }
    }
}

/// Decoded view of a generated entity card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCard {
    pub id: String,
    pub record: String,
    pub cooldown: u32,
    pub summary_history: Vec<SummaryEntry>,
    pub seed: CardSeed,
    /// Only cards carrying lifecycle metadata age and get recompressed.
    pub auto_aging: bool,
}

impl EntityCard {
    /// Decode an entity card. Returns `Ok(None)` for cards of other types.
    ///
    /// Plain-id cards get `default_cooldown` and do not age.
    pub fn decode(
        card: &StoryCard,
        default_cooldown: u32,
    ) -> Result<Option<EntityCard>, serde_json::Error> {
        if card.card_type != ENTITY_CARD_TYPE {
            return Ok(None);
        }
        let decoded = match CardId::decode(&card.id)? {
            CardId::Managed(meta) => EntityCard {
                id: meta.id,
                record: card.entry.clone(),
                cooldown: meta.cooldown,
                summary_history: meta.summary,
                seed: meta.data,
                auto_aging: true,
            },
            CardId::Plain(id) => {
                let id = if id.trim().is_empty() {
                    card.title
                        .trim_start_matches(ENTITY_TITLE_PREFIX)
                        .trim()
                        .to_string()
                } else {
                    id
                };
                EntityCard {
                    seed: CardSeed {
                        name: id.clone(),
                        entry: String::new(),
                    },
                    id,
                    record: card.entry.clone(),
                    cooldown: default_cooldown,
                    summary_history: Vec::new(),
                    auto_aging: false,
                }
            }
        };
        Ok(Some(decoded))
    }

    /// Metadata to persist for a managed card.
    pub fn meta(&self) -> CardMeta {
        CardMeta {
            id: self.id.clone(),
            data: self.seed.clone(),
            cooldown: self.cooldown,
            summary: self.summary_history.clone(),
        }
    }

    /// Write lifecycle metadata and record back into the host card.
    /// Plain-id cards keep their identifier.
    pub fn write_to(&self, card: &mut StoryCard) {
        if self.auto_aging {
            card.id = CardId::Managed(self.meta()).encode();
        }
        card.entry = self.record.clone();
    }
}
