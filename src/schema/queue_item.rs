use serde::{Deserialize, Serialize};

use super::profile::{CategorySchedule, EntityType, TypeProfile};
use crate::core::plist::Loaded;

/// Per-item limits, copied from the profile when the item is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Categories that must be loaded before the item is complete.
    /// Frozen to the loaded count once retries run out.
    pub category_count: usize,
    pub char_budget: usize,
    pub retries_remaining: u32,
}

/// One pending or in-progress generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub name: String,
    pub entry: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    /// The profile's schedule when the item was queued. Config card edits
    /// apply to items queued afterwards.
    pub schedule: CategorySchedule,
    /// Raw model text seen so far, across retries.
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub loaded: Loaded,
    pub limits: Limits,
    #[serde(default)]
    pub progress: f64,
}

impl QueueItem {
    /// Create an item for `profile`. The name and entry are normalized.
    pub fn new(name: &str, entry: &str, profile: &TypeProfile) -> QueueItem {
        QueueItem {
            name: normalize_name(name),
            entry: entry.trim().to_string(),
            kind: profile.kind,
            schedule: profile.schedule.clone(),
            output: String::new(),
            loaded: Loaded::default(),
            limits: Limits {
                category_count: profile.category_limit(),
                char_budget: profile.limits.card,
                retries_remaining: profile.limits.retry,
            },
            progress: 0.0,
        }
    }

    /// Lowercased first token of the name, used for dedup.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Whether this item and `other` refer to the same entity.
    pub fn same_entity(&self, other: &QueueItem) -> bool {
        self.name_key() == other.name_key()
    }
}

/// Trim and strip punctuation (anything but word characters and whitespace),
/// collapsing runs of whitespace.
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased first token of a name, splitting on whitespace and `_`.
pub fn name_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_')
        .find(|t| !t.is_empty())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize_name("  Dr. Ada   Lovelace!! "), "Dr Ada Lovelace");
        assert_eq!(normalize_name("Frost_spire"), "Frost_spire");
        assert_eq!(normalize_name("\"?!\""), "");
    }

    #[test]
    fn name_key_takes_first_token() {
        assert_eq!(name_key("David Red"), "david");
        assert_eq!(name_key("david_red"), "david");
        assert_eq!(name_key("  "), "");
    }

    #[test]
    fn new_item_copies_profile_limits() {
        let profile = TypeProfile::characters();
        let item = QueueItem::new("Ada, the Countess", "met at the ball", &profile);
        assert_eq!(item.name, "Ada the Countess");
        assert_eq!(item.kind, EntityType::Characters);
        assert_eq!(item.schedule, profile.schedule);
        assert_eq!(item.limits.category_count, profile.schedule.len());
        assert_eq!(item.limits.char_budget, 800);
        assert_eq!(item.limits.retries_remaining, 2);
        assert_eq!(item.progress, 0.0);
        assert!(item.loaded.is_empty());
    }

    #[test]
    fn same_entity_compares_first_token() {
        let profile = TypeProfile::characters();
        let a = QueueItem::new("Ada Lovelace", "", &profile);
        let b = QueueItem::new("ADA", "", &profile);
        let c = QueueItem::new("Byron", "", &profile);
        assert!(a.same_entity(&b));
        assert!(!a.same_entity(&c));
    }

    #[test]
    fn serializes_kind_as_type() {
        let item = QueueItem::new("Ada", "", &TypeProfile::locations());
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"Locations\""));
        assert!(json.contains("\"schedule\":[\"Name\","));
        let back: QueueItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
