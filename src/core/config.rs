/// Runtime configuration: process-wide settings, per-type profiles, and
/// the host-editable config cards both are mirrored to.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::profile::{
    CategorySchedule, EntityType, LimitConfig, ScheduleError, TypeProfile, NAME_CATEGORY,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid value for `{key}`: {value:?}")]
    Malformed { key: String, value: String },
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Process-wide switches, stored on the settings card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub enabled: bool,
    /// Turns between automatic retrieval passes, and the cooldown a fresh
    /// card starts with. Never zero.
    pub cooldown_interval: u32,
    /// Turn before which explicitly queued items do not start.
    pub min_turns: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_interval: 10,
            min_turns: 1,
        }
    }
}

impl Settings {
    /// Parse `key: value` lines from a settings card. Unknown keys are
    /// ignored and absent keys keep their defaults.
    pub fn parse_card(text: &str) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();
        for (key, value) in card_lines(text) {
            match key.to_ascii_lowercase().as_str() {
                "enabled" => settings.enabled = parse_bool(key, value)?,
                "cooldown" | "cooldowninterval" | "cooldown_interval" => {
                    let interval = parse_u32(key, value)?;
                    if interval == 0 {
                        return Err(malformed(key, value));
                    }
                    settings.cooldown_interval = interval;
                }
                "minturns" | "min_turns" => settings.min_turns = parse_u32(key, value)?,
                _ => {}
            }
        }
        Ok(settings)
    }

    pub fn to_card_text(&self) -> String {
        format!(
            "enabled: {}\ncooldown: {}\nminTurns: {}",
            self.enabled, self.cooldown_interval, self.min_turns
        )
    }
}

/// Profiles keyed by entity type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSet {
    pub profiles: FxHashMap<EntityType, TypeProfile>,
}

impl ProfileSet {
    /// The built-in profile for every entity type.
    pub fn builtin() -> ProfileSet {
        let mut set = ProfileSet::default();
        for kind in EntityType::ALL {
            set.insert(TypeProfile::builtin(kind));
        }
        set
    }

    /// Load a profile list from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ProfileSet, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a RON list of profiles. Later entries for the same type win.
    pub fn parse_ron(input: &str) -> Result<ProfileSet, ConfigError> {
        let raw: Vec<TypeProfile> = ron::from_str(input)?;
        let mut set = ProfileSet::default();
        for profile in raw {
            set.insert(profile);
        }
        Ok(set)
    }

    pub fn insert(&mut self, profile: TypeProfile) {
        self.profiles.insert(profile.kind, profile);
    }

    /// Merge another set into this one. Profiles from `other` replace
    /// profiles of the same type.
    pub fn merge(&mut self, other: ProfileSet) {
        for (kind, profile) in other.profiles {
            self.profiles.insert(kind, profile);
        }
    }

    pub fn get(&self, kind: EntityType) -> Option<&TypeProfile> {
        self.profiles.get(&kind)
    }

    /// Profile for `kind`, falling back to the resume profile and then to
    /// the built-in one.
    pub fn resolve(&self, kind: EntityType) -> TypeProfile {
        match self.get(kind) {
            Some(profile) => profile.clone(),
            None => {
                let mut fallback = self
                    .get(EntityType::Resume)
                    .cloned()
                    .unwrap_or_else(|| TypeProfile::builtin(kind));
                fallback.kind = kind;
                fallback
            }
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Render the editable part of a profile for its config card.
///
/// The AI instruction lives in the card description; newlines in the
/// user template are written as a literal `\n` so each key stays on one
/// line.
pub fn profile_card_text(profile: &TypeProfile) -> String {
    let categories: Vec<&str> = profile
        .schedule
        .iter()
        .filter(|c| *c != NAME_CATEGORY)
        .collect();
    format!(
        "category: [{}]\nlimit: {{card: {}, retry: {}}}\nuser: {}\nexample: {}",
        categories.join(", "),
        profile.limits.card,
        profile.limits.retry,
        escape_newlines(&profile.instruction.user),
        escape_newlines(&profile.instruction.example),
    )
}

/// Apply a config card's entry and description on top of `base`.
pub fn apply_profile_card(
    base: &TypeProfile,
    entry: &str,
    description: &str,
) -> Result<TypeProfile, ConfigError> {
    let mut profile = base.clone();
    for (key, value) in card_lines(entry) {
        match key.to_ascii_lowercase().as_str() {
            "category" => {
                let categories: Vec<&str> = value
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .collect();
                // `[]` leaves only the implicit Name category.
                profile.schedule = if categories.is_empty() {
                    CategorySchedule::new([NAME_CATEGORY])?
                } else {
                    CategorySchedule::new(categories)?
                };
            }
            "limit" => profile.limits = parse_limits(key, value, profile.limits)?,
            "user" => profile.instruction.user = unescape_newlines(value),
            "example" => profile.instruction.example = unescape_newlines(value),
            _ => {}
        }
    }
    if !description.trim().is_empty() {
        profile.instruction.ai = description.trim().to_string();
    }
    Ok(profile)
}

/// `{card: 800, retry: 2}`; missing fields keep `current`.
fn parse_limits(key: &str, value: &str, current: LimitConfig) -> Result<LimitConfig, ConfigError> {
    let inner = value.trim();
    let inner = inner
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .ok_or_else(|| malformed(key, value))?;
    let mut limits = current;
    for pair in inner.split(',').filter(|p| !p.trim().is_empty()) {
        let (k, v) = pair.split_once(':').ok_or_else(|| malformed(key, value))?;
        match k.trim().to_ascii_lowercase().as_str() {
            "card" => {
                limits.card = v.trim().parse().map_err(|_| malformed(key, value))?;
            }
            "retry" => limits.retry = parse_u32(key, v)?,
            _ => return Err(malformed(key, value)),
        }
    }
    Ok(limits)
}

fn card_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        let value = value.trim().trim_end_matches(';').trim();
        if key.is_empty() || value.is_empty() {
            None
        } else {
            Some((key, value))
        }
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(malformed(key, value)),
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| malformed(key, value))
}

fn malformed(key: &str, value: &str) -> ConfigError {
    ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn escape_newlines(s: &str) -> String {
    s.replace('\n', "\\n")
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}
