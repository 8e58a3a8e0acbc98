use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category every schedule starts with.
pub const NAME_CATEGORY: &str = "Name";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("category schedule is empty")]
    Empty,
    #[error("blank category name at position {0}")]
    BlankCategory(usize),
}

/// The kind of record a queue item generates.
///
/// Selects the profile (schedule, limits, instruction) used for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Characters,
    Locations,
    /// Name harvesting pass over the recent story.
    Retrieve,
    /// Periodic re-summarization of an existing card.
    Compress,
    /// Fallback profile: resume from the interruption point.
    Resume,
}

impl Default for EntityType {
    fn default() -> Self {
        Self::Characters
    }
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        Self::Characters,
        Self::Locations,
        Self::Retrieve,
        Self::Compress,
        Self::Resume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Characters => "Characters",
            Self::Locations => "Locations",
            Self::Retrieve => "Retrieve",
            Self::Compress => "Compress",
            Self::Resume => "Default",
        }
    }

    /// Whether items of this kind are filled incrementally as a PList
    /// across several turns. Retrieve and Compress are one-shot passes.
    pub fn is_plist(&self) -> bool {
        matches!(self, Self::Characters | Self::Locations | Self::Resume)
    }
}

/// Ordered, non-empty list of categories for one entity type.
///
/// Earlier categories have higher priority: truncation drops from the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategorySchedule {
    categories: Vec<String>,
}

impl CategorySchedule {
    /// Build a schedule. `Name` is always moved to the front and
    /// duplicates (case-insensitive) are dropped, keeping the first.
    pub fn new<I, S>(categories: I) -> Result<CategorySchedule, ScheduleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = vec![NAME_CATEGORY.to_string()];
        let mut seen_any = false;
        for (i, cat) in categories.into_iter().enumerate() {
            seen_any = true;
            let cat = cat.as_ref().trim();
            if cat.is_empty() {
                return Err(ScheduleError::BlankCategory(i));
            }
            if !out.iter().any(|c| c.eq_ignore_ascii_case(cat)) {
                out.push(cat.to_string());
            }
        }
        if !seen_any {
            return Err(ScheduleError::Empty);
        }
        Ok(CategorySchedule { categories: out })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// Categories from lowest to highest priority.
    pub fn truncation_order(&self) -> impl Iterator<Item = &str> {
        self.iter().rev()
    }

    /// Resolve a key to its canonical category name (case-insensitive).
    pub fn canonical(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.iter().find(|c| c.eq_ignore_ascii_case(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.canonical(key).is_some()
    }

    /// Priority string used in instructions: `Name>Age>...`.
    pub fn priority_line(&self) -> String {
        self.categories.join(">")
    }
}

impl TryFrom<Vec<String>> for CategorySchedule {
    type Error = ScheduleError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        CategorySchedule::new(value)
    }
}

impl From<CategorySchedule> for Vec<String> {
    fn from(value: CategorySchedule) -> Self {
        value.categories
    }
}

/// Size and retry limits configured per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Character budget of a finished card record.
    pub card: usize,
    /// Stalled evaluations tolerated before the category limit freezes.
    pub retry: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            card: 800,
            retry: 2,
        }
    }
}

/// Instruction template. `$1` is the entity name, `$2` the seed entry,
/// `$3` the PList accumulated so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub ai: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub example: String,
}

/// Everything the pipeline needs to generate one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeProfile {
    pub kind: EntityType,
    pub schedule: CategorySchedule,
    #[serde(default)]
    pub limits: LimitConfig,
    pub instruction: Instruction,
}

const DEFAULT_USER_TEMPLATE: &str = "\n$2\n$1 = $3";

impl TypeProfile {
    pub fn characters() -> TypeProfile {
        let schedule = schedule_of(&[
            "Age",
            "Gender",
            "Personality",
            "Appearance",
            "Quirks",
            "Mannerisms",
            "Flaws",
            "Likes",
            "Dislikes",
            "Occupation",
            "Backstory",
            "Hobbies",
            "Other",
        ]);
        let example = "[Name: David Red;Gender: male;Personality: confident(underestimates_threats);Quirks: scratches_neck(thinking),quick_to_smile(hides_emotions); ...]";
        let ai = plist_instruction(
            &schedule,
            &[
                "- Link psych-behavior",
                "- Appearance: clothing per occasion if known",
            ],
            "Include current context and memory.",
            example,
        );
        TypeProfile {
            kind: EntityType::Characters,
            schedule,
            limits: LimitConfig::default(),
            instruction: Instruction {
                ai,
                user: DEFAULT_USER_TEMPLATE.to_string(),
                example: example.to_string(),
            },
        }
    }

    pub fn locations() -> TypeProfile {
        let schedule = schedule_of(&[
            "Location",
            "Unique Features",
            "Setting",
            "Factions",
            "Threats",
            "Society",
            "Government",
            "Military",
            "Cultural Traits",
            "Economy",
            "Religion",
            "Other",
        ]);
        let example = "[Name: Tokyo, Japan;Location: Japan(country);Setting: urban_realism(techno-traditional);Factions: political_establishment(coalition); ...]";
        let ai = plist_instruction(
            &schedule,
            &["- Exclude generics, metaphors, unknowns and irrelevant categories"],
            "",
            example,
        );
        TypeProfile {
            kind: EntityType::Locations,
            schedule,
            limits: LimitConfig::default(),
            instruction: Instruction {
                ai,
                user: DEFAULT_USER_TEMPLATE.to_string(),
                example: example.to_string(),
            },
        }
    }

    pub fn retrieve() -> TypeProfile {
        let ai = [
            "[System: Extract names from current context and memory without repetition. Plain text. Be concise/grounded. Output lines:",
            "Characters: name1, name2, ...;",
            "Locations: name1, name2, ...;",
            "- Only plot-relevant explicit character and place names",
            "- Auto-complete partials",
            "- Remove dupes",
            "- Exclude objects, generics, metaphors, unknowns, $2",
            "- 4 max per line",
            "]",
        ]
        .join("\n");
        TypeProfile {
            kind: EntityType::Retrieve,
            schedule: name_only(),
            limits: LimitConfig::default(),
            instruction: Instruction {
                ai,
                user: String::new(),
                example: String::new(),
            },
        }
    }

    pub fn compress() -> TypeProfile {
        let schedule = schedule_of(&["History", "Threats", "Other"]);
        let ai = [
            "[System: Summarize events from current context and memory without repetition. Plain text. Be concise/grounded. Output name and lines:",
            "Name: $1;",
            "History: history1, history2, ...;",
            "Threats: threat1, threat2, ...;",
            "Other: other1, other2, ...;",
            "- Only plot-relevant explicit details",
            "- Remove dupes",
            "- Exclude $1's traits, objects, generics, unknowns",
            "- Never exceed character count of 500",
            "]",
        ]
        .join("\n");
        TypeProfile {
            kind: EntityType::Compress,
            schedule,
            limits: LimitConfig::default(),
            instruction: Instruction {
                ai,
                user: "\n$2".to_string(),
                example: "[Name: David Red;History: previous_collaboration(built_trust);Threats: class_warfare; ...]".to_string(),
            },
        }
    }

    pub fn resume() -> TypeProfile {
        TypeProfile {
            kind: EntityType::Resume,
            schedule: name_only(),
            limits: LimitConfig::default(),
            instruction: Instruction {
                ai: "[System: Resume from exact pre-interruption point.]".to_string(),
                user: DEFAULT_USER_TEMPLATE.to_string(),
                example: String::new(),
            },
        }
    }

    /// Built-in profile for `kind`.
    pub fn builtin(kind: EntityType) -> TypeProfile {
        match kind {
            EntityType::Characters => Self::characters(),
            EntityType::Locations => Self::locations(),
            EntityType::Retrieve => Self::retrieve(),
            EntityType::Compress => Self::compress(),
            EntityType::Resume => Self::resume(),
        }
    }

    /// Number of categories an item must load to be complete.
    pub fn category_limit(&self) -> usize {
        self.schedule.len()
    }
}

fn schedule_of(categories: &[&str]) -> CategorySchedule {
    CategorySchedule {
        categories: std::iter::once(NAME_CATEGORY)
            .chain(categories.iter().copied())
            .map(str::to_string)
            .collect(),
    }
}

fn name_only() -> CategorySchedule {
    CategorySchedule {
        categories: vec![NAME_CATEGORY.to_string()],
    }
}

fn plist_instruction(
    schedule: &CategorySchedule,
    extra_rules: &[&str],
    context_hint: &str,
    example: &str,
) -> String {
    let mut lines = vec![
        format!(
            "[System: Update PList from \"$1\" without repetition. Complete partials. Be concise/grounded. {}",
            context_hint
        )
        .trim_end()
        .to_string(),
        String::new(),
        "PList Rules:".to_string(),
        "1. Format: [CAT:TRAIT(DESC)[,...];...]".to_string(),
        format!("2. Priority: {}", schedule.priority_line()),
        "3. Traits:".to_string(),
        "- Max 3 nests (trait(sub(sub)))".to_string(),
        "- No word/synonym repetition".to_string(),
        "- Snake_case".to_string(),
    ];
    lines.extend(extra_rules.iter().map(|r| r.to_string()));
    lines.extend(
        [
            "4. Truncation: complete current CAT/TRAIT/DESC, auto-close symbols, never break mid-trait",
            "5. Generate in sequence by Priority order",
            "6. Output: PList continuation from exact interruption point",
            "Output Format:",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    lines.push(example.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_puts_name_first_and_dedups() {
        let s = CategorySchedule::new(["Age", "name", "Age", "Gender"]).unwrap();
        assert_eq!(s.iter().collect::<Vec<_>>(), vec!["Name", "Age", "Gender"]);
    }

    #[test]
    fn schedule_rejects_empty_and_blank() {
        let empty: [&str; 0] = [];
        assert_eq!(CategorySchedule::new(empty), Err(ScheduleError::Empty));
        assert_eq!(
            CategorySchedule::new(["Age", "  "]),
            Err(ScheduleError::BlankCategory(1))
        );
    }

    #[test]
    fn canonical_lookup_is_case_insensitive() {
        let s = CategorySchedule::new(["Unique Features"]).unwrap();
        assert_eq!(s.canonical("unique features"), Some("Unique Features"));
        assert_eq!(s.canonical(" NAME "), Some("Name"));
        assert!(!s.contains("Religion"));
    }

    #[test]
    fn truncation_order_is_reverse_schedule() {
        let s = CategorySchedule::new(["Age", "Gender"]).unwrap();
        assert_eq!(
            s.truncation_order().collect::<Vec<_>>(),
            vec!["Gender", "Age", "Name"]
        );
    }

    #[test]
    fn builtin_profiles_limit_matches_schedule() {
        for kind in EntityType::ALL {
            let p = TypeProfile::builtin(kind);
            assert_eq!(p.kind, kind);
            assert_eq!(p.category_limit(), p.schedule.len());
            assert_eq!(p.schedule.iter().next(), Some(NAME_CATEGORY));
        }
    }

    #[test]
    fn plist_profiles_mention_priority_and_placeholders() {
        let p = TypeProfile::characters();
        assert!(p.instruction.ai.contains("Name>Age>Gender"));
        assert!(p.instruction.ai.contains("$1"));
        assert!(p.instruction.user.contains("$3"));
    }

    #[test]
    fn only_record_kinds_are_plist() {
        assert!(EntityType::Characters.is_plist());
        assert!(EntityType::Resume.is_plist());
        assert!(!EntityType::Retrieve.is_plist());
        assert!(!EntityType::Compress.is_plist());
    }

    #[test]
    fn schedule_ron_round_trip() {
        let p = TypeProfile::locations();
        let serialized = ron::to_string(&p).unwrap();
        let back: TypeProfile = ron::from_str(&serialized).unwrap();
        assert_eq!(back, p);
    }
}
