/// PList codec — tokenizing, merging, serializing and truncating
/// `[CAT: TRAIT(DESC);...]` records.

use serde::{Deserialize, Serialize};

use crate::schema::profile::CategorySchedule;

/// Category values accepted so far, in discovery order.
///
/// Insertion is first-writer-wins: a category is never overwritten once
/// it has a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Loaded {
    entries: Vec<(String, String)>,
}

impl Loaded {
    pub fn get(&self, category: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == category)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.get(category).is_some()
    }

    /// Insert unless the category already has a value. Returns whether
    /// the value was inserted.
    pub fn insert(&mut self, category: &str, value: &str) -> bool {
        if self.contains(category) {
            return false;
        }
        self.entries.push((category.to_string(), value.to_string()));
        true
    }

    pub fn remove(&mut self, category: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != category);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of `schedule` categories that have a value.
    pub fn count_in(&self, schedule: &CategorySchedule) -> usize {
        schedule.iter().filter(|cat| self.contains(cat)).count()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Loaded {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut loaded = Loaded::default();
        for (k, v) in iter {
            let (k, v) = (k.into(), v.into());
            loaded.insert(&k, &v);
        }
        loaded
    }
}

/// Result of scanning one piece of model output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFragment {
    pub entries: Loaded,
    /// A closing `]` was seen; the model closed the record.
    pub saw_terminator: bool,
}

/// Scan `text` for `CATEGORY: VALUE` tokens.
///
/// Grammar:
/// - `;` separates tokens, except inside parentheses, so
///   `trait(sub(a;b))` stays one value
/// - a newline outside parentheses ends a token that already has a `:`
/// - `[` opens a record and discards prose accumulated before it
/// - the first `]` closes the token in progress and stops the scan
/// - a trailing token with no separator is incomplete and dropped
///
/// Keys not in `schedule` are ignored; matching keys are stored under
/// their canonical schedule spelling.
pub fn parse_fragment(text: &str, schedule: &CategorySchedule) -> ParsedFragment {
    let mut entries = Loaded::default();
    let mut token = String::new();
    let mut depth = 0usize;

    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                token.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                token.push(ch);
            }
            ';' if depth == 0 => {
                accept_token(&token, schedule, &mut entries);
                token.clear();
            }
            '\n' if depth == 0 && token.contains(':') => {
                accept_token(&token, schedule, &mut entries);
                token.clear();
            }
            '[' if depth == 0 => token.clear(),
            ']' => {
                accept_token(&token, schedule, &mut entries);
                return ParsedFragment {
                    entries,
                    saw_terminator: true,
                };
            }
            _ => token.push(ch),
        }
    }

    ParsedFragment {
        entries,
        saw_terminator: false,
    }
}

fn accept_token(token: &str, schedule: &CategorySchedule, entries: &mut Loaded) {
    let Some((key, value)) = token.split_once(':') else {
        return;
    };
    // Prose lines before the key are not part of it.
    let key = key.rsplit('\n').next().unwrap_or(key).trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return;
    }
    if let Some(category) = schedule.canonical(key) {
        entries.insert(category, value);
    }
}

/// Merge `new` into `existing`, first writer wins. Returns how many
/// categories were added.
pub fn merge(existing: &mut Loaded, new: &Loaded) -> usize {
    let mut added = 0;
    for (category, value) in new.iter() {
        if existing.insert(category, value) {
            added += 1;
        }
    }
    added
}

/// Serialize in schedule order. A complete record is closed with `]`;
/// an open one ends in a dangling `;` so the next prompt continues it.
pub fn serialize(loaded: &Loaded, schedule: &CategorySchedule, complete: bool) -> String {
    let body: Vec<String> = schedule
        .iter()
        .filter_map(|cat| loaded.get(cat).map(|v| format!("{}: {}", cat, v)))
        .collect();
    if complete {
        format!("[{}]", body.join(";"))
    } else if body.is_empty() {
        "[".to_string()
    } else {
        format!("[{};", body.join(";"))
    }
}

/// Drop lowest-priority categories until `serialized` fits in
/// `char_budget` characters. Runs at most once per schedule category;
/// the result is never longer than `max(char_budget, 2)`.
pub fn truncate(serialized: &str, schedule: &CategorySchedule, char_budget: usize) -> String {
    if serialized.chars().count() <= char_budget {
        return serialized.to_string();
    }
    let complete = serialized.trim_end().ends_with(']');
    let mut loaded = parse_fragment(serialized, schedule).entries;
    let mut out = serialized.to_string();

    for category in schedule.truncation_order() {
        if out.chars().count() <= char_budget {
            break;
        }
        loaded.remove(category);
        out = serialize(&loaded, schedule, complete);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_age() -> CategorySchedule {
        CategorySchedule::new(["Age"]).unwrap()
    }

    fn character_schedule() -> CategorySchedule {
        CategorySchedule::new(["Age", "Gender", "Personality", "Other"]).unwrap()
    }

    #[test]
    fn parse_complete_record() {
        let parsed = parse_fragment("Name: Ada;Age: 30;]", &name_age());
        assert!(parsed.saw_terminator);
        assert_eq!(parsed.entries.get("Name"), Some("Ada"));
        assert_eq!(parsed.entries.get("Age"), Some("30"));
    }

    #[test]
    fn parse_accepts_entry_closed_by_bracket() {
        let parsed = parse_fragment("[Name: Ada;Age: 30]", &name_age());
        assert!(parsed.saw_terminator);
        assert_eq!(parsed.entries.len(), 2);
    }

    #[test]
    fn parse_open_record() {
        let parsed = parse_fragment("Name: Ada;", &name_age());
        assert!(!parsed.saw_terminator);
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn parse_drops_unterminated_trailing_token() {
        let parsed = parse_fragment("Name: Ada;Age: 3", &name_age());
        assert_eq!(parsed.entries.len(), 1);
        assert!(!parsed.entries.contains("Age"));
    }

    #[test]
    fn parse_ignores_unknown_keys() {
        let parsed = parse_fragment("Name: Ada;Weapon: sword;Age: 30;", &name_age());
        assert_eq!(parsed.entries.len(), 2);
        assert!(!parsed.entries.contains("Weapon"));
    }

    #[test]
    fn parse_stops_at_first_terminator() {
        let parsed = parse_fragment("Name: Ada] Age: 30;", &name_age());
        assert!(parsed.saw_terminator);
        assert!(!parsed.entries.contains("Age"));
    }

    #[test]
    fn parse_keeps_nested_parentheses_intact() {
        let parsed = parse_fragment(
            "Personality: calm(hides(fear;anger));Gender: female;",
            &character_schedule(),
        );
        assert_eq!(
            parsed.entries.get("Personality"),
            Some("calm(hides(fear;anger))")
        );
        assert_eq!(parsed.entries.get("Gender"), Some("female"));
    }

    #[test]
    fn parse_skips_prose_before_record() {
        let parsed = parse_fragment(
            "Sure! Here is the list: [Name: Ada;Age: 30]",
            &name_age(),
        );
        assert_eq!(parsed.entries.get("Name"), Some("Ada"));
        assert_eq!(parsed.entries.len(), 2);
    }

    #[test]
    fn parse_splits_on_newlines_after_key() {
        let parsed = parse_fragment("Name: Ada\nAge: 30\nsome prose\n", &name_age());
        assert_eq!(parsed.entries.get("Name"), Some("Ada"));
        assert_eq!(parsed.entries.get("Age"), Some("30"));
    }

    #[test]
    fn parse_matches_keys_case_insensitively() {
        let parsed = parse_fragment("name: Ada;AGE: 30;", &name_age());
        assert_eq!(parsed.entries.get("Name"), Some("Ada"));
        assert_eq!(parsed.entries.get("Age"), Some("30"));
    }

    #[test]
    fn parse_first_value_wins_within_fragment() {
        let parsed = parse_fragment("Age: 30;Age: 31;", &name_age());
        assert_eq!(parsed.entries.get("Age"), Some("30"));
    }

    #[test]
    fn merge_never_overwrites() {
        let mut existing: Loaded = [("Name", "Ada")].into_iter().collect();
        let new: Loaded = [("Name", "Eve"), ("Age", "30")].into_iter().collect();
        assert_eq!(merge(&mut existing, &new), 1);
        assert_eq!(existing.get("Name"), Some("Ada"));
        assert_eq!(existing.get("Age"), Some("30"));
    }

    #[test]
    fn serialize_uses_schedule_order() {
        let loaded: Loaded = [("Age", "30"), ("Name", "Ada")].into_iter().collect();
        assert_eq!(serialize(&loaded, &name_age(), true), "[Name: Ada;Age: 30]");
        assert_eq!(serialize(&loaded, &name_age(), false), "[Name: Ada;Age: 30;");
    }

    #[test]
    fn serialize_empty() {
        let loaded = Loaded::default();
        assert_eq!(serialize(&loaded, &name_age(), true), "[]");
        assert_eq!(serialize(&loaded, &name_age(), false), "[");
    }

    #[test]
    fn truncate_drops_lowest_priority_first() {
        let schedule = character_schedule();
        let other = "x".repeat(40);
        let loaded: Loaded = [
            ("Name", "Ada"),
            ("Age", "30"),
            ("Gender", "female"),
            ("Other", other.as_str()),
        ]
        .into_iter()
        .collect();
        let full = serialize(&loaded, &schedule, true);
        let cut = truncate(&full, &schedule, 40);
        assert_eq!(cut, "[Name: Ada;Age: 30;Gender: female]");
    }

    #[test]
    fn truncate_leaves_short_records_alone() {
        let s = "[Name: Ada;Age: 30]";
        assert_eq!(truncate(s, &name_age(), 100), s);
    }

    #[test]
    fn truncate_terminates_below_any_entry() {
        let loaded: Loaded = [("Name", "Ada"), ("Age", "30")].into_iter().collect();
        let full = serialize(&loaded, &name_age(), true);
        assert_eq!(truncate(&full, &name_age(), 0), "[]");
        assert_eq!(truncate("[Name: Ada;Age: 30;", &name_age(), 1), "[");
    }

    #[test]
    fn truncate_discards_unknown_categories() {
        let out = truncate("[Weapon: a very long sword description]", &name_age(), 10);
        assert_eq!(out, "[]");
    }
}
