/// Prompt assembly: context cleanup, instruction templating, and reading
/// the one-shot retrieval and compression replies.

use crate::core::plist::parse_fragment;
use crate::schema::profile::{CategorySchedule, EntityType, TypeProfile, NAME_CATEGORY};
use crate::schema::queue_item::normalize_name;

const SECTION_HEADERS: [&str; 3] = ["World Lore:", "Recent Story:", "Story Summary:"];
/// Characters that mark a line as status output rather than story.
const STATUS_MARKERS: [char; 2] = ['🎴', '⚠'];

/// Drop status lines left by earlier turns and make section headers single
/// tokens (`Recent Story:` becomes `Recent_Story:`).
pub fn clean_context(text: &str) -> String {
    text.lines()
        .filter(|line| !line.contains(STATUS_MARKERS))
        .map(|line| {
            let mut line = line.to_string();
            for header in SECTION_HEADERS {
                if line.contains(header) {
                    line = line.replace(header, &header.replace(' ', "_"));
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill `$1` (name), `$2` (entry) and `$3` (list so far). A literal `\n`
/// in the template becomes a newline.
pub fn substitute(template: &str, name: &str, entry: &str, list: &str) -> String {
    let template = template.replace("\\n", "\n");
    let mut out = String::with_capacity(template.len() + entry.len() + list.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '$' {
            let value = match chars.peek() {
                Some('1') => Some(name),
                Some('2') => Some(entry),
                Some('3') => Some(list),
                _ => None,
            };
            if let Some(value) = value {
                chars.next();
                out.push_str(value);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// The instruction appended to the context for one generation step.
pub fn build_instruction(profile: &TypeProfile, name: &str, entry: &str, list: &str) -> String {
    let template = format!("{}\n{}", profile.instruction.ai, profile.instruction.user);
    substitute(&template, name, entry, list)
}

/// Placeholder names a retrieval reply uses for "nothing found".
fn is_placeholder(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["none", "n/a", "unknown", "not found", "notfound"]
        .iter()
        .any(|p| lower.contains(p))
}

/// Names listed in a retrieval reply, as `(type, name)` pairs in order.
///
/// Reads `Characters: a, b;` and `Locations: c;` lines, skipping
/// placeholders and names without an uppercase letter.
pub fn harvest_names(reply: &str) -> Vec<(EntityType, String)> {
    let mut out = Vec::new();
    for line in reply.lines() {
        for kind in [EntityType::Characters, EntityType::Locations] {
            let label = format!("{}:", kind.name());
            let Some(pos) = line.find(&label) else {
                continue;
            };
            let list = &line[pos + label.len()..];
            let list = match list.rfind(';') {
                Some(end) => &list[..end],
                None => list,
            };
            for raw in list.split(',') {
                if is_placeholder(raw) || !raw.chars().any(char::is_uppercase) {
                    continue;
                }
                let name = normalize_name(raw);
                if !name.is_empty() {
                    out.push((kind, name));
                }
            }
        }
    }
    out
}

/// The summary fragment of a compression reply: every schedule line but
/// `Name`, as `CAT: value` joined with `;`.
pub fn extract_summary(reply: &str, schedule: &CategorySchedule) -> String {
    // Lines may end without `;`; a trailing newline closes the last one.
    let text = format!("{}\n", reply);
    let parsed = parse_fragment(&text, schedule);
    schedule
        .iter()
        .filter(|cat| *cat != NAME_CATEGORY)
        .filter_map(|cat| parsed.entries.get(cat).map(|v| format!("{}: {}", cat, v)))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_context_strips_status_lines() {
        let text = "World Lore:\nA cold city.\n- 🎴 ◖Ada◗ 🢂 Generating...\n⚠️ /AC ◖Ada◗ 🢂 Already in queue.\nRecent Story:\nShe waits.";
        assert_eq!(
            clean_context(text),
            "World_Lore:\nA cold city.\nRecent_Story:\nShe waits."
        );
    }

    #[test]
    fn substitute_placeholders() {
        assert_eq!(
            substitute("$1 is $2\\n$1 = $3 ($4)", "Ada", "a countess", "[Name: Ada;"),
            "Ada is a countess\nAda = [Name: Ada; ($4)"
        );
        assert_eq!(substitute("cost $", "a", "b", "c"), "cost $");
    }

    #[test]
    fn instruction_joins_ai_and_user() {
        let profile = TypeProfile::characters();
        let out = build_instruction(&profile, "Ada", "seed", "[Name: Ada;");
        assert!(out.contains("Update PList from \"Ada\""));
        assert!(out.ends_with("\nseed\nAda = [Name: Ada;"));
        assert!(!out.contains("$1"));
    }

    #[test]
    fn harvest_reads_both_lines() {
        let reply = "Characters: Ada Lovelace, the guard, None;\nLocations: Tokyo, Frostspire Keep;";
        assert_eq!(
            harvest_names(reply),
            vec![
                (EntityType::Characters, "Ada Lovelace".to_string()),
                (EntityType::Locations, "Tokyo".to_string()),
                (EntityType::Locations, "Frostspire Keep".to_string()),
            ]
        );
    }

    #[test]
    fn harvest_skips_placeholders() {
        let reply = "Characters: N/A;\nLocations: Unknown, Not found;";
        assert!(harvest_names(reply).is_empty());
        assert!(harvest_names("nothing here").is_empty());
    }

    #[test]
    fn summary_keeps_schedule_lines() {
        let profile = TypeProfile::compress();
        let reply = "Name: Ada;\nHistory: met_byron, left_london;\nThreats: debt;\nMood: grim;";
        assert_eq!(
            extract_summary(reply, &profile.schedule),
            "History: met_byron, left_london;Threats: debt"
        );
    }

    #[test]
    fn summary_without_semicolons() {
        let profile = TypeProfile::compress();
        assert_eq!(extract_summary("History: duel\nOther: scar", &profile.schedule), "History: duel;Other: scar");
    }
}
