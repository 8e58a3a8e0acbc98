/// Intake command grammar and acknowledgement formatting.
///
/// Commands are embedded in free player text:
///
/// ```text
/// /ac <name>[; entry]     queue a character
/// /al <name>[; entry]     queue a location
/// /mc <name>[; entry]     queue a character
/// /mc toggle | reset | retrieve
/// /mc compress <name>
/// ```
///
/// A name runs until a quote, `/`, `;`, or the end of the line; the entry
/// runs until the next `;`, `/`, or end of line.

use rustc_hash::FxHashMap;

use crate::schema::profile::EntityType;

pub const OK_EMOJI: &str = "🎴";
pub const WARN_EMOJI: &str = "⚠️";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        kind: EntityType,
        name: String,
        entry: String,
    },
    Toggle,
    Reset,
    Retrieve,
    Compress {
        name: String,
    },
}

/// A command together with the marker it was written with (`/AC`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub marker: String,
    pub command: Command,
}

/// Extract every command from `text`, in order of appearance.
pub fn parse_commands(text: &str) -> Vec<ParsedCommand> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find('/') {
        let after = &rest[pos + 1..];
        let Some((marker, body)) = split_marker(after) else {
            rest = after;
            continue;
        };
        let (name, body) = take_until(body, &['"', '\'', '/', ';', '\n']);
        let (entry, body) = match body.strip_prefix(';') {
            Some(b) => take_until(b, &[';', '/', '\n']),
            None => ("", body),
        };
        rest = body;

        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let command = match marker.as_str() {
            "/AL" => Command::Add {
                kind: EntityType::Locations,
                name: name.to_string(),
                entry: entry.trim().to_string(),
            },
            "/MC" => control_command(name).unwrap_or_else(|| Command::Add {
                kind: EntityType::Characters,
                name: name.to_string(),
                entry: entry.trim().to_string(),
            }),
            _ => Command::Add {
                kind: EntityType::Characters,
                name: name.to_string(),
                entry: entry.trim().to_string(),
            },
        };
        out.push(ParsedCommand { marker, command });
    }
    out
}

fn split_marker(after: &str) -> Option<(String, &str)> {
    let marker = after.get(..2)?.to_ascii_lowercase();
    if !matches!(marker.as_str(), "ac" | "al" | "mc") {
        return None;
    }
    let body = &after[2..];
    if !body.starts_with([' ', '\t']) {
        return None;
    }
    Some((format!("/{}", marker.to_ascii_uppercase()), body))
}

fn take_until<'a>(s: &'a str, stops: &[char]) -> (&'a str, &'a str) {
    let idx = s.find(|c| stops.contains(&c)).unwrap_or(s.len());
    (&s[..idx], &s[idx..])
}

fn control_command(name: &str) -> Option<Command> {
    let mut words = name.split_whitespace();
    let verb = words.next()?.to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();
    match (verb.as_str(), rest.is_empty()) {
        ("toggle", true) => Some(Command::Toggle),
        ("reset", true) => Some(Command::Reset),
        ("retrieve", true) => Some(Command::Retrieve),
        ("compress", false) => Some(Command::Compress {
            name: rest.join(" "),
        }),
        _ => None,
    }
}

/// One acknowledgement produced during intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub emoji: &'static str,
    pub cmd: String,
    pub name: String,
    pub message: String,
}

impl Acknowledgement {
    pub fn ok(cmd: &str, name: &str, message: impl Into<String>) -> Self {
        Self {
            emoji: OK_EMOJI,
            cmd: cmd.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn warn(cmd: &str, name: &str, message: impl Into<String>) -> Self {
        Self {
            emoji: WARN_EMOJI,
            cmd: cmd.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Render acknowledgements one line per `(emoji, cmd, message)` group, in
/// order of first appearance: `🎴 /AC ◖Ada◗ ◖Byron◗ 🢂 Preparing...`.
pub fn render_acknowledgements(acks: &[Acknowledgement]) -> String {
    let mut groups: Vec<(&Acknowledgement, Vec<&str>)> = Vec::new();
    let mut index: FxHashMap<(&str, &str, &str), usize> = FxHashMap::default();
    for ack in acks {
        let key = (ack.emoji, ack.cmd.as_str(), ack.message.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((ack, Vec::new()));
            groups.len() - 1
        });
        if !ack.name.is_empty() && !groups[slot].1.contains(&ack.name.as_str()) {
            groups[slot].1.push(&ack.name);
        }
    }
    groups
        .iter()
        .map(|(ack, names)| {
            if names.is_empty() {
                format!("{} {} 🢂 {}", ack.emoji, ack.cmd, ack.message)
            } else {
                let names: Vec<String> = names.iter().map(|n| format!("◖{}◗", n)).collect();
                format!("{} {} {} 🢂 {}", ack.emoji, ack.cmd, names.join(" "), ack.message)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(kind: EntityType, name: &str, entry: &str) -> Command {
        Command::Add {
            kind,
            name: name.to_string(),
            entry: entry.to_string(),
        }
    }

    #[test]
    fn parses_add_commands() {
        let cmds = parse_commands("> You /ac Ada Lovelace; a countess\n/al Tokyo");
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].marker, "/AC");
        assert_eq!(
            cmds[0].command,
            add(EntityType::Characters, "Ada Lovelace", "a countess")
        );
        assert_eq!(cmds[1].command, add(EntityType::Locations, "Tokyo", ""));
    }

    #[test]
    fn markers_are_case_insensitive() {
        let cmds = parse_commands("/AL Frostspire");
        assert_eq!(cmds[0].marker, "/AL");
        assert_eq!(cmds[0].command, add(EntityType::Locations, "Frostspire", ""));
    }

    #[test]
    fn name_stops_at_quote_and_slash() {
        let cmds = parse_commands("\"/ac Ada\" then /ac Byron/al Rome");
        let names: Vec<_> = cmds
            .iter()
            .map(|c| match &c.command {
                Command::Add { name, .. } => name.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(names, vec!["Ada", "Byron", "Rome"]);
    }

    #[test]
    fn ignores_paths_and_unknown_markers() {
        assert!(parse_commands("see /usr/bin and /x y, /ac").is_empty());
        assert!(parse_commands("/acme corp").is_empty());
        assert!(parse_commands("/ac ;entry only").is_empty());
    }

    #[test]
    fn parses_control_commands() {
        let cmds = parse_commands("/mc toggle\n/mc RESET\n/mc retrieve\n/mc compress Ada Lovelace");
        let commands: Vec<_> = cmds.into_iter().map(|c| c.command).collect();
        assert_eq!(
            commands,
            vec![
                Command::Toggle,
                Command::Reset,
                Command::Retrieve,
                Command::Compress {
                    name: "Ada Lovelace".to_string()
                },
            ]
        );
    }

    #[test]
    fn mc_with_a_name_adds_a_character() {
        let cmds = parse_commands("/mc Toggle Smith; a switchman");
        assert_eq!(
            cmds[0].command,
            add(EntityType::Characters, "Toggle Smith", "a switchman")
        );
    }

    #[test]
    fn acknowledgements_group_by_message() {
        let acks = vec![
            Acknowledgement::ok("/AC", "Ada", "Preparing..."),
            Acknowledgement::warn("/AC", "Ada", "Already in queue."),
            Acknowledgement::ok("/AC", "Byron", "Preparing..."),
        ];
        assert_eq!(
            render_acknowledgements(&acks),
            "🎴 /AC ◖Ada◗ ◖Byron◗ 🢂 Preparing...\n⚠️ /AC ◖Ada◗ 🢂 Already in queue."
        );
    }

    #[test]
    fn acknowledgement_without_name() {
        let acks = vec![Acknowledgement::ok("/MC", "", "Disabled.")];
        assert_eq!(render_acknowledgements(&acks), "🎴 /MC 🢂 Disabled.");
        assert_eq!(render_acknowledgements(&[]), "");
    }
}
