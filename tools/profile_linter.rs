/// Profile Linter — validates entity profiles before they are loaded.
///
/// Usage: profile_linter <profiles.ron | profile_dir>

use std::path::Path;
use std::process;

use story_cards::schema::profile::{EntityType, TypeProfile};
use story_cards::ProfileSet;

/// Schedules longer than this rarely finish inside the retry budget.
const LONG_SCHEDULE: usize = 16;
/// Below this a finished record is mostly the name.
const SMALL_CARD: usize = 100;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: profile_linter <profiles.ron | profile_dir>");
        process::exit(0);
    }

    let input = &args[1];
    let mut profiles = ProfileSet::default();
    let path = Path::new(input);

    if path.is_file() {
        match ProfileSet::load_from_ron(path) {
            Ok(set) => profiles.merge(set),
            Err(e) => {
                eprintln!("ERROR: Failed to load profile file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_profiles_recursive(path, &mut profiles);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", input);
        process::exit(1);
    }

    println!("Loaded {} profiles", profiles.len());

    let (errors, warnings) = lint_profiles(&profiles);

    println!("\n=== Profile Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_profiles_recursive(dir: &Path, profiles: &mut ProfileSet) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_profiles_recursive(&path, profiles);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match ProfileSet::load_from_ron(&path) {
                    Ok(set) => {
                        println!("  Loaded: {}", path.display());
                        profiles.merge(set);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_profiles(profiles: &ProfileSet) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for kind in EntityType::ALL {
        if profiles.get(kind).is_none() {
            warnings.push(format!(
                "No '{}' profile; the built-in one will be used",
                kind.name()
            ));
        }
    }

    // Stable report order.
    for kind in EntityType::ALL {
        let Some(profile) = profiles.get(kind) else {
            continue;
        };
        lint_profile(profile, &mut errors, &mut warnings);
    }

    (errors, warnings)
}

fn lint_profile(profile: &TypeProfile, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let name = profile.kind.name();
    let template = format!("{}\n{}", profile.instruction.ai, profile.instruction.user);

    if profile.instruction.ai.trim().is_empty() {
        errors.push(format!("Profile '{}' has an empty ai instruction", name));
    }

    match profile.kind {
        EntityType::Characters | EntityType::Locations | EntityType::Resume => {
            if profile.limits.card == 0 {
                errors.push(format!(
                    "Profile '{}' has a card budget of 0; every record would truncate to '[]'",
                    name
                ));
            } else if profile.limits.card < SMALL_CARD {
                warnings.push(format!(
                    "Profile '{}' card budget {} is below {} characters",
                    name, profile.limits.card, SMALL_CARD
                ));
            }
            if profile.kind != EntityType::Resume {
                if !template.contains("$1") {
                    errors.push(format!(
                        "Profile '{}' instruction never names the entity ($1)",
                        name
                    ));
                }
                if !template.contains("$3") {
                    errors.push(format!(
                        "Profile '{}' instruction never shows the PList so far ($3); generation cannot resume",
                        name
                    ));
                }
            }
            if profile.schedule.len() > LONG_SCHEDULE {
                warnings.push(format!(
                    "Profile '{}' has {} categories (more than {} rarely complete)",
                    name,
                    profile.schedule.len(),
                    LONG_SCHEDULE
                ));
            }
            let priority = profile.schedule.priority_line();
            if profile.instruction.ai.contains("Priority:")
                && !profile.instruction.ai.contains(&priority)
            {
                warnings.push(format!(
                    "Profile '{}' instruction lists a priority that differs from its schedule ({})",
                    name, priority
                ));
            }
        }
        EntityType::Retrieve => {
            for label in ["Characters:", "Locations:"] {
                if !profile.instruction.ai.contains(label) {
                    warnings.push(format!(
                        "Profile '{}' instruction never asks for a '{}' line; those names will not be harvested",
                        name, label
                    ));
                }
            }
        }
        EntityType::Compress => {
            if profile.schedule.len() < 2 {
                errors.push(format!(
                    "Profile '{}' schedule has no summary categories besides Name",
                    name
                ));
            }
            for category in profile.schedule.iter().skip(1) {
                if !profile.instruction.ai.contains(&format!("{}:", category)) {
                    warnings.push(format!(
                        "Profile '{}' instruction never asks for a '{}:' line",
                        name, category
                    ));
                }
            }
        }
    }
}
