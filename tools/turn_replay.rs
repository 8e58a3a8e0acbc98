/// Turn replay — drive the intake/assembly/parse hooks by hand or from a
/// script, against an in-memory card store.
///
/// Usage: turn_replay [--profiles <path>] [--cards <path>] [--script <path>] [-v|-vv]
///
/// Commands:
///   say <text>     — intake + assembly for the current turn
///   reply <text>   — parse a model reply (`\n` for newlines), then advance the turn
///   cards          — list cards in the store
///   queue          — show active item and queue
///   state          — dump persisted state as JSON
///   help           — list commands
///   quit           — exit

use std::io::{self, BufRead, Write};
use std::path::Path;

use story_cards::schema::card::EntityCard;
use story_cards::{CardStore, MemoryCardStore, ProfileSet, StoryCard, TurnOrchestrator};
use tracing_subscriber::{fmt, EnvFilter};

struct Session {
    orchestrator: TurnOrchestrator,
    store: MemoryCardStore,
    turn: u32,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut profiles_path = None;
    let mut cards_path = None;
    let mut script_path = None;
    let mut verbose = 0u8;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--profiles" if i + 1 < args.len() => {
                i += 1;
                profiles_path = Some(args[i].clone());
            }
            "--cards" if i + 1 < args.len() => {
                i += 1;
                cards_path = Some(args[i].clone());
            }
            "--script" if i + 1 < args.len() => {
                i += 1;
                script_path = Some(args[i].clone());
            }
            "-v" => verbose = 1,
            "-vv" => verbose = 2,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    init_tracing(verbose);

    let mut builder = TurnOrchestrator::builder();
    if let Some(ref path) = profiles_path {
        match ProfileSet::load_from_ron(Path::new(path)) {
            Ok(set) => {
                println!("Loaded {} profiles from {}", set.len(), path);
                builder = builder.profiles(set);
            }
            Err(e) => {
                eprintln!("Error loading {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }
    let orchestrator = match builder.build() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let store = match cards_path {
        Some(ref path) => match load_cards(path) {
            Ok(cards) => {
                println!("Loaded {} cards from {}", cards.len(), path);
                MemoryCardStore::with_cards(cards)
            }
            Err(e) => {
                eprintln!("Error loading {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => MemoryCardStore::new(),
    };

    let mut session = Session {
        orchestrator,
        store,
        turn: 1,
    };

    if let Some(ref path) = script_path {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                std::process::exit(1);
            }
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            println!("turn {}> {}", session.turn, line);
            if !handle_line(&mut session, line) {
                break;
            }
        }
        return;
    }

    println!("Type 'help' for commands.\n");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("turn {}> ", session.turn);
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !handle_line(&mut session, line) {
            break;
        }
    }
}

/// Run one command. Returns false to stop.
fn handle_line(session: &mut Session, line: &str) -> bool {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd.to_lowercase().as_str() {
        "quit" | "exit" | "q" => {
            println!("Goodbye.");
            return false;
        }
        "help" | "h" => print_help(),
        "say" => {
            let turn = session.turn;
            let intake = session
                .orchestrator
                .on_intake(turn, rest, &mut session.store);
            print_notices(&intake.notices);
            println!("[intake]\n{}", intake.text);

            let context = format!("Recent Story:\n{}", intake.text);
            let assembled = session
                .orchestrator
                .on_assemble(turn, &context, &mut session.store);
            print_notices(&assembled.notices);
            println!("[prompt]\n{}\n", assembled.text);
        }
        "reply" => {
            let turn = session.turn;
            let reply = rest.replace("\\n", "\n");
            let parsed = session
                .orchestrator
                .on_parse(turn, &reply, &mut session.store);
            print_notices(&parsed.notices);
            println!("[output]{}", parsed.text);
            session.turn += 1;
        }
        "cards" => print_cards(&session.store),
        "queue" => {
            let state = session.orchestrator.state();
            match &state.active {
                Some(item) => println!(
                    "Active: {} ({}) {}% loaded={}",
                    item.name,
                    item.kind.name(),
                    item.progress,
                    item.loaded.len()
                ),
                None => println!("Active: none"),
            }
            let names: Vec<&str> = state.queue.names().collect();
            println!("Queue: [{}]", names.join(", "));
            println!("Phase: {:?}", session.orchestrator.phase());
        }
        "state" => match session.orchestrator.export_state() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        },
        other => {
            println!("Unknown command: '{}'. Type 'help' for commands.", other);
        }
    }
    true
}

fn print_notices(notices: &[String]) {
    for notice in notices {
        println!("  ! {}", notice);
    }
}

fn print_cards(store: &MemoryCardStore) {
    if store.cards().is_empty() {
        println!("No cards.");
        return;
    }
    for card in store.cards() {
        match EntityCard::decode(card, 0) {
            Ok(Some(entity)) => println!(
                "{} [cooldown {}, {} summaries]\n  {}",
                card.title,
                entity.cooldown,
                entity.summary_history.len(),
                entity.record
            ),
            Ok(None) => println!("{} ({})", card.title, card.card_type),
            Err(e) => println!("{} (bad metadata: {})", card.title, e),
        }
    }
}

fn load_cards(path: &str) -> Result<Vec<StoryCard>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!("Usage: turn_replay [--profiles <path>] [--cards <path>] [--script <path>] [-v|-vv]");
    println!();
    println!("Replay turns against an in-memory card store.");
}

fn print_help() {
    println!("Commands:");
    println!("  say <text>     — intake + assembly for the current turn");
    println!("  reply <text>   — parse a model reply (\\n for newlines), then advance");
    println!("  cards          — list cards in the store");
    println!("  queue          — show active item and queue");
    println!("  state          — dump persisted state as JSON");
    println!("  help           — show this help");
    println!("  quit           — exit");
}
