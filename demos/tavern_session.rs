/// Tavern Session example — a scripted six-turn session with canned
/// model replies.
///
/// The player queues a character and a location, the model fills both
/// records across turns, then a retrieval pass harvests new names from
/// the story and queues them.
///
/// Run with: cargo run --example tavern_session

use story_cards::schema::card::EntityCard;
use story_cards::{CardStore, MemoryCardStore, TurnOrchestrator};

/// One scripted turn: what the player types and what the model answers.
struct Turn {
    player: &'static str,
    model: &'static str,
}

fn main() {
    let mut orchestrator = TurnOrchestrator::builder()
        .profiles_path("card_data/profiles.ron")
        .build()
        .expect("Failed to build orchestrator");
    let mut store = MemoryCardStore::new();

    let script = [
        Turn {
            player: "You push open the door. /ac Mara Vell; keeps the bar\n/al Gilded Flagon; a riverside inn",
            model: "[Name: Mara Vell;Age: 41;Gender: female;Personality: shrewd(soft_on_regulars);",
        },
        Turn {
            player: "You order a drink.",
            model: "Appearance: grey_braid, flour_dusted_apron;Occupation: innkeeper;Backstory: ex_smuggler(retired);]",
        },
        Turn {
            player: "Mara slides a mug across the bar.",
            model: "[Name: Gilded Flagon;Location: riverside(Lowmarket);Setting: smoky_taproom;Threats: river_gangs;]",
        },
        Turn {
            player: "Old Tobin waves from the corner. /mc retrieve",
            model: "Characters: Mara Vell, Old Tobin, someone;\nLocations: Lowmarket, None;",
        },
        Turn {
            player: "You join Tobin.",
            model: "[Name: Old Tobin;Age: seventies;Gender: male;Personality: gossip(means_well);]",
        },
        Turn {
            player: "Tobin mutters about Lowmarket.",
            model: "[Name: Lowmarket;Location: south_bank;Setting: docks(crowded);]",
        },
    ];

    let mut story = String::new();

    for (i, turn) in script.iter().enumerate() {
        let number = i as u32 + 1;
        println!("=== Turn {} ===\n", number);

        // --- Intake: commands become acknowledgements ---
        let intake = orchestrator.on_intake(number, turn.player, &mut store);
        println!("Player: {}", intake.text);
        story.push_str(&intake.text);
        story.push('\n');

        // --- Assembly: the instruction rides on the end of the context ---
        let context = format!("Recent Story:\n{}", story);
        let prompt = orchestrator.on_assemble(number, &context, &mut store);
        if let Some(last) = prompt.text.lines().last() {
            println!("Prompt tail: {}", last);
        }

        // --- Parse: the model's reply becomes status text ---
        let parsed = orchestrator.on_parse(number, turn.model, &mut store);
        println!("Model: {}", turn.model);
        println!("Status:{}", parsed.text);
        for notice in &parsed.notices {
            println!("  ({})", notice);
        }
        println!();
    }

    println!("=== Cards ===\n");
    for card in store.cards() {
        if let Ok(Some(entity)) = EntityCard::decode(card, 0) {
            println!("{}\n  keys: {}\n  {}\n", card.title, card.keys, entity.record);
        }
    }

    println!("=== Saved state ===\n");
    println!(
        "{}",
        orchestrator
            .export_state()
            .expect("Failed to serialize state")
    );
}
