/// Player-facing status text returned from the parse phase.

use crate::core::command::OK_EMOJI;
use crate::core::progress::ProgressBar;

/// Label used in banners when no entity is being generated.
pub const SYSTEM_LABEL: &str = "Story Cards";

const CONTINUE_CUE: &str = "🢂 [ 🪄 CONTINUE ]";
const RESUME_HINT: &str = "[System: Resume from exact pre-interruption point.]";

/// `\n- 🎴 ◖Ada◗ 🢂 Generating...\n`
pub fn banner(emoji: &str, name: &str, message: &str) -> String {
    let name = if name.trim().is_empty() {
        SYSTEM_LABEL
    } else {
        name
    };
    format!("\n- {} ◖{}◗ 🢂 {}\n", emoji, name, message)
}

pub fn entity_banner(name: &str, message: &str) -> String {
    banner(OK_EMOJI, name, message)
}

/// Progress block appended to a banner message. `drained` means nothing
/// is left to generate after the current item.
pub fn progress_block(bar: &ProgressBar, drained: bool) -> String {
    let mut text = format!("\n{}", bar.render());
    if let Some(next) = &bar.up_next {
        text.push_str(&format!("\n- Up Next: {}{}", OK_EMOJI, next));
    }
    text.push('\n');
    text.push_str(CONTINUE_CUE);
    if drained {
        text.push('\n');
        text.push_str(RESUME_HINT);
    }
    text
}

/// `Generating...`, with the remaining retries after a stall.
pub fn generating_message(stalled: bool, retries_remaining: u32) -> String {
    if stalled {
        format!("Generating... ↺ = {}", retries_remaining)
    } else {
        "Generating...".to_string()
    }
}

/// `Done! (412/800)`: record length against the card budget.
pub fn done_message(record_len: usize, budget: usize) -> String {
    format!("Done! ({}/{})", record_len, budget)
}

pub fn queue_message(names: &[&str]) -> String {
    let names: Vec<String> = names.iter().map(|n| format!("◖{}◗", n)).collect();
    format!("Adding {} to queue...", names.join(" "))
}
