/// Progress tracking and the stall/retry policy that bounds every
/// generation.

use crate::schema::queue_item::Limits;

/// Completion percentage rounded to two decimals.
///
/// A zero limit counts as complete.
pub fn compute_progress(loaded: usize, category_limit: usize) -> f64 {
    if category_limit == 0 {
        return 100.0;
    }
    let raw = loaded as f64 / category_limit as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Outcome of one parse-phase evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub complete: bool,
    /// Progress to store on the item; 100 once complete.
    pub progress: f64,
    /// No forward movement since the previous evaluation.
    pub stalled: bool,
    /// The category limit was frozen to the loaded count on this call.
    pub limit_frozen: bool,
}

/// Evaluate an item after merging new output.
///
/// `previous` is the progress stored by the last evaluation and `loaded`
/// the number of schedule categories now loaded. A stall spends one retry;
/// once retries are exhausted the category limit freezes to `loaded`,
/// which completes the item.
pub fn evaluate(limits: &mut Limits, previous: f64, loaded: usize, saw_terminator: bool) -> Evaluation {
    if saw_terminator {
        return Evaluation {
            complete: true,
            progress: 100.0,
            stalled: false,
            limit_frozen: false,
        };
    }

    let current = compute_progress(loaded, limits.category_count);
    let stalled = current == previous;
    let mut limit_frozen = false;
    if stalled {
        if limits.retries_remaining > 0 {
            limits.retries_remaining -= 1;
        } else {
            limits.category_count = loaded;
            limit_frozen = true;
        }
    }

    let complete = loaded >= limits.category_count;
    Evaluation {
        complete,
        progress: if complete { 100.0 } else { current },
        stalled,
        limit_frozen,
    }
}

/// Cells in a rendered progress bar.
pub const BAR_CELLS: usize = 10;

/// Data behind the progress display shown after each parse phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBar {
    pub percent: f64,
    /// Filled cells, `0..=BAR_CELLS`.
    pub filled: usize,
    /// Name of the next queued entity, when it differs from the current one.
    pub up_next: Option<String>,
}

impl ProgressBar {
    pub fn new(percent: f64, up_next: Option<String>) -> ProgressBar {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let filled = ((percent.round() / 10.0).round() as usize).min(BAR_CELLS);
        ProgressBar {
            percent,
            filled,
            up_next,
        }
    }

    /// `- 50%: █████▒▒▒▒▒`
    pub fn render(&self) -> String {
        format!(
            "- {}%: {}{}",
            self.percent,
            "█".repeat(self.filled),
            "▒".repeat(BAR_CELLS - self.filled)
        )
    }
}
