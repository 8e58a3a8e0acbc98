/// The host's card storage, seen through the narrow surface the pipeline
/// needs.

use crate::schema::card::StoryCard;

/// Persistent card storage owned by the host.
///
/// `add_card` is a request: hosts may apply it late or not at all, so
/// callers look the card up again instead of trusting the call.
pub trait CardStore {
    fn cards(&self) -> &[StoryCard];
    fn cards_mut(&mut self) -> &mut [StoryCard];
    fn add_card(&mut self, card: StoryCard);

    fn find_by_title(&self, title: &str) -> Option<usize> {
        self.cards().iter().position(|c| c.title == title)
    }
}

/// In-memory store for tools, demos, and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCardStore {
    cards: Vec<StoryCard>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<StoryCard>) -> Self {
        Self { cards }
    }
}

impl CardStore for MemoryCardStore {
    fn cards(&self) -> &[StoryCard] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut [StoryCard] {
        &mut self.cards
    }

    fn add_card(&mut self, card: StoryCard) {
        self.cards.push(card);
    }
}
