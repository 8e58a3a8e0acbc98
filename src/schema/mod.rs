pub mod card;
pub mod profile;
pub mod queue_item;
