pub mod command;
pub mod config;
pub mod lifecycle;
pub mod orchestrator;
pub mod plist;
pub mod progress;
pub mod prompt;
pub mod queue;
pub mod status;
pub mod store;
