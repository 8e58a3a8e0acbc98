/// The turn orchestrator: intake → assembly → parse, once per turn.
///
/// Wires together command intake, the entity queue, the PList codec, the
/// progress controller, and the card lifecycle. All persistent state lives
/// in [`GenerationState`], which the host saves between turns.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::command::{
    parse_commands, render_acknowledgements, Acknowledgement, Command, ParsedCommand, WARN_EMOJI,
};
use crate::core::config::{apply_profile_card, profile_card_text, ConfigError, ProfileSet, Settings};
use crate::core::lifecycle::{
    age_cards, compression_seed, create_card, due_for_compression, ensure_config_card,
    find_card, known_entries, on_compression_complete, reset_cooldown, LifecycleError,
};
use crate::core::plist::{merge, parse_fragment, serialize, truncate};
use crate::core::progress::{evaluate, ProgressBar};
use crate::core::prompt::{build_instruction, clean_context, extract_summary, harvest_names};
use crate::core::queue::EntityQueue;
use crate::core::status::{
    banner, done_message, entity_banner, generating_message, progress_block, queue_message,
};
use crate::core::store::CardStore;
use crate::schema::card::CardSeed;
use crate::schema::profile::{EntityType, NAME_CATEGORY};
use crate::schema::queue_item::{normalize_name, QueueItem};

/// Id of the settings config card.
pub const SETTINGS_CARD: &str = "SETTINGS";
/// Prefix added to the seed when a queued entity already has a card.
pub const UPDATE_PREFIX: &str = "Override and update plot-relevant CAT/TRAIT/DESC.";

/// Entity types with an editable config card.
const CONFIGURABLE: [EntityType; 4] = [
    EntityType::Characters,
    EntityType::Locations,
    EntityType::Retrieve,
    EntityType::Compress,
];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("card error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("state decode error: {0}")]
    StateDecode(#[from] serde_json::Error),
}

/// Where the machine stands between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing active, queue empty.
    Idle,
    /// Items waiting, nothing active.
    Queued,
    /// An item is being filled across turns.
    Generating,
    /// The active item just closed and is being persisted.
    Finalizing,
}

/// Everything carried from one turn to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationState {
    #[serde(default)]
    pub queue: EntityQueue,
    #[serde(default)]
    pub active: Option<QueueItem>,
    /// True iff an item is active or queued.
    #[serde(default)]
    pub generating: bool,
    /// Assembly phases that built a generation prompt.
    #[serde(default)]
    pub turns_spent: u32,
    /// Turn of the last automatic or requested retrieval. Unset counts
    /// from turn 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retrieval_turn: Option<u32>,
    /// Turn on which a reset was issued; assembly and parse are skipped
    /// for the rest of that turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_turn: Option<u32>,
}

impl GenerationState {
    pub fn from_json(json: &str) -> Result<GenerationState, serde_json::Error> {
        let mut state: GenerationState = serde_json::from_str(json)?;
        state.refresh();
        Ok(state)
    }

    /// Decode persisted state, starting fresh if it is unreadable.
    pub fn from_json_or_default(json: &str) -> GenerationState {
        match Self::from_json(json) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "persisted generation state unreadable, starting fresh");
                GenerationState::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn status(&self) -> TurnState {
        match (&self.active, self.queue.is_empty()) {
            (Some(_), _) => TurnState::Generating,
            (None, false) => TurnState::Queued,
            (None, true) => TurnState::Idle,
        }
    }

    fn refresh(&mut self) {
        self.generating = self.active.is_some() || !self.queue.is_empty();
    }

    fn enqueue(&mut self, item: QueueItem) -> bool {
        let queued = self.queue.enqueue(item, self.active.as_ref());
        self.refresh();
        queued
    }
}

/// Result of one phase hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookOutput {
    pub text: String,
    /// Halt the host's processing for this turn. Never set by this crate;
    /// kept for host compatibility.
    pub stop: bool,
    /// Console messages and warnings, one line each.
    pub notices: Vec<String>,
}

impl HookOutput {
    fn new(text: impl Into<String>, notices: Vec<String>) -> Self {
        Self {
            text: text.into(),
            stop: false,
            notices,
        }
    }
}

/// The turn-synchronous state machine. Built via `TurnOrchestrator::builder()`.
pub struct TurnOrchestrator {
    profiles: ProfileSet,
    settings: Settings,
    state: GenerationState,
    phase: TurnState,
}

/// Builder for constructing a `TurnOrchestrator`.
#[derive(Default)]
pub struct TurnOrchestratorBuilder {
    profiles_path: Option<String>,
    /// Directly provided profiles, applied after any file.
    profiles: Option<ProfileSet>,
    settings: Option<Settings>,
    state: Option<GenerationState>,
}

impl TurnOrchestratorBuilder {
    pub fn profiles_path(mut self, path: &str) -> Self {
        self.profiles_path = Some(path.to_string());
        self
    }

    pub fn profiles(mut self, profiles: ProfileSet) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn state(mut self, state: GenerationState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<TurnOrchestrator, PipelineError> {
        let mut profiles = ProfileSet::builtin();
        if let Some(ref path) = self.profiles_path {
            if Path::new(path).exists() {
                profiles.merge(ProfileSet::load_from_ron(Path::new(path))?);
            }
        }
        if let Some(extra) = self.profiles {
            profiles.merge(extra);
        }

        let mut state = self.state.unwrap_or_default();
        state.refresh();
        let phase = state.status();
        Ok(TurnOrchestrator {
            profiles,
            settings: self.settings.unwrap_or_default(),
            state,
            phase,
        })
    }
}

impl TurnOrchestrator {
    pub fn builder() -> TurnOrchestratorBuilder {
        TurnOrchestratorBuilder::default()
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    /// The last state the machine moved through, including the transient
    /// `Finalizing`.
    pub fn phase(&self) -> TurnState {
        self.phase
    }

    pub fn export_state(&self) -> Result<String, PipelineError> {
        Ok(self.state.to_json()?)
    }

    pub fn restore_state(&mut self, json: &str) -> Result<(), PipelineError> {
        self.state = GenerationState::from_json(json)?;
        self.phase = self.state.status();
        Ok(())
    }

    // ---- Intake -------------------------------------------------------

    /// Parse commands out of the player's text. When any are found the
    /// text is replaced by their acknowledgements.
    pub fn on_intake(&mut self, turn: u32, text: &str, store: &mut dyn CardStore) -> HookOutput {
        let mut notices = self.begin(turn, store);
        let mut acks = Vec::new();

        for ParsedCommand { marker, command } in parse_commands(text) {
            if !self.settings.enabled && command != Command::Toggle {
                continue;
            }
            match command {
                Command::Add { kind, name, entry } => {
                    if let Some(ack) = self.intake_add(turn, &marker, kind, &name, &entry, store) {
                        acks.push(ack);
                    }
                }
                Command::Toggle => {
                    self.settings.enabled = !self.settings.enabled;
                    self.write_settings(store, &mut notices);
                    let message = if self.settings.enabled {
                        "Enabled."
                    } else {
                        "Disabled."
                    };
                    acks.push(Acknowledgement::ok(&marker, "", message));
                }
                Command::Reset => {
                    self.reset(turn);
                    acks.push(Acknowledgement::ok(&marker, "", "Cleared queue."));
                }
                Command::Retrieve => {
                    let item = self.retrieve_item(store);
                    if self.state.enqueue(item) {
                        self.state.last_retrieval_turn = Some(turn);
                        acks.push(Acknowledgement::ok(&marker, "", "Checking for new entries..."));
                    } else {
                        acks.push(Acknowledgement::warn(&marker, "", "Already in queue."));
                    }
                }
                Command::Compress { name } => acks.push(self.intake_compress(&marker, &name, store)),
            }
        }

        if acks.is_empty() {
            return HookOutput::new(text, notices);
        }
        let reply = render_acknowledgements(&acks);
        info!(turn, acknowledgements = %reply, "intake");
        HookOutput::new(reply, notices)
    }

    fn intake_add(
        &mut self,
        turn: u32,
        marker: &str,
        kind: EntityType,
        name: &str,
        entry: &str,
        store: &dyn CardStore,
    ) -> Option<Acknowledgement> {
        let profile = self.profiles.resolve(kind);
        let mut item = QueueItem::new(name, entry, &profile);
        if item.name.is_empty() {
            return None;
        }
        let display = item.name.clone();
        let active_same = self
            .state
            .active
            .as_ref()
            .is_some_and(|a| a.same_entity(&item));
        if active_same || self.state.queue.contains_name(&item.name) {
            return Some(Acknowledgement::warn(marker, &display, "Already in queue."));
        }

        let ack = if turn + 1 >= self.settings.min_turns {
            if find_card(store, &item.name, self.settings.cooldown_interval).is_some() {
                item.entry = format!("{}\n{}", UPDATE_PREFIX, item.entry)
                    .trim_end()
                    .to_string();
                Acknowledgement::ok(marker, &display, "Updating...")
            } else {
                Acknowledgement::ok(marker, &display, "Preparing...")
            }
        } else {
            let wait = self.settings.min_turns - turn - 1;
            Acknowledgement::warn(
                marker,
                &display,
                format!("(Not enough story) Generating in {} turns.", wait),
            )
        };
        self.state.enqueue(item);
        Some(ack)
    }

    fn intake_compress(&mut self, marker: &str, name: &str, store: &mut dyn CardStore) -> Acknowledgement {
        let interval = self.settings.cooldown_interval;
        let Some((_, card)) = find_card(store, name, interval) else {
            return Acknowledgement::warn(marker, name.trim(), "No card found.");
        };
        let profile = self.profiles.resolve(EntityType::Compress);
        let item = QueueItem::new(&card.id, &compression_seed(&card), &profile);
        if self.state.enqueue(item) {
            reset_cooldown(store, &card.id, interval);
            Acknowledgement::ok(marker, &card.id, "Preparing...")
        } else {
            Acknowledgement::warn(marker, &card.id, "Already in queue.")
        }
    }

    // ---- Assembly -----------------------------------------------------

    /// Clean the context and, while generating, append the instruction for
    /// the active item.
    pub fn on_assemble(&mut self, turn: u32, text: &str, store: &mut dyn CardStore) -> HookOutput {
        let notices = self.begin(turn, store);
        if !self.settings.enabled || self.state.reset_turn == Some(turn) {
            return HookOutput::new(text, notices);
        }
        let mut context = clean_context(text);

        self.enqueue_due_compressions(store);
        if !self.state.generating && turn > 0 && self.on_cadence(turn) {
            let item = self.retrieve_item(store);
            if self.state.enqueue(item) {
                self.state.last_retrieval_turn = Some(turn);
                debug!(turn, "queued automatic retrieval");
            }
        }

        if self.state.active.is_none() {
            if turn + 1 < self.settings.min_turns {
                return HookOutput::new(context, notices);
            }
            self.state.active = self.state.queue.dequeue_next();
            self.state.refresh();
        }
        let Some(item) = self.state.active.clone() else {
            let idle = self.state.status();
            self.transition(idle);
            return HookOutput::new(context, notices);
        };
        self.transition(TurnState::Generating);

        let profile = self.profiles.resolve(item.kind);
        let list = if item.kind.is_plist() {
            serialize(&item.loaded, &item.schedule, false)
        } else {
            String::new()
        };
        let instruction = build_instruction(&profile, &item.name, &item.entry, &list);
        debug!(turn, name = %item.name, kind = item.kind.name(), "assembled prompt");
        context.push('\n');
        context.push_str(&instruction);
        self.state.turns_spent += 1;
        HookOutput::new(context, notices)
    }

    /// Automatic retrieval is due once a full cooldown interval has passed
    /// since the last retrieval.
    fn on_cadence(&self, turn: u32) -> bool {
        let interval = self.settings.cooldown_interval.max(1);
        let last = self.state.last_retrieval_turn.unwrap_or(0);
        turn.saturating_sub(last) >= interval
    }

    fn enqueue_due_compressions(&mut self, store: &mut dyn CardStore) {
        let interval = self.settings.cooldown_interval;
        let profile = self.profiles.resolve(EntityType::Compress);
        for (name, seed) in due_for_compression(store, interval) {
            if self.state.enqueue(QueueItem::new(&name, &seed, &profile)) {
                reset_cooldown(store, &name, interval);
                info!(name = %name, "queued compression");
            }
        }
    }

    // ---- Parse --------------------------------------------------------

    /// Feed the model's reply to the active item and return status text.
    /// On idle turns, ages cards instead.
    pub fn on_parse(&mut self, turn: u32, text: &str, store: &mut dyn CardStore) -> HookOutput {
        let mut notices = self.begin(turn, store);
        if !self.settings.enabled || self.state.reset_turn == Some(turn) {
            return HookOutput::new(text, notices);
        }

        let Some(item) = self.state.active.take() else {
            if !self.state.generating {
                for title in age_cards(store, self.settings.cooldown_interval) {
                    info!(title = %title, "cooldown exhausted");
                    notices.push(format!("Compressing {} on the next turn...", title));
                }
            }
            return HookOutput::new(text, notices);
        };

        let status = match item.kind {
            EntityType::Retrieve => self.finish_retrieve(text, store),
            EntityType::Compress => self.finish_compress(item, turn, text, store, &mut notices),
            _ => self.advance_plist(item, text, store, &mut notices),
        };
        self.state.refresh();
        HookOutput::new(status, notices)
    }

    fn finish_retrieve(&mut self, reply: &str, store: &dyn CardStore) -> String {
        let interval = self.settings.cooldown_interval;
        let mut added = Vec::new();
        for (kind, name) in harvest_names(reply) {
            if find_card(store, &name, interval).is_some() {
                continue;
            }
            let profile = self.profiles.resolve(kind);
            if self.state.enqueue(QueueItem::new(&name, "", &profile)) {
                added.push(name);
            }
        }
        info!(found = added.len(), "retrieval finished");
        self.advance_queue();

        let mut status = entity_banner("", "Checking for new entries...");
        if !added.is_empty() {
            let names: Vec<&str> = added.iter().map(String::as_str).collect();
            status.push_str(&entity_banner("", &queue_message(&names)));
        }
        status
    }

    fn finish_compress(
        &mut self,
        item: QueueItem,
        turn: u32,
        reply: &str,
        store: &mut dyn CardStore,
        notices: &mut Vec<String>,
    ) -> String {
        let summary = extract_summary(reply, &item.schedule);
        let interval = self.settings.cooldown_interval;
        if !on_compression_complete(store, &item.name, &summary, turn, interval) {
            push_warning(notices, format!("No card found for {}.", item.name));
        }
        self.advance_queue();
        entity_banner("", &format!("Compressing {}...", item.name))
    }

    fn advance_plist(
        &mut self,
        mut item: QueueItem,
        reply: &str,
        store: &mut dyn CardStore,
        notices: &mut Vec<String>,
    ) -> String {
        let fragment = parse_fragment(reply, &item.schedule);
        merge(&mut item.loaded, &fragment.entries);
        adopt_generated_name(&mut item);
        item.output.push_str(reply);

        let loaded = item.loaded.count_in(&item.schedule);
        let eval = evaluate(&mut item.limits, item.progress, loaded, fragment.saw_terminator);
        item.progress = eval.progress;
        debug!(
            name = %item.name,
            progress = eval.progress,
            stalled = eval.stalled,
            retries = item.limits.retries_remaining,
            "parsed fragment"
        );
        if eval.limit_frozen {
            info!(name = %item.name, categories = loaded, "retries exhausted, closing record");
        }

        if !eval.complete {
            let up_next = self
                .state
                .queue
                .peek()
                .map(|next| next.name.clone())
                .filter(|next| *next != item.name);
            let bar = ProgressBar::new(item.progress, up_next);
            let message = format!(
                "{}{}",
                generating_message(eval.stalled, item.limits.retries_remaining),
                progress_block(&bar, false)
            );
            let status = entity_banner(&item.name, &message);
            self.state.active = Some(item);
            return status;
        }

        self.transition(TurnState::Finalizing);
        let record = truncate(
            &serialize(&item.loaded, &item.schedule, true),
            &item.schedule,
            item.limits.char_budget,
        );
        let seed = CardSeed {
            name: item.name.clone(),
            entry: item.entry.clone(),
        };
        let created = create_card(store, &item.name, seed, &record, self.settings.cooldown_interval);
        self.advance_queue();

        match created {
            Ok(_) => {
                notices.push(format!("Created {}", item.name));
                let up_next = self.state.active.as_ref().map(|next| next.name.clone());
                let drained = up_next.is_none();
                let bar = ProgressBar::new(100.0, up_next);
                let message = format!(
                    "{}{}",
                    done_message(record.chars().count(), item.limits.char_budget),
                    progress_block(&bar, drained)
                );
                entity_banner(&item.name, &message)
            }
            Err(e) => {
                push_warning(notices, e.to_string());
                banner(WARN_EMOJI, &item.name, &e.to_string())
            }
        }
    }

    fn advance_queue(&mut self) {
        self.state.active = self.state.queue.dequeue_next();
        self.state.refresh();
        let next = self.state.status();
        self.transition(next);
    }

    // ---- Shared -------------------------------------------------------

    /// Start of every phase: expire a stale reset marker and reload
    /// configuration from the store.
    fn begin(&mut self, turn: u32, store: &mut dyn CardStore) -> Vec<String> {
        if self.state.reset_turn.is_some_and(|t| t != turn) {
            self.state.reset_turn = None;
        }
        let mut notices = Vec::new();
        self.sync_settings(store, &mut notices);
        self.sync_profiles(store, &mut notices);
        notices
    }

    fn sync_settings(&mut self, store: &mut dyn CardStore, notices: &mut Vec<String>) {
        let idx = match ensure_config_card(store, SETTINGS_CARD) {
            Ok(idx) => idx,
            Err(e) => {
                push_warning(notices, e.to_string());
                return;
            }
        };
        let entry = &store.cards()[idx].entry;
        if !entry.trim().is_empty() {
            match Settings::parse_card(entry) {
                Ok(settings) => self.settings = settings,
                Err(e) => {
                    push_warning(notices, format!("Settings restored to defaults: {}", e));
                    self.settings = Settings::default();
                }
            }
        }
        store.cards_mut()[idx].entry = self.settings.to_card_text();
    }

    fn write_settings(&mut self, store: &mut dyn CardStore, notices: &mut Vec<String>) {
        match ensure_config_card(store, SETTINGS_CARD) {
            Ok(idx) => store.cards_mut()[idx].entry = self.settings.to_card_text(),
            Err(e) => push_warning(notices, e.to_string()),
        }
    }

    fn sync_profiles(&mut self, store: &mut dyn CardStore, notices: &mut Vec<String>) {
        for kind in CONFIGURABLE {
            let idx = match ensure_config_card(store, kind.name()) {
                Ok(idx) => idx,
                Err(e) => {
                    push_warning(notices, e.to_string());
                    continue;
                }
            };
            let current = self.profiles.resolve(kind);
            let card = &store.cards()[idx];
            let profile = if card.entry.trim().is_empty() {
                current
            } else {
                match apply_profile_card(&current, &card.entry, &card.description) {
                    Ok(profile) => profile,
                    Err(e) => {
                        push_warning(notices, format!("{} config restored: {}", kind.name(), e));
                        current
                    }
                }
            };
            let card = &mut store.cards_mut()[idx];
            card.entry = profile_card_text(&profile);
            card.description = profile.instruction.ai.clone();
            self.profiles.insert(profile);
        }
    }

    fn retrieve_item(&self, store: &dyn CardStore) -> QueueItem {
        let known = known_entries(store, self.settings.cooldown_interval);
        QueueItem::new("", &known.join(", "), &self.profiles.resolve(EntityType::Retrieve))
    }

    fn reset(&mut self, turn: u32) {
        info!(turn, dropped = self.state.queue.len(), "queue reset");
        self.state = GenerationState {
            reset_turn: Some(turn),
            last_retrieval_turn: self.state.last_retrieval_turn,
            ..GenerationState::default()
        };
        self.transition(TurnState::Idle);
    }

    fn transition(&mut self, to: TurnState) {
        if self.phase != to {
            debug!(from = ?self.phase, to = ?to, "turn state");
            self.phase = to;
        }
    }
}

/// Take the model's spelling of the name when it differs from the queued
/// one ignoring case and underscores.
fn adopt_generated_name(item: &mut QueueItem) {
    let Some(generated) = item.loaded.get(NAME_CATEGORY) else {
        return;
    };
    let generated = normalize_name(&generated.replace('_', " "));
    let current = item.name.replace('_', " ");
    if !generated.is_empty() && generated.to_lowercase() != current.to_lowercase() {
        debug!(from = %item.name, to = %generated, "adopting generated name");
        item.name = generated;
    }
}

fn push_warning(notices: &mut Vec<String>, message: String) {
    warn!("{}", message);
    notices.push(format!("{} {}", WARN_EMOJI, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryCardStore;

    fn orchestrator() -> TurnOrchestrator {
        TurnOrchestrator::builder().build().unwrap()
    }

    #[test]
    fn starts_idle() {
        let orch = orchestrator();
        assert_eq!(orch.phase(), TurnState::Idle);
        assert!(!orch.state().generating);
    }

    #[test]
    fn intake_queues_and_acknowledges() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        let out = orch.on_intake(1, "/ac Ada; a countess", &mut store);
        assert_eq!(out.text, "🎴 /AC ◖Ada◗ 🢂 Preparing...");
        assert!(!out.stop);
        assert_eq!(orch.state().queue.len(), 1);
        assert!(orch.state().generating);
        assert_eq!(orch.state().status(), TurnState::Queued);
    }

    #[test]
    fn requested_retrieval_restarts_cadence() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        assert!(!orch.on_cadence(9));
        assert!(orch.on_cadence(10));

        orch.on_intake(4, "/mc retrieve", &mut store);
        assert_eq!(orch.state().last_retrieval_turn, Some(4));
        assert!(!orch.on_cadence(13));
        assert!(orch.on_cadence(14));

        orch.on_intake(5, "/mc reset", &mut store);
        assert!(orch.state().queue.is_empty());
        assert_eq!(orch.state().last_retrieval_turn, Some(4));
    }

    #[test]
    fn intake_without_commands_passes_text_through() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        let out = orch.on_intake(1, "You open the door.", &mut store);
        assert_eq!(out.text, "You open the door.");
        assert!(out.notices.is_empty());
    }

    #[test]
    fn config_cards_are_written() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        orch.on_intake(1, "", &mut store);
        let titles: Vec<&str> = store.cards().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["🔧 SETTINGS", "🔧 CHARACTERS", "🔧 LOCATIONS", "🔧 RETRIEVE", "🔧 COMPRESS"]
        );
        assert!(store.cards()[0].entry.contains("cooldown: 10"));
    }

    #[test]
    fn malformed_settings_fall_back_with_warning() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        orch.on_intake(1, "", &mut store);
        store.cards_mut()[0].entry = "enabled: sometimes".to_string();

        let out = orch.on_intake(2, "", &mut store);
        assert_eq!(out.notices.len(), 1);
        assert!(out.notices[0].starts_with(WARN_EMOJI));
        assert_eq!(*orch.settings(), Settings::default());
        assert!(store.cards()[0].entry.contains("enabled: true"));
    }

    #[test]
    fn adopt_name_only_when_spelling_differs() {
        let profile = crate::schema::profile::TypeProfile::characters();
        let mut item = QueueItem::new("ada_lovelace", "", &profile);
        item.loaded.insert("Name", "Ada Lovelace");
        adopt_generated_name(&mut item);
        assert_eq!(item.name, "ada_lovelace");

        item.loaded = Default::default();
        item.loaded.insert("Name", "Ada_King");
        adopt_generated_name(&mut item);
        assert_eq!(item.name, "Ada King");
    }

    #[test]
    fn state_json_round_trip() {
        let mut orch = orchestrator();
        let mut store = MemoryCardStore::new();
        orch.on_intake(1, "/al Tokyo", &mut store);
        let json = orch.export_state().unwrap();
        let mut other = orchestrator();
        other.restore_state(&json).unwrap();
        assert_eq!(other.state(), orch.state());
        assert_eq!(other.phase(), TurnState::Queued);
        assert!(other.restore_state("{not json").is_err());
        assert_eq!(
            GenerationState::from_json_or_default("garbage"),
            GenerationState::default()
        );
    }
}
