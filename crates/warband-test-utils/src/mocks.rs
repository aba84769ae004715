//! Mock collaborators that record what the engine asked of them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use warband_core::SideId;
use warband_engine::{
    EventContext, EventHooks, EventOutcome, GameEvent, RandomSource, SyncError, UserChoice,
};
use warband_replay::ActionRecord;

/// Event hooks that log every event fired and answer with scripted
/// outcomes.
///
/// The log is shared, so a test can keep a [`fired`](Self::fired) handle
/// after the hooks have been moved into a session.
#[derive(Clone, Default)]
pub struct RecordingEvents {
    fired: Arc<Mutex<Vec<GameEvent>>>,
    reactions: HashMap<String, EventOutcome>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `name` event with `outcome`.
    pub fn on(mut self, name: &str, outcome: EventOutcome) -> Self {
        self.reactions.insert(name.to_string(), outcome);
        self
    }

    /// Shared handle to the fired-event log.
    pub fn fired(&self) -> Arc<Mutex<Vec<GameEvent>>> {
        Arc::clone(&self.fired)
    }

    /// Names of the events fired so far.
    pub fn names(&self) -> Vec<String> {
        self.fired
            .lock()
            .map(|f| f.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl EventHooks for RecordingEvents {
    fn fire(
        &mut self,
        _ctx: &mut EventContext<'_>,
        event: &GameEvent,
    ) -> Result<EventOutcome, SyncError> {
        if let Ok(mut fired) = self.fired.lock() {
            fired.push(event.clone());
        }
        Ok(self
            .reactions
            .get(&event.name)
            .cloned()
            .unwrap_or_else(EventOutcome::cosmetic))
    }
}

/// A choice whose local answers come from a fixed per-side table.
///
/// Sides without an entry answer `0`. Random answers are `roll % 100`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedChoice {
    answers: HashMap<SideId, i64>,
    asked: Vec<SideId>,
}

impl ScriptedChoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side `side` answers `value`.
    pub fn answer(mut self, side: SideId, value: i64) -> Self {
        self.answers.insert(side, value);
        self
    }

    /// Sides asked locally, in order.
    pub fn asked(&self) -> &[SideId] {
        &self.asked
    }
}

impl UserChoice for ScriptedChoice {
    fn query_user(&mut self, side: SideId, _rng: &mut dyn RandomSource) -> ActionRecord {
        self.asked.push(side);
        let value = self.answers.get(&side).copied().unwrap_or(0);
        log::trace!("side {side} answers {value}");
        ActionRecord::new("answer").with("value", value)
    }

    fn random_choice(&mut self, _side: SideId, roll: u64) -> ActionRecord {
        ActionRecord::new("answer").with("value", roll % 100)
    }

    fn description(&self) -> String {
        "scripted choice".to_string()
    }
}
