//! Sides (player slots): controller, treasury, recruit list, recall roster
//! and fog/shroud state.

use std::collections::BTreeSet;

use crate::id::{Location, SideId, UnitId};
use crate::unit::Unit;

/// Who makes decisions for a side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    /// A human on this peer.
    Human,
    /// An AI on this peer.
    Ai,
    /// Controlled by another peer.
    Remote,
    /// Controlled by nobody; choices for it get a random answer.
    Empty,
}

impl Controller {
    /// Whether this peer answers choices for the side.
    pub fn is_local(self) -> bool {
        matches!(self, Controller::Human | Controller::Ai)
    }
}

/// Per-side counters kept for the end-of-scenario report.
///
/// Undo reverses every update made here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SideStatistics {
    /// Units recruited.
    pub recruits: u32,
    /// Units recalled.
    pub recalls: u32,
    /// Gold spent on recruits.
    pub recruit_spend: i32,
    /// Gold spent on recalls.
    pub recall_spend: i32,
}

impl SideStatistics {
    /// Count a recruit.
    pub fn record_recruit(&mut self, cost: i32) {
        self.recruits += 1;
        self.recruit_spend += cost;
    }

    /// Reverse [`record_recruit`](Self::record_recruit).
    pub fn unrecord_recruit(&mut self, cost: i32) {
        self.recruits = self.recruits.saturating_sub(1);
        self.recruit_spend -= cost;
    }

    /// Count a recall.
    pub fn record_recall(&mut self, cost: i32) {
        self.recalls += 1;
        self.recall_spend += cost;
    }

    /// Reverse [`record_recall`](Self::record_recall).
    pub fn unrecord_recall(&mut self, cost: i32) {
        self.recalls = self.recalls.saturating_sub(1);
        self.recall_spend -= cost;
    }
}

/// A player slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Side {
    /// Side number, starting at 1.
    pub id: SideId,
    /// Who controls the side.
    pub controller: Controller,
    /// Treasury.
    pub gold: i32,
    /// Unit types this side may recruit.
    pub recruits: Vec<String>,
    /// Persisted units available for recall, in roster order.
    pub recall_list: Vec<Unit>,
    /// Fog of war enabled.
    pub fog: bool,
    /// Shroud enabled.
    pub shroud: bool,
    /// Shroud is cleared as units move, rather than on explicit update.
    pub auto_shroud: bool,
    /// Hexes this side has seen.
    pub cleared: BTreeSet<Location>,
    /// Village captures this turn that extend the turn timer.
    pub action_bonus_count: u32,
    /// Scenario statistics.
    pub stats: SideStatistics,
}

impl Side {
    /// A side with no recruits, no roster and no fog or shroud.
    pub fn new(id: SideId, controller: Controller, gold: i32) -> Self {
        Self {
            id,
            controller,
            gold,
            recruits: Vec::new(),
            recall_list: Vec::new(),
            fog: false,
            shroud: false,
            auto_shroud: true,
            cleared: BTreeSet::new(),
            action_bonus_count: 0,
            stats: SideStatistics::default(),
        }
    }

    /// Whether `unit_type` is on the recruit list.
    pub fn can_recruit(&self, unit_type: &str) -> bool {
        self.recruits.iter().any(|r| r == unit_type)
    }

    /// Roster index of `unit`, if present.
    pub fn recall_index(&self, unit: UnitId) -> Option<usize> {
        self.recall_list.iter().position(|u| u.id == unit)
    }

    /// Whether fog or shroud is in effect, so vision has to be tracked.
    pub fn tracks_vision(&self) -> bool {
        self.fog || self.shroud
    }

    /// Mark `loc` as seen. Returns `true` if it was not seen before.
    pub fn clear_hex(&mut self, loc: Location) -> bool {
        self.cleared.insert(loc)
    }

    /// Forget that `loc` was seen. Used when undoing a reveal.
    pub fn unclear_hex(&mut self, loc: Location) -> bool {
        self.cleared.remove(&loc)
    }
}
