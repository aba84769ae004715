//! Structured early exits threaded back through synced actions.
//!
//! Ending a side turn or a scenario can be triggered from deep inside a
//! nested synced action (an event fired by a move, say). Instead of
//! unwinding, every call that can trigger one returns a [`ControlFlow`]
//! and callers stop doing further work once it is not `Continue`.

/// How a scenario ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// The local sides won.
    Victory,
    /// The local sides lost.
    Defeat,
}

/// Whether the caller should keep going after an action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlFlow {
    /// Nothing special happened.
    #[default]
    Continue,
    /// The current side's turn is over.
    EndTurn,
    /// The scenario is over.
    EndScenario(ScenarioOutcome),
}

impl ControlFlow {
    /// `true` for [`ControlFlow::Continue`].
    pub fn is_continue(self) -> bool {
        matches!(self, ControlFlow::Continue)
    }

    /// Combine two flows, keeping the more severe one.
    ///
    /// Ending the scenario outranks ending the turn, which outranks
    /// continuing. Between two scenario endings the first one wins.
    pub fn merge(self, other: ControlFlow) -> ControlFlow {
        match (self, other) {
            (ControlFlow::EndScenario(_), _) => self,
            (_, ControlFlow::EndScenario(_)) => other,
            (ControlFlow::EndTurn, _) | (_, ControlFlow::EndTurn) => ControlFlow::EndTurn,
            _ => ControlFlow::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_most_severe() {
        use ControlFlow::*;
        assert_eq!(Continue.merge(Continue), Continue);
        assert_eq!(Continue.merge(EndTurn), EndTurn);
        assert_eq!(EndTurn.merge(Continue), EndTurn);
        assert_eq!(
            EndTurn.merge(EndScenario(ScenarioOutcome::Defeat)),
            EndScenario(ScenarioOutcome::Defeat)
        );
        assert_eq!(
            EndScenario(ScenarioOutcome::Victory).merge(EndScenario(ScenarioOutcome::Defeat)),
            EndScenario(ScenarioOutcome::Victory)
        );
    }
}
