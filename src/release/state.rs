//! Release states and the transition table that connects them
//!
//! The table is plain data. It is checked once when built: every
//! non-terminal state needs a `Success` edge, every state that is not a
//! `Do*` step also needs a `Failure` edge, `Do*` steps never get one, and
//! terminal states have no edges at all.

use crate::domain::BumpType;
use crate::error::{ReleaseError, Result};
use std::collections::HashMap;
use std::fmt;

/// A step of an end-to-end release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseState {
    DoMajorRelease,
    CheckMainNextIntegrated,
    PromptToIntegrateNext,
    DoMinorRelease,
    CheckOnMainBranch,
    CheckReleaseGroupIsBumped,
    PromptToCreateReleaseBranch,
    DoCreateReleaseBranch,
    DoPatchRelease,
    CheckOnReleaseBranch,
    CheckReleaseIsDone,
    PromptToRunTypeTests,
    PromptToRelease,
    DoReleaseTag,
    CheckPublished,
    DoUpdateDependents,
    PromptToCommitBump,
    DoReleaseGroupBump,
    PromptToPRBump,
    CheckMoreUnitsToRelease,
    ReleaseComplete,
    Failed,
}

impl ReleaseState {
    pub const ALL: [ReleaseState; 22] = [
        ReleaseState::DoMajorRelease,
        ReleaseState::CheckMainNextIntegrated,
        ReleaseState::PromptToIntegrateNext,
        ReleaseState::DoMinorRelease,
        ReleaseState::CheckOnMainBranch,
        ReleaseState::CheckReleaseGroupIsBumped,
        ReleaseState::PromptToCreateReleaseBranch,
        ReleaseState::DoCreateReleaseBranch,
        ReleaseState::DoPatchRelease,
        ReleaseState::CheckOnReleaseBranch,
        ReleaseState::CheckReleaseIsDone,
        ReleaseState::PromptToRunTypeTests,
        ReleaseState::PromptToRelease,
        ReleaseState::DoReleaseTag,
        ReleaseState::CheckPublished,
        ReleaseState::DoUpdateDependents,
        ReleaseState::PromptToCommitBump,
        ReleaseState::DoReleaseGroupBump,
        ReleaseState::PromptToPRBump,
        ReleaseState::CheckMoreUnitsToRelease,
        ReleaseState::ReleaseComplete,
        ReleaseState::Failed,
    ];

    /// First state for a requested bump
    pub fn entry(bump_type: BumpType) -> Self {
        match bump_type {
            BumpType::Major => ReleaseState::DoMajorRelease,
            BumpType::Minor => ReleaseState::DoMinorRelease,
            BumpType::Patch => ReleaseState::DoPatchRelease,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReleaseState::ReleaseComplete | ReleaseState::Failed)
    }

    /// `Do*` steps perform side effects and have no failure edge
    pub fn is_action(self) -> bool {
        matches!(
            self,
            ReleaseState::DoMajorRelease
                | ReleaseState::DoMinorRelease
                | ReleaseState::DoCreateReleaseBranch
                | ReleaseState::DoPatchRelease
                | ReleaseState::DoReleaseTag
                | ReleaseState::DoUpdateDependents
                | ReleaseState::DoReleaseGroupBump
        )
    }

    pub fn is_check(self) -> bool {
        matches!(
            self,
            ReleaseState::CheckMainNextIntegrated
                | ReleaseState::CheckOnMainBranch
                | ReleaseState::CheckReleaseGroupIsBumped
                | ReleaseState::CheckOnReleaseBranch
                | ReleaseState::CheckReleaseIsDone
                | ReleaseState::CheckPublished
                | ReleaseState::CheckMoreUnitsToRelease
        )
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of running one state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Success,
    Failure,
}

/// `(state, action) -> next state`, validated on construction
#[derive(Debug, Clone)]
pub struct TransitionTable {
    transitions: HashMap<(ReleaseState, Action), ReleaseState>,
}

impl TransitionTable {
    /// Build and validate a table from its edges
    pub fn new(edges: &[(ReleaseState, Action, ReleaseState)]) -> Result<Self> {
        let mut transitions = HashMap::new();
        for (from, action, to) in edges {
            if transitions.insert((*from, *action), *to).is_some() {
                return Err(ReleaseError::StateMachine(format!(
                    "{} has two {:?} transitions",
                    from, action
                )));
            }
        }
        let table = TransitionTable { transitions };
        table.validate()?;
        Ok(table)
    }

    /// The release flow: major runs the integration check then joins minor,
    /// minor cuts a release branch then joins patch.
    pub fn release() -> Result<Self> {
        use Action::{Failure, Success};
        use ReleaseState::*;

        Self::new(&[
            (DoMajorRelease, Success, CheckMainNextIntegrated),
            (CheckMainNextIntegrated, Success, DoMinorRelease),
            (CheckMainNextIntegrated, Failure, PromptToIntegrateNext),
            (PromptToIntegrateNext, Success, CheckMainNextIntegrated),
            (PromptToIntegrateNext, Failure, Failed),
            (DoMinorRelease, Success, CheckOnMainBranch),
            (CheckOnMainBranch, Success, CheckReleaseGroupIsBumped),
            (CheckOnMainBranch, Failure, Failed),
            (CheckReleaseGroupIsBumped, Success, PromptToCreateReleaseBranch),
            (CheckReleaseGroupIsBumped, Failure, Failed),
            (PromptToCreateReleaseBranch, Success, DoCreateReleaseBranch),
            (PromptToCreateReleaseBranch, Failure, Failed),
            (DoCreateReleaseBranch, Success, DoPatchRelease),
            (DoPatchRelease, Success, CheckOnReleaseBranch),
            (CheckOnReleaseBranch, Success, CheckReleaseIsDone),
            (CheckOnReleaseBranch, Failure, Failed),
            (CheckReleaseIsDone, Success, PromptToRunTypeTests),
            (CheckReleaseIsDone, Failure, Failed),
            (PromptToRunTypeTests, Success, PromptToRelease),
            (PromptToRunTypeTests, Failure, Failed),
            (PromptToRelease, Success, DoReleaseTag),
            (PromptToRelease, Failure, Failed),
            (DoReleaseTag, Success, CheckPublished),
            (CheckPublished, Success, DoUpdateDependents),
            (CheckPublished, Failure, Failed),
            (DoUpdateDependents, Success, PromptToCommitBump),
            (PromptToCommitBump, Success, DoReleaseGroupBump),
            (PromptToCommitBump, Failure, Failed),
            (DoReleaseGroupBump, Success, PromptToPRBump),
            (PromptToPRBump, Success, CheckMoreUnitsToRelease),
            (PromptToPRBump, Failure, Failed),
            (CheckMoreUnitsToRelease, Success, CheckReleaseIsDone),
            (CheckMoreUnitsToRelease, Failure, ReleaseComplete),
        ])
    }

    pub fn next(&self, state: ReleaseState, action: Action) -> Option<ReleaseState> {
        self.transitions.get(&(state, action)).copied()
    }

    fn validate(&self) -> Result<()> {
        for state in ReleaseState::ALL {
            let success = self.next(state, Action::Success);
            let failure = self.next(state, Action::Failure);

            if state.is_terminal() {
                if success.is_some() || failure.is_some() {
                    return Err(ReleaseError::StateMachine(format!(
                        "terminal state {} has outgoing transitions",
                        state
                    )));
                }
                continue;
            }

            // Unused states may be left out entirely.
            if success.is_none() && failure.is_none() {
                continue;
            }
            if success.is_none() {
                return Err(ReleaseError::StateMachine(format!(
                    "{} has no success transition",
                    state
                )));
            }
            if state.is_action() && failure.is_some() {
                return Err(ReleaseError::StateMachine(format!(
                    "{} is an action step and cannot declare a failure transition",
                    state
                )));
            }
            if !state.is_action() && failure.is_none() {
                return Err(ReleaseError::StateMachine(format!(
                    "{} has a success transition but no failure transition",
                    state
                )));
            }
        }

        for target in self.transitions.values() {
            if !target.is_terminal()
                && self.next(*target, Action::Success).is_none()
            {
                return Err(ReleaseError::StateMachine(format!(
                    "{} is reachable but has no transitions",
                    target
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::{Failure, Success};
    use ReleaseState::*;

    #[test]
    fn test_release_table_is_valid() {
        let table = TransitionTable::release().unwrap();
        assert_eq!(table.next(DoMajorRelease, Success), Some(CheckMainNextIntegrated));
        assert_eq!(table.next(CheckMoreUnitsToRelease, Failure), Some(ReleaseComplete));
        assert_eq!(table.next(DoReleaseGroupBump, Failure), None);
    }

    #[test]
    fn test_every_flow_reaches_patch_states() {
        let table = TransitionTable::release().unwrap();
        for bump in [BumpType::Major, BumpType::Minor, BumpType::Patch] {
            let mut state = ReleaseState::entry(bump);
            let mut steps = 0;
            while state != CheckReleaseIsDone {
                state = table.next(state, Success).unwrap();
                steps += 1;
                assert!(steps < ReleaseState::ALL.len());
            }
        }
    }

    #[test]
    fn test_missing_failure_rejected() {
        let err = TransitionTable::new(&[
            (DoPatchRelease, Success, CheckOnReleaseBranch),
            (CheckOnReleaseBranch, Success, ReleaseComplete),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("CheckOnReleaseBranch"));
        assert!(err.to_string().contains("no failure transition"));
    }

    #[test]
    fn test_action_with_failure_rejected() {
        let err = TransitionTable::new(&[
            (DoReleaseTag, Success, ReleaseComplete),
            (DoReleaseTag, Failure, Failed),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DoReleaseTag"));
    }

    #[test]
    fn test_terminal_with_edges_rejected() {
        assert!(TransitionTable::new(&[(Failed, Success, ReleaseComplete)]).is_err());
    }

    #[test]
    fn test_dangling_target_rejected() {
        let err = TransitionTable::new(&[(DoPatchRelease, Success, CheckOnReleaseBranch)])
            .unwrap_err();
        assert!(err.to_string().contains("reachable"));
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        assert!(TransitionTable::new(&[
            (DoPatchRelease, Success, ReleaseComplete),
            (DoPatchRelease, Success, Failed),
        ])
        .is_err());
    }

    #[test]
    fn test_state_classification() {
        assert!(DoReleaseGroupBump.is_action());
        assert!(!PromptToRelease.is_action());
        assert!(CheckPublished.is_check());
        assert!(Failed.is_terminal());
        assert_eq!(CheckMainNextIntegrated.to_string(), "CheckMainNextIntegrated");
    }
}
