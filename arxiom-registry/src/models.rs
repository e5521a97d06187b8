//! Core data models for the bounty registry
//!
//! Problems, solutions, the identities that own them, and the
//! notifications emitted when registry state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential, 1-based problem identifier
pub type ProblemId = u64;

/// Token quantity in the ledger's base units
pub type TokenAmount = u128;

/// Opaque identity of a party (account address, public key, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A posted problem and its escrowed bounty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub creator: Identity,
    pub bounty_amount: TokenAmount,
    pub metadata_ipfs: String,
    pub is_solved: bool,
    pub chosen_solver: Option<Identity>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Create a new open problem
    pub fn new(
        id: ProblemId,
        creator: Identity,
        bounty_amount: TokenAmount,
        metadata_ipfs: String,
    ) -> Self {
        Self {
            id,
            creator,
            bounty_amount,
            metadata_ipfs,
            is_solved: false,
            chosen_solver: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_creator(&self, caller: &Identity) -> bool {
        &self.creator == caller
    }

    /// Record the winner. The caller has already checked the problem is open.
    pub(crate) fn mark_solved(&mut self, winner: Identity) {
        debug_assert!(!self.is_solved, "problem {} solved twice", self.id);
        self.is_solved = true;
        self.chosen_solver = Some(winner);
    }
}

/// A candidate solution submitted against a problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub solver: Identity,
    pub solution_ipfs: String,
    pub timestamp: DateTime<Utc>,
}

impl Solution {
    pub fn new(solver: Identity, solution_ipfs: String) -> Self {
        Self {
            solver,
            solution_ipfs,
            timestamp: Utc::now(),
        }
    }
}

/// Notification emitted after a state change commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    ProblemPosted {
        problem_id: ProblemId,
        creator: Identity,
        bounty_amount: TokenAmount,
        metadata_ipfs: String,
    },
    SolutionSubmitted {
        problem_id: ProblemId,
        solver: Identity,
        solution_ipfs: String,
    },
    BountyClaimed {
        problem_id: ProblemId,
        solver: Identity,
        amount: TokenAmount,
    },
}

impl RegistryEvent {
    pub fn problem_id(&self) -> ProblemId {
        match self {
            Self::ProblemPosted { problem_id, .. }
            | Self::SolutionSubmitted { problem_id, .. }
            | Self::BountyClaimed { problem_id, .. } => *problem_id,
        }
    }

    /// Stable event name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProblemPosted { .. } => "ProblemPosted",
            Self::SolutionSubmitted { .. } => "SolutionSubmitted",
            Self::BountyClaimed { .. } => "BountyClaimed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_problem_is_open() {
        let problem = Problem::new(1, "researcher".into(), 100, "QmProblem".to_string());

        assert!(!problem.is_solved);
        assert!(problem.chosen_solver.is_none());
        assert!(problem.is_creator(&Identity::from("researcher")));
        assert!(!problem.is_creator(&Identity::from("solver")));
    }

    #[test]
    fn test_mark_solved_sets_winner() {
        let mut problem = Problem::new(7, "researcher".into(), 5, "QmProblem".to_string());
        problem.mark_solved("solver".into());

        assert!(problem.is_solved);
        assert_eq!(problem.chosen_solver, Some(Identity::from("solver")));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = RegistryEvent::BountyClaimed {
            problem_id: 3,
            solver: "solver".into(),
            amount: 100,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "bounty_claimed");
        assert_eq!(json["solver"], "solver");
        assert_eq!(event.problem_id(), 3);
        assert_eq!(event.name(), "BountyClaimed");
    }
}
