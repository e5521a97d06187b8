//! Escrow Registry - problems, solutions and bounty settlement
//!
//! The registry owns every problem and solution record and is the only
//! path by which bounty tokens enter or leave its custody account:
//! `post_problem` pulls the bounty in, `select_winner` pays it out.
//!
//! All state sits behind a single write lock. A state-changing call holds
//! the guard from its first precondition check through the ledger call and
//! the event emission, so calls are applied one at a time and a rejected
//! call leaves the registry exactly as it found it.

use crate::{
    error::RegistryError,
    event_publisher::EventPublisher,
    models::{Identity, Problem, ProblemId, RegistryEvent, Solution, TokenAmount},
    token_ledger::TokenLedger,
    RegistryResult,
};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A problem together with its submissions
#[derive(Debug)]
struct ProblemEntry {
    problem: Problem,
    solutions: Vec<Solution>,
    submitted: HashSet<Identity>,
}

/// Append-only problem table; problem `n` lives at index `n - 1`
#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<ProblemEntry>,
}

impl RegistryState {
    fn problem_count(&self) -> ProblemId {
        self.entries.len() as ProblemId
    }

    fn slot(problem_id: ProblemId) -> Option<usize> {
        usize::try_from(problem_id).ok()?.checked_sub(1)
    }

    fn entry(&self, problem_id: ProblemId) -> RegistryResult<&ProblemEntry> {
        Self::slot(problem_id)
            .and_then(|slot| self.entries.get(slot))
            .ok_or(RegistryError::ProblemNotFound(problem_id))
    }

    fn entry_mut(&mut self, problem_id: ProblemId) -> RegistryResult<&mut ProblemEntry> {
        Self::slot(problem_id)
            .and_then(|slot| self.entries.get_mut(slot))
            .ok_or(RegistryError::ProblemNotFound(problem_id))
    }
}

/// The escrow registry
pub struct EscrowRegistry {
    /// Custody account holding every open bounty
    identity: Identity,
    state: RwLock<RegistryState>,
    ledger: Arc<dyn TokenLedger>,
    publisher: Arc<EventPublisher>,
}

impl EscrowRegistry {
    pub fn new(
        identity: Identity,
        ledger: Arc<dyn TokenLedger>,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            identity,
            state: RwLock::new(RegistryState::default()),
            ledger,
            publisher,
        }
    }

    /// Identity of the registry's custody account; callers approve this as spender
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// A transfer from custody to custody moves nothing, so the registry's
    /// own account may neither fund a bounty nor win one.
    fn ensure_not_custody(&self, caller: &Identity) -> RegistryResult<()> {
        if caller == &self.identity {
            warn!("Rejected call from registry custody account {}", caller);
            return Err(RegistryError::CustodyCaller(caller.clone()));
        }
        Ok(())
    }

    /// Post a problem and pull its bounty into custody
    ///
    /// The caller must already have approved the registry for at least
    /// `bounty_amount`. If the pull fails no problem is created.
    pub async fn post_problem(
        &self,
        caller: &Identity,
        metadata_ipfs: &str,
        bounty_amount: TokenAmount,
    ) -> RegistryResult<ProblemId> {
        info!("Posting problem from {} with bounty {}", caller, bounty_amount);

        if bounty_amount == 0 {
            return Err(RegistryError::InvalidBounty);
        }

        if metadata_ipfs.is_empty() {
            return Err(RegistryError::InvalidMetadata);
        }

        self.ensure_not_custody(caller)?;

        let mut state = self.state.write().await;
        let problem_id = state.problem_count() + 1;

        self.ledger
            .transfer_from(&self.identity, caller, &self.identity, bounty_amount)
            .await
            .inspect_err(|e| warn!("Bounty pull from {} failed: {}", caller, e))?;

        state.entries.push(ProblemEntry {
            problem: Problem::new(
                problem_id,
                caller.clone(),
                bounty_amount,
                metadata_ipfs.to_string(),
            ),
            solutions: Vec::new(),
            submitted: HashSet::new(),
        });

        self.publisher
            .publish(RegistryEvent::ProblemPosted {
                problem_id,
                creator: caller.clone(),
                bounty_amount,
                metadata_ipfs: metadata_ipfs.to_string(),
            })
            .await;

        info!("Posted problem: {}", problem_id);

        Ok(problem_id)
    }

    /// Submit a solution reference; returns its index in the problem's solution list
    pub async fn submit_solution(
        &self,
        caller: &Identity,
        problem_id: ProblemId,
        solution_ipfs: &str,
    ) -> RegistryResult<usize> {
        info!("Submitting solution for problem {} from {}", problem_id, caller);

        let mut state = self.state.write().await;
        let entry = state.entry_mut(problem_id)?;

        // Solved is checked before duplicates so a closed problem rejects everyone alike.
        if entry.problem.is_solved {
            return Err(RegistryError::ProblemAlreadySolved);
        }

        if entry.submitted.contains(caller) {
            return Err(RegistryError::DuplicateSubmission);
        }

        if solution_ipfs.is_empty() {
            return Err(RegistryError::InvalidMetadata);
        }

        self.ensure_not_custody(caller)?;

        let index = entry.solutions.len();
        entry
            .solutions
            .push(Solution::new(caller.clone(), solution_ipfs.to_string()));
        entry.submitted.insert(caller.clone());

        self.publisher
            .publish(RegistryEvent::SolutionSubmitted {
                problem_id,
                solver: caller.clone(),
                solution_ipfs: solution_ipfs.to_string(),
            })
            .await;

        info!("Submitted solution {} for problem {}", index, problem_id);

        Ok(index)
    }

    /// Choose the winning solution and pay its solver the full bounty
    ///
    /// The problem is only marked solved once the payout has gone through.
    pub async fn select_winner(
        &self,
        caller: &Identity,
        problem_id: ProblemId,
        solver_index: usize,
    ) -> RegistryResult<Identity> {
        info!(
            "Selecting winner {} for problem {} by {}",
            solver_index, problem_id, caller
        );

        let mut state = self.state.write().await;
        let entry = state.entry_mut(problem_id)?;

        if !entry.problem.is_creator(caller) {
            return Err(RegistryError::NotCreator);
        }

        if entry.problem.is_solved {
            return Err(RegistryError::ProblemAlreadySolved);
        }

        let count = entry.solutions.len();
        let winner = entry
            .solutions
            .get(solver_index)
            .map(|solution| solution.solver.clone())
            .ok_or_else(|| RegistryError::index_out_of_range(solver_index, count))?;
        let amount = entry.problem.bounty_amount;

        self.ledger
            .transfer(&self.identity, &winner, amount)
            .await
            .inspect_err(|e| warn!("Bounty payout for problem {} failed: {}", problem_id, e))?;

        entry.problem.mark_solved(winner.clone());

        self.publisher
            .publish(RegistryEvent::BountyClaimed {
                problem_id,
                solver: winner.clone(),
                amount,
            })
            .await;

        info!("Problem {} solved by {}", problem_id, winner);

        Ok(winner)
    }

    /// Get a problem by ID
    pub async fn get_problem(&self, problem_id: ProblemId) -> RegistryResult<Problem> {
        Ok(self.state.read().await.entry(problem_id)?.problem.clone())
    }

    /// Number of solutions submitted for a problem
    pub async fn get_solution_count(&self, problem_id: ProblemId) -> RegistryResult<usize> {
        Ok(self.state.read().await.entry(problem_id)?.solutions.len())
    }

    pub async fn get_solution(
        &self,
        problem_id: ProblemId,
        index: usize,
    ) -> RegistryResult<Solution> {
        let state = self.state.read().await;
        let entry = state.entry(problem_id)?;

        entry
            .solutions
            .get(index)
            .cloned()
            .ok_or_else(|| RegistryError::index_out_of_range(index, entry.solutions.len()))
    }

    /// Number of problems posted so far; also the highest assigned id
    pub async fn problem_count(&self) -> ProblemId {
        self.state.read().await.problem_count()
    }

    pub async fn has_submitted(
        &self,
        problem_id: ProblemId,
        who: &Identity,
    ) -> RegistryResult<bool> {
        Ok(self.state.read().await.entry(problem_id)?.submitted.contains(who))
    }

    /// All problems in id order
    pub async fn list_problems(&self) -> Vec<Problem> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .map(|entry| entry.problem.clone())
            .collect()
    }

    /// All solutions for a problem in submission order
    pub async fn list_solutions(&self, problem_id: ProblemId) -> RegistryResult<Vec<Solution>> {
        Ok(self.state.read().await.entry(problem_id)?.solutions.clone())
    }

    /// Tokens currently held in custody
    pub async fn custody_balance(&self) -> RegistryResult<TokenAmount> {
        self.ledger
            .balance_of(&self.identity)
            .await
            .map_err(RegistryError::ledger_query)
    }
}
