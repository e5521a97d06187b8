//! Registry Node - high-level API for hosts and clients
//!
//! The node wires a token ledger, the event publisher and the escrow
//! registry together from a [`RegistryConfig`]. Clients act through a
//! [`RegistryClient`] bound to their identity, which keeps the token
//! protocol's two-step shape: approve the registry first, then post.

use crate::{
    config::RegistryConfig,
    error::RegistryError,
    event_publisher::{EventPublisher, EventPublisherConfig, EventRecord},
    models::{Identity, Problem, ProblemId, Solution, TokenAmount},
    registry::EscrowRegistry,
    token_ledger::{InMemoryTokenLedger, TokenLedger},
    RegistryResult,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Main registry node that coordinates all components
pub struct RegistryNode {
    config: RegistryConfig,
    registry: Arc<EscrowRegistry>,
    ledger: Arc<dyn TokenLedger>,
    publisher: Arc<EventPublisher>,
}

impl RegistryNode {
    /// Create a node backed by an in-memory ledger seeded with the genesis balances
    pub async fn new(config: RegistryConfig) -> RegistryResult<Self> {
        Ok(Self::in_memory(config).await?.0)
    }

    /// Like [`RegistryNode::new`], also handing back the ledger for minting
    pub async fn in_memory(
        config: RegistryConfig,
    ) -> RegistryResult<(Self, Arc<InMemoryTokenLedger>)> {
        config.validate()?;

        let ledger = Arc::new(InMemoryTokenLedger::new());
        for (identity, amount) in config.genesis_balances()? {
            ledger.mint(&identity, amount).await.map_err(|e| {
                RegistryError::config(format!("genesis mint for {}: {}", identity, e))
            })?;
        }

        info!(
            "Seeded in-memory {} ledger with {} genesis balances",
            config.token.symbol,
            config.genesis.len()
        );

        let node = Self::with_ledger(config, ledger.clone())?;
        Ok((node, ledger))
    }

    /// Create a node on top of an existing ledger
    pub fn with_ledger(config: RegistryConfig, ledger: Arc<dyn TokenLedger>) -> RegistryResult<Self> {
        config.validate()?;

        let publisher = Arc::new(EventPublisher::new(EventPublisherConfig {
            channel_capacity: config.event_channel_capacity,
        }));
        let registry = Arc::new(EscrowRegistry::new(
            config.registry_identity(),
            ledger.clone(),
            publisher.clone(),
        ));

        info!(
            "Registry node ready (custody: {}, token: {})",
            registry.identity(),
            config.token.address
        );

        Ok(Self {
            config,
            registry,
            ledger,
            publisher,
        })
    }

    /// Act as `identity`
    pub fn client(&self, identity: impl Into<Identity>) -> RegistryClient {
        RegistryClient {
            identity: identity.into(),
            registry: self.registry.clone(),
            ledger: self.ledger.clone(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn registry(&self) -> &EscrowRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    pub fn registry_identity(&self) -> &Identity {
        self.registry.identity()
    }

    /// Address of the bounty token
    pub fn token_address(&self) -> &str {
        &self.config.token.address
    }

    pub async fn get_problem(&self, problem_id: ProblemId) -> RegistryResult<Problem> {
        self.registry.get_problem(problem_id).await
    }

    pub async fn get_solution_count(&self, problem_id: ProblemId) -> RegistryResult<usize> {
        self.registry.get_solution_count(problem_id).await
    }

    pub async fn get_solution(&self, problem_id: ProblemId, index: usize) -> RegistryResult<Solution> {
        self.registry.get_solution(problem_id, index).await
    }

    pub async fn problem_count(&self) -> ProblemId {
        self.registry.problem_count().await
    }

    pub async fn has_submitted(&self, problem_id: ProblemId, who: &Identity) -> RegistryResult<bool> {
        self.registry.has_submitted(problem_id, who).await
    }

    pub async fn list_problems(&self) -> Vec<Problem> {
        self.registry.list_problems().await
    }

    pub async fn list_solutions(&self, problem_id: ProblemId) -> RegistryResult<Vec<Solution>> {
        self.registry.list_solutions(problem_id).await
    }

    pub async fn custody_balance(&self) -> RegistryResult<TokenAmount> {
        self.registry.custody_balance().await
    }

    pub async fn balance_of(&self, who: &Identity) -> RegistryResult<TokenAmount> {
        self.ledger
            .balance_of(who)
            .await
            .map_err(RegistryError::ledger_query)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.publisher.subscribe()
    }

    pub async fn events(&self) -> Vec<EventRecord> {
        self.publisher.events().await
    }

    pub async fn events_for_problem(&self, problem_id: ProblemId) -> Vec<EventRecord> {
        self.publisher.events_for_problem(problem_id).await
    }
}

/// Registry access on behalf of one identity
#[derive(Clone)]
pub struct RegistryClient {
    identity: Identity,
    registry: Arc<EscrowRegistry>,
    ledger: Arc<dyn TokenLedger>,
}

impl RegistryClient {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Allow the registry to pull up to `amount` of this identity's tokens
    pub async fn approve_registry(&self, amount: TokenAmount) -> RegistryResult<()> {
        self.ledger
            .approve(&self.identity, self.registry.identity(), amount)
            .await
            .map_err(RegistryError::ledger_query)
    }

    /// Current allowance granted to the registry
    pub async fn registry_allowance(&self) -> RegistryResult<TokenAmount> {
        self.ledger
            .allowance(&self.identity, self.registry.identity())
            .await
            .map_err(RegistryError::ledger_query)
    }

    pub async fn post_problem(
        &self,
        metadata_ipfs: &str,
        bounty_amount: TokenAmount,
    ) -> RegistryResult<ProblemId> {
        self.registry
            .post_problem(&self.identity, metadata_ipfs, bounty_amount)
            .await
    }

    pub async fn submit_solution(
        &self,
        problem_id: ProblemId,
        solution_ipfs: &str,
    ) -> RegistryResult<usize> {
        self.registry
            .submit_solution(&self.identity, problem_id, solution_ipfs)
            .await
    }

    pub async fn select_winner(
        &self,
        problem_id: ProblemId,
        solver_index: usize,
    ) -> RegistryResult<Identity> {
        self.registry
            .select_winner(&self.identity, problem_id, solver_index)
            .await
    }

    pub async fn balance(&self) -> RegistryResult<TokenAmount> {
        self.ledger
            .balance_of(&self.identity)
            .await
            .map_err(RegistryError::ledger_query)
    }
}
