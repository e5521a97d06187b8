//! Token-bounty escrow registry
//!
//! Researchers post problems with a token bounty, solvers submit content
//! references as candidate solutions, and the problem creator selects the
//! winner, which releases the escrowed bounty. This crate provides:
//! - the escrow registry state machine
//! - a token ledger interface plus an in-memory implementation
//! - ordered notifications for every committed state change
//! - a configurable node and per-identity client API

pub mod config;
pub mod error;
pub mod event_publisher;
pub mod models;
pub mod node;
pub mod registry;
pub mod token_ledger;
pub mod units;

pub use crate::config::RegistryConfig;
pub use crate::error::{LedgerError, RegistryError};
pub use crate::models::{Identity, Problem, ProblemId, RegistryEvent, Solution, TokenAmount};
pub use crate::node::{RegistryClient, RegistryNode};

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
