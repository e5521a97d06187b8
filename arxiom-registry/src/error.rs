//! Error types for the bounty registry
//!
//! Every rejection the registry can produce is a distinct variant so that
//! clients can tell "insufficient allowance" apart from "problem already
//! solved" and present an actionable message.

use crate::models::{Identity, ProblemId};
use thiserror::Error;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Bounty amount was zero
    #[error("Bounty must be greater than 0")]
    InvalidBounty,

    /// Content reference (problem metadata or solution) was empty
    #[error("IPFS hash required")]
    InvalidMetadata,

    /// Token pull into custody or payout out of custody failed
    #[error("Token transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    /// No problem exists with this id
    #[error("Problem {0} not found")]
    ProblemNotFound(ProblemId),

    /// Problem already has a chosen solver
    #[error("Problem already solved")]
    ProblemAlreadySolved,

    /// Caller already submitted a solution for this problem
    #[error("Already submitted solution")]
    DuplicateSubmission,

    /// Only the problem creator may select a winner
    #[error("Only creator can select winner")]
    NotCreator,

    /// Solution index is past the end of the problem's solution list
    #[error("Invalid solution index {index} (solution count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// The registry's own custody account tried to post or submit
    #[error("Registry custody account {0} cannot act as a caller")]
    CustodyCaller(Identity),

    /// Balance or allowance lookup failed
    #[error("Ledger query failed: {0}")]
    LedgerQuery(LedgerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an index error
    pub fn index_out_of_range(index: usize, count: usize) -> Self {
        Self::IndexOutOfRange { index, count }
    }

    /// Wrap a failed read or approval; token movements use `TransferFailed`
    pub fn ledger_query(err: LedgerError) -> Self {
        Self::LedgerQuery(err)
    }
}

impl From<config::ConfigError> for RegistryError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Errors raised by a token ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Holder balance is below the requested amount
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u128, required: u128 },

    /// Spender allowance is below the requested amount
    #[error("insufficient allowance: approved {approved}, required {required}")]
    InsufficientAllowance { approved: u128, required: u128 },

    /// Credit would overflow the recipient's balance or the total supply
    #[error("balance overflow")]
    Overflow,

    /// Ledger backend could not process the call
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_failed_wraps_ledger_error() {
        let err: RegistryError = LedgerError::InsufficientAllowance {
            approved: 10,
            required: 100,
        }
        .into();

        assert!(matches!(err, RegistryError::TransferFailed(_)));
        assert_eq!(
            err.to_string(),
            "Token transfer failed: insufficient allowance: approved 10, required 100"
        );
    }

    #[test]
    fn test_index_error_message() {
        let err = RegistryError::index_out_of_range(3, 2);
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn test_ledger_query_is_not_a_transfer() {
        let err = RegistryError::ledger_query(LedgerError::unavailable("offline"));

        assert!(matches!(err, RegistryError::LedgerQuery(_)));
        assert_eq!(err.to_string(), "Ledger query failed: ledger unavailable: offline");
    }
}
