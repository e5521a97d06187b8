//! Token Ledger - fungible token interface consumed by the registry
//!
//! The registry never owns token balances itself. It pulls bounties into
//! custody with `transfer_from` (after the owner has called `approve`) and
//! pays winners with `transfer`. Any backend with conventional
//! balance/allowance semantics can sit behind [`TokenLedger`];
//! [`InMemoryTokenLedger`] is the one used by hosts and tests.

use crate::error::LedgerError;
use crate::models::{Identity, TokenAmount};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Result type alias for ledger calls
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Standard balance/allowance token interface
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Set `spender`'s allowance over `owner`'s balance, replacing any previous value
    async fn approve(
        &self,
        owner: &Identity,
        spender: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()>;

    /// Move `amount` from `owner` to `to` on behalf of `spender`, consuming allowance
    async fn transfer_from(
        &self,
        spender: &Identity,
        owner: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()>;

    /// Move `amount` from `from`'s own balance to `to`
    async fn transfer(&self, from: &Identity, to: &Identity, amount: TokenAmount)
        -> LedgerResult<()>;

    async fn balance_of(&self, who: &Identity) -> LedgerResult<TokenAmount>;

    async fn allowance(&self, owner: &Identity, spender: &Identity) -> LedgerResult<TokenAmount>;
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Identity, TokenAmount>,
    allowances: HashMap<(Identity, Identity), TokenAmount>,
    total_supply: TokenAmount,
}

impl LedgerState {
    fn balance(&self, who: &Identity) -> TokenAmount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Debit and credit in one step; nothing is written unless both sides succeed.
    fn move_balance(
        &mut self,
        from: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);

        Ok(())
    }
}

/// In-process token ledger
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new tokens for `to`
    pub async fn mint(&self, to: &Identity, amount: TokenAmount) -> LedgerResult<()> {
        let mut state = self.state.write().await;

        let total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        state.total_supply = total_supply;
        state.balances.insert(to.clone(), balance);

        debug!("Minted {} to {}", amount, to);

        Ok(())
    }

    pub async fn total_supply(&self) -> TokenAmount {
        self.state.read().await.total_supply
    }
}

#[async_trait]
impl TokenLedger for InMemoryTokenLedger {
    async fn approve(
        &self,
        owner: &Identity,
        spender: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()> {
        self.state
            .write()
            .await
            .allowances
            .insert((owner.clone(), spender.clone()), amount);

        debug!("{} approved {} for {}", owner, spender, amount);

        Ok(())
    }

    async fn transfer_from(
        &self,
        spender: &Identity,
        owner: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;

        let key = (owner.clone(), spender.clone());
        let approved = state.allowances.get(&key).copied().unwrap_or(0);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                approved,
                required: amount,
            });
        }

        state.move_balance(owner, to, amount)?;
        state.allowances.insert(key, approved - amount);

        debug!("{} moved {} from {} to {}", spender, amount, owner, to);

        Ok(())
    }

    async fn transfer(
        &self,
        from: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> LedgerResult<()> {
        self.state.write().await.move_balance(from, to, amount)?;

        debug!("Transferred {} from {} to {}", amount, from, to);

        Ok(())
    }

    async fn balance_of(&self, who: &Identity) -> LedgerResult<TokenAmount> {
        Ok(self.state.read().await.balance(who))
    }

    async fn allowance(&self, owner: &Identity, spender: &Identity) -> LedgerResult<TokenAmount> {
        Ok(self
            .state
            .read()
            .await
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0))
    }
}
