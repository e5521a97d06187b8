//! Configuration for a registry node
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `ARXIOM_`-prefixed environment variables (nested keys use `__`, e.g.
//! `ARXIOM_TOKEN__DECIMALS=6`).

use crate::{
    error::RegistryError,
    models::{Identity, TokenAmount},
    units::{self, MAX_DECIMALS},
    RegistryResult,
};
use config::{builder::DefaultState, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Token the registry escrows bounties in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u32,
    /// Ledger address of the token contract
    pub address: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            symbol: "cUSD".to_string(),
            decimals: 18,
            address: "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1".to_string(), // Celo Alfajores
        }
    }
}

/// Balance minted into the in-memory ledger at node start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub identity: String,
    /// Human-readable amount, e.g. "1000" or "12.5"
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Custody account of the registry
    pub registry_identity: String,
    pub token: TokenConfig,
    /// Buffered events per live subscriber
    pub event_channel_capacity: usize,
    pub genesis: Vec<GenesisBalance>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_identity: "arxiom-registry".to_string(),
            token: TokenConfig::default(),
            event_channel_capacity: 256,
            genesis: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Load defaults, an optional config file, then environment overrides
    pub fn load(path: Option<&Path>) -> RegistryResult<Self> {
        let mut builder = Self::defaults()?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Self::finish(
            builder.add_source(
                Environment::with_prefix("ARXIOM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    /// Load defaults overlaid with a TOML document
    pub fn from_toml_str(toml: &str) -> RegistryResult<Self> {
        Self::finish(Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn defaults() -> RegistryResult<ConfigBuilder<DefaultState>> {
        Ok(config::Config::builder().add_source(config::Config::try_from(&Self::default())?))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> RegistryResult<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.registry_identity.trim().is_empty() {
            return Err(RegistryError::config("registry_identity cannot be empty"));
        }

        if self.token.decimals > MAX_DECIMALS {
            return Err(RegistryError::config(format!(
                "token decimals {} exceed maximum {}",
                self.token.decimals, MAX_DECIMALS
            )));
        }

        self.genesis_balances().map(|_| ())
    }

    pub fn registry_identity(&self) -> Identity {
        Identity::new(self.registry_identity.clone())
    }

    /// Genesis balances converted to base units
    pub fn genesis_balances(&self) -> RegistryResult<Vec<(Identity, TokenAmount)>> {
        self.genesis
            .iter()
            .map(|balance| {
                if balance.identity.trim().is_empty() {
                    return Err(RegistryError::config("genesis identity cannot be empty"));
                }
                let amount = units::parse_units(&balance.amount, self.token.decimals)
                    .map_err(|e| {
                        RegistryError::config(format!(
                            "genesis balance for {}: {}",
                            balance.identity, e
                        ))
                    })?;
                Ok((Identity::new(balance.identity.clone()), amount))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RegistryConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.token.decimals, 18);
    }

    #[test]
    fn test_toml_overrides() {
        let config = RegistryConfig::from_toml_str(
            r#"
            registry_identity = "escrow"

            [token]
            symbol = "TST"
            decimals = 6
            address = "0xtoken"

            [[genesis]]
            identity = "researcher"
            amount = "1000.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry_identity(), Identity::from("escrow"));
        assert_eq!(config.token.symbol, "TST");
        assert_eq!(
            config.genesis_balances().unwrap(),
            vec![(Identity::from("researcher"), 1_000_500_000)]
        );
    }

    #[test]
    fn test_invalid_genesis_amount() {
        let result = RegistryConfig::from_toml_str(
            r#"
            [[genesis]]
            identity = "researcher"
            amount = "lots"
            "#,
        );

        assert!(matches!(result, Err(RegistryError::Config(msg)) if msg.contains("researcher")));
    }

    #[test]
    fn test_empty_registry_identity_rejected() {
        let result = RegistryConfig::from_toml_str(r#"registry_identity = """#);
        assert!(matches!(result, Err(RegistryError::Config(_))));
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("ARXIOM_TOKEN__DECIMALS", "6");
        std::env::set_var("ARXIOM_REGISTRY_IDENTITY", "escrow-x");

        let result = RegistryConfig::load(None);

        std::env::remove_var("ARXIOM_TOKEN__DECIMALS");
        std::env::remove_var("ARXIOM_REGISTRY_IDENTITY");

        let config = result.unwrap();
        assert_eq!(config.token.decimals, 6);
        assert_eq!(config.token.symbol, "cUSD");
        assert_eq!(config.registry_identity(), Identity::from("escrow-x"));
    }
}
