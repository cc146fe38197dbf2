//! Precompile activation settings sourced from chainspec extras or the environment.

use crate::{
    address::STATIC_PRECOMPILE_ADDRESSES,
    codec::{CapabilityOptions, CodecError, DEFAULT_ACCOUNT_PREFIX},
    erc20::TokenMetadata,
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, env, str::FromStr};
use thiserror::Error;

/// Key of the chainspec extras object holding [`PrecompilesConfig`].
pub const CHAINSPEC_EXTRAS_KEY: &str = "infinite";

/// Comma separated list of active static precompile addresses.
pub const ACTIVE_PRECOMPILES_ENV: &str = "INFINITE_ACTIVE_PRECOMPILES";

/// Account bech32 prefix.
pub const BECH32_PREFIX_ENV: &str = "INFINITE_BECH32_PREFIX";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ChainspecInfiniteConfig {
    #[serde(default, rename = "activeStaticPrecompiles")]
    pub active_static_precompiles: Option<Vec<Address>>,
    #[serde(default, rename = "bech32Prefix")]
    pub bech32_prefix: Option<String>,
    #[serde(default, rename = "nativeErc20Tokens")]
    pub native_erc20_tokens: Option<Vec<TokenMetadata>>,
    #[serde(default, rename = "ethereumPrecompiles")]
    pub ethereum_precompiles: Option<bool>,
}

/// Which precompiles a chain activates and how addresses are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrecompilesConfig {
    /// Install Ethereum's standard precompiles at `0x01..=0x11`.
    pub ethereum_precompiles: bool,
    /// Static precompile addresses to install. Defaults to all of them.
    pub active_static_precompiles: Vec<Address>,
    /// Account bech32 prefix; validator and consensus prefixes are derived from it.
    pub bech32_prefix: String,
    /// Native denominations exposed as ERC-20 token pairs.
    pub native_erc20_tokens: Vec<TokenMetadata>,
}

impl Default for PrecompilesConfig {
    fn default() -> Self {
        Self {
            ethereum_precompiles: true,
            active_static_precompiles: STATIC_PRECOMPILE_ADDRESSES.to_vec(),
            bech32_prefix: DEFAULT_ACCOUNT_PREFIX.to_string(),
            native_erc20_tokens: Vec::new(),
        }
    }
}

impl PrecompilesConfig {
    /// Builds the configuration from a chainspec `config` extras object.
    ///
    /// Missing keys keep their defaults; an absent `infinite` object yields the
    /// default configuration.
    pub fn from_extras(extras: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = extras.get(CHAINSPEC_EXTRAS_KEY) {
            let extras = ChainspecInfiniteConfig::deserialize(raw)?;
            if let Some(active) = extras.active_static_precompiles {
                config.active_static_precompiles = active;
            }
            if let Some(prefix) = extras.bech32_prefix {
                config.bech32_prefix = prefix;
            }
            if let Some(tokens) = extras.native_erc20_tokens {
                config.native_erc20_tokens = tokens;
            }
            if let Some(enabled) = extras.ethereum_precompiles {
                config.ethereum_precompiles = enabled;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Overrides fields whose environment variable is set.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(raw) = read_env(ACTIVE_PRECOMPILES_ENV)? {
            self.active_static_precompiles = parse_address_list(&raw)?;
        }
        if let Some(prefix) = read_env(BECH32_PREFIX_ENV)? {
            self.bech32_prefix = prefix;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the prefix and rejects duplicate entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capability_options()?;

        let mut seen = HashSet::new();
        for address in &self.active_static_precompiles {
            if !seen.insert(address) {
                return Err(ConfigError::DuplicateAddress(*address));
            }
        }

        let mut denoms = HashSet::new();
        for token in &self.native_erc20_tokens {
            if !denoms.insert(token.denom.as_str()) {
                return Err(ConfigError::DuplicateToken(token.denom.clone()));
            }
        }
        Ok(())
    }

    /// Returns true if the static precompile at `address` is active.
    pub fn is_active(&self, address: &Address) -> bool {
        self.active_static_precompiles.contains(address)
    }

    /// Codec triple derived from [`bech32_prefix`](Self::bech32_prefix).
    pub fn capability_options(&self) -> Result<CapabilityOptions, CodecError> {
        CapabilityOptions::with_prefix(&self.bech32_prefix)
    }
}

fn read_env(var: &str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(raw) if raw.trim().is_empty() => Err(ConfigError::EmptyEnv { var: var.into() }),
        Ok(raw) => Ok(Some(raw.trim().to_string())),
        Err(_) => Ok(None),
    }
}

fn parse_address_list(raw: &str) -> Result<Vec<Address>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Address::from_str(value).map_err(|err| ConfigError::InvalidAddress {
                value: value.to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}

/// Errors that can occur while building a [`PrecompilesConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The chainspec extras object could not be deserialized.
    #[error("invalid `infinite` chainspec extras: {0}")]
    InvalidExtras(#[from] serde_json::Error),
    /// An environment variable was set but empty.
    #[error("environment variable {var} is empty")]
    EmptyEnv {
        /// Name of the variable.
        var: String,
    },
    /// An address could not be parsed.
    #[error("invalid precompile address {value:?}: {reason}")]
    InvalidAddress {
        /// The rejected value.
        value: String,
        /// Parser error.
        reason: String,
    },
    /// A static precompile address was listed twice.
    #[error("precompile address {0} listed more than once")]
    DuplicateAddress(Address),
    /// A token pair denomination was listed twice.
    #[error("native ERC-20 denom {0:?} listed more than once")]
    DuplicateToken(String),
    /// The bech32 prefix is not a valid human readable part.
    #[error(transparent)]
    InvalidPrefix(#[from] CodecError),
}
