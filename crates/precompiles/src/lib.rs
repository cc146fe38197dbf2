//! # Infinite Native Precompiles
//!
//! This crate exposes the chain's native modules to EVM contracts as
//! precompiled contracts at fixed addresses, and provides the registry and
//! dispatch bridge that route interpreter calls to them.
//!
//! ## Available Precompiles
//!
//! | Address | Name | Description |
//! |---------|------|-------------|
//! | `0x01..=0x11` | [`ethereum`] | Ethereum's standard precompiles as of Prague |
//! | `0x0100` | [`p256`](mod@p256) | secp256r1 signature verification (RIP-7212) |
//! | `0x0400` | [`bech32`](mod@bech32) | Hex and bech32 address conversion |
//! | `0x0800` | [`staking`] | Delegate, undelegate, redelegate |
//! | `0x0801` | [`distribution`] | Reward withdrawal and withdraw addresses |
//! | `0x0802` | [`ics20`] | Cross-chain token transfers |
//! | `0x0804` | [`bank`] | Balances and transfers of the EVM denomination |
//! | `0x0805` | [`gov`] | Proposal votes and deposits |
//! | `0x0806` | [`slashing`] | Unjailing and signing infos |
//! | derived | [`erc20`] | Native denominations as ERC-20 token pairs |
//!
//! ## Architecture
//!
//! 1. **Composition**: a [`PrecompileRegistry`] is assembled at startup from
//!    [`PrecompilesConfig`] and the ledger's capability providers, then sealed.
//! 2. **Dispatch**: [`NativeDispatch`] prices each call, opens a journal
//!    checkpoint, runs the contract and commits or reverts.
//! 3. **Context**: every call receives an immutable [`ExecutionContext`] that
//!    distinguishes real transactions from simulations.
//!
//! ## Integration
//!
//! ```ignore
//! use infinite_precompiles::{
//!     CapabilityProviders, NativeDispatch, PrecompileRegistry, PrecompilesConfig,
//! };
//!
//! let config = PrecompilesConfig::from_extras(&genesis_config_extras)?;
//! let providers = CapabilityProviders::default()
//!     .with_bank(bank)
//!     .with_staking(staking);
//! let precompiles = PrecompileRegistry::from_config(&config, &providers)?.seal();
//! let dispatch = NativeDispatch::new(precompiles, journal);
//! ```

pub mod address;
pub mod artifact;
pub mod bank;
pub mod bech32;
pub mod capability;
pub mod codec;
pub mod config;
pub mod context;
pub mod contract;
pub mod dispatch;
pub mod distribution;
pub mod erc20;
pub mod error;
pub mod ethereum;
pub mod gov;
pub mod ics20;
pub mod p256;
pub mod registry;
pub mod slashing;
pub mod staking;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::PrecompilesConfig;
pub use context::ExecutionContext;
pub use contract::{CallInput, PrecompileOutput, PrecompiledContract};
pub use dispatch::{CallOutcome, Dispatch, NativeDispatch};
pub use error::{PrecompileError, RegistryError};
pub use registry::{CapabilityProviders, PrecompileRegistry, Precompiles};
