//! Call-scoped execution context handed to every precompile invocation.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Protocol parameters of the EVM module that precompiles may consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerParams {
    /// Native denomination used as the EVM gas and value token.
    pub evm_denom: String,
    /// Additional EIPs enabled on top of the active fork.
    #[serde(default)]
    pub extra_eips: Vec<u64>,
    /// Number of historical block hashes served to `BLOCKHASH`.
    #[serde(default = "default_history_serve_window")]
    pub history_serve_window: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            evm_denom: "drop".to_string(),
            extra_eips: Vec::new(),
            history_serve_window: default_history_serve_window(),
        }
    }
}

const fn default_history_serve_window() -> u64 {
    8192
}

/// Fee market module parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeMarketParams {
    /// Disables EIP-1559 base fee accounting entirely.
    #[serde(default)]
    pub no_base_fee: bool,
    /// Bounds the amount the base fee can change between blocks.
    pub base_fee_change_denominator: u32,
    /// Bounds the maximum gas limit an EIP-1559 block may have.
    pub elasticity_multiplier: u32,
    /// Height at which the base fee calculation is enabled.
    #[serde(default)]
    pub enable_height: u64,
    /// Lower bound on the gas price accepted by validators.
    #[serde(default)]
    pub min_gas_price: U256,
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            base_fee_change_denominator: 8,
            elasticity_multiplier: 2,
            enable_height: 0,
            min_gas_price: U256::ZERO,
        }
    }
}

/// Identity of the transaction a call belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxConfig {
    /// Hash of the current transaction.
    pub hash: B256,
    /// Index of the current transaction within its block.
    pub index: u64,
}

impl TxConfig {
    /// Returns a config for a real, ordered transaction.
    pub const fn new(hash: B256, index: u64) -> Self {
        Self { hash, index }
    }

    /// Returns the zero-valued config used when there is no transaction,
    /// e.g. `eth_call` and `eth_estimateGas`.
    pub const fn empty() -> Self {
        Self {
            hash: B256::ZERO,
            index: 0,
        }
    }
}

/// Parameters needed to create an EVM for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmConfig {
    /// EVM module parameters.
    pub params: LedgerParams,
    /// Fee market parameters.
    pub fee_market_params: FeeMarketParams,
    /// Block proposer receiving priority fees.
    pub coinbase: Address,
    /// Base fee of the current block, if the fee market computes one.
    pub base_fee: Option<U256>,
    /// Records SHA3 preimages while executing.
    pub enable_preimage_recording: bool,
}

/// Whether a context belongs to a committed transaction or a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A real transaction being delivered.
    Transaction,
    /// Gas estimation or a query; no committed transaction exists.
    Simulation,
}

/// Transaction coordinates that emitted logs are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogAttribution {
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Index of the emitting transaction.
    pub tx_index: u64,
}

/// Immutable snapshot of call-scoped facts.
///
/// Created once before the interpreter runs, read by every precompile invocation
/// of the call, and dropped on return. It holds no ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    tx: TxConfig,
    mode: ExecutionMode,
    config: EvmConfig,
}

impl ExecutionContext {
    /// Context for a transaction with a known hash and position in its block.
    pub const fn for_transaction(hash: B256, index: u64, config: EvmConfig) -> Self {
        Self {
            tx: TxConfig::new(hash, index),
            mode: ExecutionMode::Transaction,
            config,
        }
    }

    /// Context for gas estimation and queries; hash and index are zero.
    pub const fn for_simulation(config: EvmConfig) -> Self {
        Self {
            tx: TxConfig::empty(),
            mode: ExecutionMode::Simulation,
            config,
        }
    }

    /// Hash of the current transaction, zero in simulation.
    pub const fn transaction_hash(&self) -> B256 {
        self.tx.hash
    }

    /// Index of the current transaction, zero in simulation.
    pub const fn transaction_index(&self) -> u64 {
        self.tx.index
    }

    /// Execution mode.
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns true for gas estimation and query contexts.
    pub const fn is_simulation(&self) -> bool {
        matches!(self.mode, ExecutionMode::Simulation)
    }

    /// EVM module parameters.
    pub const fn params(&self) -> &LedgerParams {
        &self.config.params
    }

    /// Fee market parameters.
    pub const fn fee_market_params(&self) -> &FeeMarketParams {
        &self.config.fee_market_params
    }

    /// Block proposer.
    pub const fn coinbase(&self) -> Address {
        self.config.coinbase
    }

    /// Base fee as supplied by the caller.
    pub const fn base_fee(&self) -> Option<U256> {
        self.config.base_fee
    }

    /// Base fee in effect, `None` when the fee market disables it.
    pub const fn effective_base_fee(&self) -> Option<U256> {
        if self.config.fee_market_params.no_base_fee {
            None
        } else {
            self.config.base_fee
        }
    }

    /// Whether SHA3 preimages are recorded.
    pub const fn enable_preimage_recording(&self) -> bool {
        self.config.enable_preimage_recording
    }

    /// Transaction coordinates for logs emitted under this context.
    ///
    /// Simulations have no committed transaction, so their zero index must not be
    /// read as "first transaction in the block".
    pub const fn log_attribution(&self) -> Option<LogAttribution> {
        match self.mode {
            ExecutionMode::Transaction => Some(LogAttribution {
                tx_hash: self.tx.hash,
                tx_index: self.tx.index,
            }),
            ExecutionMode::Simulation => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    fn config() -> EvmConfig {
        EvmConfig {
            coinbase: address!("0x00000000000000000000000000000000000000cb"),
            base_fee: Some(U256::from(1_000_000_000u64)),
            ..Default::default()
        }
    }

    #[test]
    fn transaction_context_is_attributable() {
        let hash = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
        let ctx = ExecutionContext::for_transaction(hash, 3, config());

        assert!(!ctx.is_simulation());
        assert_eq!(ctx.transaction_hash(), hash);
        assert_eq!(ctx.transaction_index(), 3);
        assert_eq!(
            ctx.log_attribution(),
            Some(LogAttribution {
                tx_hash: hash,
                tx_index: 3
            })
        );
    }

    #[test]
    fn simulation_context_is_zeroed_and_unattributed() {
        let ctx = ExecutionContext::for_simulation(config());

        assert!(ctx.is_simulation());
        assert_eq!(ctx.transaction_hash(), B256::ZERO);
        assert_eq!(ctx.transaction_index(), 0);
        assert_eq!(ctx.log_attribution(), None);
    }

    #[test]
    fn no_base_fee_hides_base_fee() {
        let mut cfg = config();
        cfg.fee_market_params.no_base_fee = true;
        let ctx = ExecutionContext::for_simulation(cfg);

        assert_eq!(ctx.base_fee(), Some(U256::from(1_000_000_000u64)));
        assert_eq!(ctx.effective_base_fee(), None);
    }

    #[test]
    fn ledger_params_deserialize_with_defaults() {
        let params: LedgerParams = serde_json::from_str(r#"{"evmDenom":"drop"}"#).unwrap();
        assert_eq!(params, LedgerParams::default());
    }
}
