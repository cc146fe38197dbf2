//! ERC-20 token pair precompile
//!
//! Exposes a native bank denomination through the subset of the ERC-20
//! interface that maps directly onto bank balances. Allowances are not
//! provided; contracts that need them should wrap the pair.

use crate::{
    address::derive_module_address,
    capability::BankCapability,
    context::ExecutionContext,
    contract::{
        decode_call, ensure_positive, ensure_writable, selector_gas, CallInput, GasConfig,
        PrecompileOutput, PrecompileResult, PrecompiledContract, SELECTOR_LEN,
    },
    error::PrecompileError,
};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall, SolEvent, SolValue};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

use IERC20::IERC20Calls;

/// Display metadata of a native denomination exposed as a token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Bank denomination backing the token.
    pub denom: String,
    /// ERC-20 name.
    pub name: String,
    /// ERC-20 symbol.
    pub symbol: String,
    /// ERC-20 decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

const fn default_decimals() -> u8 {
    18
}

/// Address of the token pair for `denom`.
pub fn token_pair_address(denom: &str) -> Address {
    derive_module_address(&format!("erc20|{denom}"))
}

/// A native denomination exposed at [`token_pair_address`].
#[derive(Clone)]
pub struct Erc20Precompile {
    address: Address,
    metadata: TokenMetadata,
    bank: Arc<dyn BankCapability>,
    gas: GasConfig,
}

impl Erc20Precompile {
    /// Exposes the bank denomination in `metadata` as an ERC-20 token.
    pub fn new(metadata: TokenMetadata, bank: Arc<dyn BankCapability>) -> Self {
        Self {
            address: token_pair_address(&metadata.denom),
            metadata,
            bank,
            gas: GasConfig::KV,
        }
    }

    /// Metadata the pair was built from.
    pub const fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IERC20::transferCall::SELECTOR {
            Some(true)
        } else if [
            IERC20::nameCall::SELECTOR,
            IERC20::symbolCall::SELECTOR,
            IERC20::decimalsCall::SELECTOR,
            IERC20::totalSupplyCall::SELECTOR,
            IERC20::balanceOfCall::SELECTOR,
        ]
        .contains(&selector)
        {
            Some(false)
        } else {
            None
        }
    }

    fn transfer(&self, from: Address, call: IERC20::transferCall) -> PrecompileResult {
        ensure_positive(call.value)?;
        if call.to.is_zero() {
            return Err(PrecompileError::InvalidInput(
                "cannot transfer to the zero address".to_string(),
            ));
        }

        let denom = self.metadata.denom.as_str();
        let balance = self.bank.balance(from, denom)?;
        if balance < call.value {
            return Err(PrecompileError::Rejected(format!(
                "ERC20: transfer amount exceeds balance: {balance} < {}",
                call.value
            )));
        }
        self.bank.send(from, call.to, denom, call.value)?;

        tracing::debug!(
            target: "precompiles::erc20",
            %from,
            to = %call.to,
            value = %call.value,
            denom,
            "transfer"
        );

        let event = IERC20::Transfer {
            from,
            to: call.to,
            value: call.value,
        };
        Ok(PrecompileOutput::new(true.abi_encode()).with_log(self.address, event.encode_log_data()))
    }
}

impl fmt::Debug for Erc20Precompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Erc20Precompile")
            .field("address", &self.address)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl PrecompiledContract for Erc20Precompile {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "erc20"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        selector_gas(&self.gas, input, Self::is_transaction)
    }

    fn run(
        &self,
        _ctx: &ExecutionContext,
        input: CallInput<'_>,
        read_only: bool,
    ) -> PrecompileResult {
        let (call, is_tx) = decode_call::<IERC20Calls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        let bytes = match call {
            IERC20Calls::name(_) => self.metadata.name.abi_encode(),
            IERC20Calls::symbol(_) => self.metadata.symbol.abi_encode(),
            IERC20Calls::decimals(_) => {
                IERC20::decimalsCall::abi_encode_returns(&self.metadata.decimals)
            }
            IERC20Calls::totalSupply(_) => self.bank.supply(&self.metadata.denom)?.abi_encode(),
            IERC20Calls::balanceOf(call) => self
                .bank
                .balance(call.account, &self.metadata.denom)?
                .abi_encode(),
            IERC20Calls::transfer(call) => return self.transfer(input.caller, call),
        };
        Ok(PrecompileOutput::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::EvmConfig, test_utils::MemoryLedger};
    use alloy_primitives::{address, U256};

    const HOLDER: Address = address!("0x00000000000000000000000000000000000000a1");
    const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000b0");

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            denom: "uatom".to_string(),
            name: "Cosmos Hub Atom".to_string(),
            symbol: "ATOM".to_string(),
            decimals: 6,
        }
    }

    fn setup() -> (Arc<MemoryLedger>, Erc20Precompile, ExecutionContext) {
        let ledger = Arc::new(MemoryLedger::default());
        ledger.set_balance(HOLDER, "uatom", U256::from(1_000_000));
        let token = Erc20Precompile::new(metadata(), ledger.clone());
        (ledger, token, ExecutionContext::for_simulation(EvmConfig::default()))
    }

    #[test]
    fn address_is_derived_from_denom() {
        let (_, token, _) = setup();
        assert_eq!(token.address(), derive_module_address("erc20|uatom"));
        assert_ne!(token.address(), token_pair_address("drop"));
    }

    #[test]
    fn metadata_queries() {
        let (_, token, ctx) = setup();

        let data = IERC20::symbolCall {}.abi_encode();
        let out = token
            .run(&ctx, CallInput::new(&data, HOLDER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(String::abi_decode(&out.bytes).expect("decode result"), "ATOM");

        let data = IERC20::decimalsCall {}.abi_encode();
        let out = token
            .run(&ctx, CallInput::new(&data, HOLDER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(
            IERC20::decimalsCall::abi_decode_returns(&out.bytes).expect("decode result"),
            6
        );

        let data = IERC20::totalSupplyCall {}.abi_encode();
        let out = token
            .run(&ctx, CallInput::new(&data, HOLDER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(
            U256::abi_decode(&out.bytes).expect("decode result"),
            U256::from(1_000_000)
        );
    }

    #[test]
    fn transfer_moves_the_backing_denom() {
        let (ledger, token, ctx) = setup();
        let data = IERC20::transferCall {
            to: RECIPIENT,
            value: U256::from(250),
        }
        .abi_encode();

        let out = token
            .run(&ctx, CallInput::new(&data, HOLDER, 100_000), false)
            .expect("transfer succeeds");
        assert_eq!(out.logs[0].address, token.address());
        assert_eq!(out.logs[0].data.topics()[0], IERC20::Transfer::SIGNATURE_HASH);
        assert_eq!(ledger.balance_of(RECIPIENT, "uatom"), U256::from(250));
        assert_eq!(ledger.balance_of(RECIPIENT, "drop"), U256::ZERO);
    }

    #[test]
    fn metadata_defaults_to_eighteen_decimals() {
        let parsed: TokenMetadata =
            serde_json::from_str(r#"{"denom":"drop","name":"Drop","symbol":"DROP"}"#)
                .expect("valid metadata");
        assert_eq!(parsed.decimals, 18);
    }
}
