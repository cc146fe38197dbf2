//! Bech32 precompile
//!
//! Stateless conversion between hex addresses and bech32 strings under any
//! prefix. Neither method touches the ledger, so the contract carries no
//! provider.

use crate::{
    address::BECH32_PRECOMPILE_ADDRESS,
    codec::{decode_any, encode_address},
    context::ExecutionContext,
    contract::{decode_call, CallInput, PrecompileOutput, PrecompileResult, PrecompiledContract},
    error::PrecompileError,
};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall, SolValue};

sol! {
    interface IBech32 {
        function hexToBech32(address addr, string prefix) external returns (string bech32Address);
        function bech32ToHex(string bech32Address) external returns (address addr);
    }
}

use IBech32::IBech32Calls;

/// Flat gas charged for every conversion.
pub const BECH32_BASE_GAS: u64 = 6_000;

/// Address conversion exposed at [`BECH32_PRECOMPILE_ADDRESS`].
#[derive(Debug, Clone, Copy)]
pub struct Bech32Precompile {
    base_gas: u64,
}

impl Bech32Precompile {
    /// Charges `base_gas` for every conversion.
    pub const fn new(base_gas: u64) -> Self {
        Self { base_gas }
    }
}

impl Default for Bech32Precompile {
    fn default() -> Self {
        Self::new(BECH32_BASE_GAS)
    }
}

fn known_selector(selector: [u8; 4]) -> Option<bool> {
    (selector == IBech32::hexToBech32Call::SELECTOR
        || selector == IBech32::bech32ToHexCall::SELECTOR)
        .then_some(false)
}

impl PrecompiledContract for Bech32Precompile {
    fn address(&self) -> Address {
        BECH32_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "bech32"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        self.base_gas
    }

    fn run(
        &self,
        _ctx: &ExecutionContext,
        input: CallInput<'_>,
        _read_only: bool,
    ) -> PrecompileResult {
        let (call, _) = decode_call::<IBech32Calls>(input.data, known_selector)?;

        match call {
            IBech32Calls::hexToBech32(call) => {
                let prefix = call.prefix.trim();
                if prefix.is_empty() {
                    return Err(PrecompileError::InvalidInput(
                        "empty bech32 prefix; provide an account, validator or consensus prefix"
                            .to_string(),
                    ));
                }
                let encoded = encode_address(prefix, &call.addr)?;
                Ok(PrecompileOutput::new(encoded.abi_encode()))
            }
            IBech32Calls::bech32ToHex(call) => {
                let (_, address) = decode_any(&call.bech32Address)?;
                Ok(PrecompileOutput::new(address.abi_encode()))
            }
        }
    }
}
