//! Ethereum's standard precompiles at `0x01..=0x11`, as of Prague.
//!
//! The implementations come from revm. Each address is registered as its own
//! contract so the set goes through the same collision checks as the native
//! families.

use crate::{
    context::ExecutionContext,
    contract::{CallInput, PrecompileOutput, PrecompileResult, PrecompiledContract},
    error::PrecompileError,
};
use alloy_primitives::Address;
use revm::precompile::{
    Precompile, PrecompileError as RevmPrecompileError, Precompiles as RevmPrecompiles,
};
use std::fmt;

/// Upper bound on the gas a single standard precompile call is priced at.
///
/// Pricing runs the precompile, so inputs whose cost exceeds the bound are not
/// evaluated and report `u64::MAX`.
pub const ETHEREUM_GAS_CAP: u64 = 100_000_000;

/// One of revm's standard precompiles bound to its address.
#[derive(Clone, Copy)]
pub struct EthereumPrecompile {
    address: Address,
    inner: &'static Precompile,
}

impl EthereumPrecompile {
    /// The Prague set, ordered by address.
    pub fn prague() -> Vec<Self> {
        let set = RevmPrecompiles::prague();
        let mut addresses: Vec<Address> = set.addresses().copied().collect();
        addresses.sort_unstable();
        addresses
            .into_iter()
            .filter_map(|address| set.get(&address).map(|inner| Self { address, inner }))
            .collect()
    }
}

impl fmt::Debug for EthereumPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthereumPrecompile")
            .field("address", &self.address)
            .field("name", &self.name())
            .finish()
    }
}

impl PrecompiledContract for EthereumPrecompile {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        match self.address.as_slice()[19] {
            0x01 => "ecrecover",
            0x02 => "sha256",
            0x03 => "ripemd160",
            0x04 => "identity",
            0x05 => "modexp",
            0x06 => "bn254_add",
            0x07 => "bn254_mul",
            0x08 => "bn254_pairing",
            0x09 => "blake2f",
            0x0a => "kzg_point_evaluation",
            0x0b => "bls12_g1_add",
            0x0c => "bls12_g1_msm",
            0x0d => "bls12_g2_add",
            0x0e => "bls12_g2_msm",
            0x0f => "bls12_pairing",
            0x10 => "bls12_map_fp_to_g1",
            0x11 => "bls12_map_fp2_to_g2",
            _ => "ethereum",
        }
    }

    /// Gas reported by the precompile itself. Input the precompile rejects is
    /// priced at `u64::MAX`, so a failing call consumes all of its gas.
    fn required_gas(&self, input: &[u8]) -> u64 {
        self.inner
            .execute(input, ETHEREUM_GAS_CAP)
            .map_or(u64::MAX, |output| output.gas_used)
    }

    fn run(
        &self,
        _ctx: &ExecutionContext,
        input: CallInput<'_>,
        _read_only: bool,
    ) -> PrecompileResult {
        match self.inner.execute(input.data, input.gas) {
            Ok(output) => Ok(PrecompileOutput::new(output.bytes)),
            Err(RevmPrecompileError::OutOfGas) => Err(PrecompileError::OutOfGas {
                required: self.required_gas(input.data),
                available: input.gas,
            }),
            Err(err) => Err(PrecompileError::InvalidInput(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvmConfig;
    use alloy_primitives::{address, B256};

    const IDENTITY: Address = address!("0x0000000000000000000000000000000000000004");
    const SHA256: Address = address!("0x0000000000000000000000000000000000000002");

    fn contract(address: Address) -> EthereumPrecompile {
        EthereumPrecompile::prague()
            .into_iter()
            .find(|contract| contract.address() == address)
            .expect("part of the prague set")
    }

    #[test]
    fn prague_set_covers_the_standard_range() {
        let set = EthereumPrecompile::prague();
        assert_eq!(
            set.first().map(|c| c.address()),
            Some(Address::with_last_byte(0x01))
        );
        assert!(set.iter().all(|c| c.address() <= Address::with_last_byte(0x11)));
        assert!(set.windows(2).all(|pair| pair[0].address() < pair[1].address()));
        assert!(set.iter().any(|c| c.name() == "bls12_pairing"));
    }

    #[test]
    fn identity_echoes_input() {
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());
        let identity = contract(IDENTITY);
        let input = [0xab; 40];

        // 15 base + 3 per word
        assert_eq!(identity.required_gas(&input), 15 + 3 * 2);
        let out = identity
            .run(&ctx, CallInput::new(&input, Address::ZERO, 1_000), true)
            .expect("identity succeeds");
        assert_eq!(out.bytes.as_ref(), &input);
    }

    #[test]
    fn sha256_matches_sha2() {
        use sha2::{Digest, Sha256};

        let ctx = ExecutionContext::for_simulation(EvmConfig::default());
        let out = contract(SHA256)
            .run(&ctx, CallInput::new(b"infinite", Address::ZERO, 1_000), false)
            .expect("sha256 succeeds");
        let expected = B256::from_slice(&Sha256::digest(b"infinite"));
        assert_eq!(out.bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn underfunded_call_is_out_of_gas() {
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());
        let err = contract(IDENTITY)
            .run(&ctx, CallInput::new(&[0u8; 64], Address::ZERO, 10), false)
            .unwrap_err();
        assert_eq!(
            err,
            PrecompileError::OutOfGas {
                required: 15 + 3 * 2,
                available: 10
            }
        );
    }
}
