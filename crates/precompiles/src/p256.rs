//! secp256r1 signature verification (RIP-7212)
//!
//! Input is exactly 160 bytes: `hash ‖ r ‖ s ‖ x ‖ y`, each 32 bytes. A valid
//! signature returns the 32-byte word `1`; anything else, malformed input
//! included, returns empty output without reverting.

use crate::{
    address::P256_PRECOMPILE_ADDRESS,
    context::ExecutionContext,
    contract::{CallInput, PrecompileOutput, PrecompileResult, PrecompiledContract},
};
use ::p256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};
use alloy_primitives::{Address, Bytes, B256};

/// Gas charged per verification.
pub const P256_VERIFY_GAS: u64 = 3_450;

/// Length of a well-formed input.
pub const P256_INPUT_LEN: usize = 160;

/// P-256 verification exposed at [`P256_PRECOMPILE_ADDRESS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct P256Precompile;

impl P256Precompile {
    /// Verifies `input`, returning false for malformed input.
    pub fn verify(input: &[u8]) -> bool {
        if input.len() != P256_INPUT_LEN {
            return false;
        }
        let (hash, rest) = input.split_at(32);
        let (signature, public_key) = rest.split_at(64);

        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let mut encoded = [0u8; 65];
        encoded[0] = 0x04;
        encoded[1..].copy_from_slice(public_key);
        let Ok(key) = VerifyingKey::from_sec1_bytes(&encoded) else {
            return false;
        };

        key.verify_prehash(hash, &signature).is_ok()
    }
}

impl PrecompiledContract for P256Precompile {
    fn address(&self) -> Address {
        P256_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "p256"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        P256_VERIFY_GAS
    }

    fn run(
        &self,
        _ctx: &ExecutionContext,
        input: CallInput<'_>,
        _read_only: bool,
    ) -> PrecompileResult {
        if Self::verify(input.data) {
            Ok(PrecompileOutput::new(Bytes::copy_from_slice(
                B256::with_last_byte(1).as_slice(),
            )))
        } else {
            Ok(PrecompileOutput::new(Bytes::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvmConfig;
    use ::p256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey};

    fn signed_input() -> Vec<u8> {
        let key = SigningKey::from_slice(&[0x42; 32]).expect("valid scalar");
        let hash = [0x11u8; 32];
        let signature: Signature = key.sign_prehash(&hash).expect("sign");
        let point = key.verifying_key().to_encoded_point(false);

        let mut input = Vec::with_capacity(P256_INPUT_LEN);
        input.extend_from_slice(&hash);
        input.extend_from_slice(&signature.to_bytes());
        input.extend_from_slice(&point.as_bytes()[1..]);
        input
    }

    #[test]
    fn valid_signature_returns_one() {
        let input = signed_input();
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());

        let out = P256Precompile
            .run(&ctx, CallInput::new(&input, Address::ZERO, 10_000), true)
            .expect("never reverts");
        assert_eq!(out.bytes.as_ref(), B256::with_last_byte(1).as_slice());
    }

    #[test]
    fn tampered_hash_returns_empty() {
        let mut input = signed_input();
        input[0] ^= 0xff;
        assert!(!P256Precompile::verify(&input));
    }

    #[test]
    fn wrong_length_returns_empty() {
        let input = signed_input();
        assert!(!P256Precompile::verify(&input[..159]));
        assert!(!P256Precompile::verify(&[]));
        assert_eq!(P256Precompile.required_gas(&input), P256_VERIFY_GAS);
    }
}
