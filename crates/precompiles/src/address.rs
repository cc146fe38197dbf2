//! Well-known precompile addresses and deterministic module address derivation.

use alloy_primitives::{address, Address};
use sha2::{Digest, Sha256};

/// secp256r1 (P-256) signature verification, RIP-7212.
pub const P256_PRECOMPILE_ADDRESS: Address = address!("0x0000000000000000000000000000000000000100");
/// Hex <-> bech32 address conversion.
pub const BECH32_PRECOMPILE_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000000400");
/// Staking module.
pub const STAKING_PRECOMPILE_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000000800");
/// Distribution module.
pub const DISTRIBUTION_PRECOMPILE_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000000801");
/// ICS-20 cross-chain token transfer.
pub const ICS20_PRECOMPILE_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000000802");
/// Bank module.
pub const BANK_PRECOMPILE_ADDRESS: Address = address!("0x0000000000000000000000000000000000000804");
/// Governance module.
pub const GOV_PRECOMPILE_ADDRESS: Address = address!("0x0000000000000000000000000000000000000805");
/// Slashing module.
pub const SLASHING_PRECOMPILE_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000000806");

/// Every static precompile address, in ascending order.
pub const STATIC_PRECOMPILE_ADDRESSES: [Address; 8] = [
    P256_PRECOMPILE_ADDRESS,
    BECH32_PRECOMPILE_ADDRESS,
    STAKING_PRECOMPILE_ADDRESS,
    DISTRIBUTION_PRECOMPILE_ADDRESS,
    ICS20_PRECOMPILE_ADDRESS,
    BANK_PRECOMPILE_ADDRESS,
    GOV_PRECOMPILE_ADDRESS,
    SLASHING_PRECOMPILE_ADDRESS,
];

/// Derives the address of a module account from its name.
///
/// The address is the first 20 bytes of `sha256(name)`. Every derived address on
/// the chain depends on this scheme, so changing it is a breaking protocol change.
pub fn derive_module_address(name: &str) -> Address {
    let digest = Sha256::digest(name.as_bytes());
    Address::from_slice(&digest[..20])
}

/// Renders an address as an EIP-55 checksummed hex string.
pub fn to_checksum_hex(address: &Address) -> String {
    address.to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn derivation_matches_sha256_prefix() {
        let expected = Sha256::digest(b"gov");
        let derived = derive_module_address("gov");
        assert_eq!(derived.as_slice(), &expected[..20]);
    }

    #[test]
    fn derivation_is_stable_and_distinct() {
        assert_eq!(
            derive_module_address("distribution"),
            derive_module_address("distribution")
        );
        assert_ne!(
            derive_module_address("distribution"),
            derive_module_address("bonded_tokens_pool")
        );
    }

    #[test]
    fn static_addresses_are_pairwise_distinct() {
        let unique: HashSet<_> = STATIC_PRECOMPILE_ADDRESSES.iter().collect();
        assert_eq!(unique.len(), STATIC_PRECOMPILE_ADDRESSES.len());
    }

    #[test]
    fn checksum_hex_round_trips() {
        let rendered = to_checksum_hex(&BANK_PRECOMPILE_ADDRESS);
        assert_eq!(rendered, "0x0000000000000000000000000000000000000804");
        assert_eq!(rendered.parse::<Address>().unwrap(), BANK_PRECOMPILE_ADDRESS);
    }
}
