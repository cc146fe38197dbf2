//! Bech32 address codecs and the cross-cutting capability options built from them.

use alloy_primitives::Address;
use ::bech32::{Bech32, Hrp};
use thiserror::Error;

/// Default account prefix of the Infinite chain.
pub const DEFAULT_ACCOUNT_PREFIX: &str = "infinite";

/// Errors produced while encoding or decoding bech32 addresses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The human readable part is not a valid bech32 prefix.
    #[error("invalid bech32 human readable prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The string is not valid bech32.
    #[error("invalid bech32 address: {0}")]
    Decode(String),
    /// Encoding failed, usually because the payload is too long.
    #[error("bech32 encoding failed: {0}")]
    Encode(String),
    /// The address carries a different prefix than the codec expects.
    #[error("expected bech32 prefix {expected:?}, got {found:?}")]
    PrefixMismatch {
        /// The codec prefix.
        expected: String,
        /// The prefix found in the input.
        found: String,
    },
    /// The decoded payload is not 20 bytes long.
    #[error("invalid address length {0}, expected 20 bytes")]
    InvalidLength(usize),
}

/// A bech32 codec bound to one human readable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bech32Codec {
    hrp: Hrp,
}

impl Bech32Codec {
    /// Creates a codec for the given prefix.
    pub fn new(prefix: &str) -> Result<Self, CodecError> {
        let hrp = parse_prefix(prefix)?;
        Ok(Self { hrp })
    }

    /// Returns the human readable prefix.
    pub fn prefix(&self) -> &str {
        self.hrp.as_str()
    }

    /// Encodes a 20-byte address.
    pub fn encode(&self, address: &Address) -> Result<String, CodecError> {
        encode_with(self.hrp, address.as_slice())
    }

    /// Decodes a bech32 string, requiring this codec's prefix and a 20-byte payload.
    pub fn decode(&self, encoded: &str) -> Result<Address, CodecError> {
        let (hrp, address) = decode_any(encoded)?;
        if hrp != self.hrp {
            return Err(CodecError::PrefixMismatch {
                expected: self.prefix().to_string(),
                found: hrp.as_str().to_string(),
            });
        }
        Ok(address)
    }
}

/// Encodes `address` under an arbitrary prefix.
pub fn encode_address(prefix: &str, address: &Address) -> Result<String, CodecError> {
    encode_with(parse_prefix(prefix)?, address.as_slice())
}

/// Decodes a bech32 address with any prefix, returning the prefix and the address.
pub fn decode_any(encoded: &str) -> Result<(Hrp, Address), CodecError> {
    let (hrp, payload) =
        ::bech32::decode(encoded).map_err(|err| CodecError::Decode(err.to_string()))?;
    if payload.len() != 20 {
        return Err(CodecError::InvalidLength(payload.len()));
    }
    Ok((hrp, Address::from_slice(&payload)))
}

fn parse_prefix(prefix: &str) -> Result<Hrp, CodecError> {
    Hrp::parse(prefix).map_err(|err| CodecError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: err.to_string(),
    })
}

fn encode_with(hrp: Hrp, payload: &[u8]) -> Result<String, CodecError> {
    ::bech32::encode::<Bech32>(hrp, payload).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Address codecs threaded through the composition steps that need them.
///
/// Accounts, validator operators and consensus keys use distinct prefixes
/// (`infinite`, `infinitevaloper`, `infinitevalcons` by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityOptions {
    /// Codec for account addresses.
    pub address_codec: Bech32Codec,
    /// Codec for validator operator addresses.
    pub validator_addr_codec: Bech32Codec,
    /// Codec for consensus node addresses.
    pub consensus_addr_codec: Bech32Codec,
}

impl CapabilityOptions {
    /// Builds the standard codec triple for an account prefix.
    pub fn with_prefix(prefix: &str) -> Result<Self, CodecError> {
        Ok(Self {
            address_codec: Bech32Codec::new(prefix)?,
            validator_addr_codec: Bech32Codec::new(&format!("{prefix}valoper"))?,
            consensus_addr_codec: Bech32Codec::new(&format!("{prefix}valcons"))?,
        })
    }

    /// Overrides the validator operator codec.
    pub fn with_validator_prefix(mut self, prefix: &str) -> Result<Self, CodecError> {
        self.validator_addr_codec = Bech32Codec::new(prefix)?;
        Ok(self)
    }

    /// Overrides the consensus address codec.
    pub fn with_consensus_prefix(mut self, prefix: &str) -> Result<Self, CodecError> {
        self.consensus_addr_codec = Bech32Codec::new(prefix)?;
        Ok(self)
    }
}

impl Default for CapabilityOptions {
    fn default() -> Self {
        // The default prefixes are valid HRPs; parsing cannot fail.
        Self::with_prefix(DEFAULT_ACCOUNT_PREFIX).unwrap_or_else(|err| {
            unreachable!("default bech32 prefix {DEFAULT_ACCOUNT_PREFIX:?} rejected: {err}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn round_trips_account_address() {
        let codec = Bech32Codec::new("infinite").unwrap();
        let addr = address!("0x00000000000000000000000000000000000000a1");

        let encoded = codec.encode(&addr).unwrap();
        assert!(encoded.starts_with("infinite1"));
        assert_eq!(codec.decode(&encoded).unwrap(), addr);
    }

    #[test]
    fn rejects_foreign_prefix() {
        let account = Bech32Codec::new("infinite").unwrap();
        let valoper = Bech32Codec::new("infinitevaloper").unwrap();
        let addr = address!("0x00000000000000000000000000000000000000b2");

        let encoded = valoper.encode(&addr).unwrap();
        let err = account.decode(&encoded).unwrap_err();
        assert!(matches!(err, CodecError::PrefixMismatch { .. }));
    }

    #[test]
    fn rejects_invalid_prefix() {
        let err = Bech32Codec::new("").unwrap_err();
        assert!(matches!(err, CodecError::InvalidPrefix { .. }));
    }

    #[test]
    fn default_options_use_infinite_prefixes() {
        let options = CapabilityOptions::default();
        assert_eq!(options.address_codec.prefix(), "infinite");
        assert_eq!(options.validator_addr_codec.prefix(), "infinitevaloper");
        assert_eq!(options.consensus_addr_codec.prefix(), "infinitevalcons");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_any("not-a-bech32-string"),
            Err(CodecError::Decode(_))
        ));
    }
}
