//! Error types shared by the registry, the contracts and the dispatch bridge.

use crate::codec::CodecError;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{Revert, SolError};
use thiserror::Error;

/// Configuration errors raised while composing a [`PrecompileRegistry`].
///
/// These are fatal at startup and never reach production traffic.
///
/// [`PrecompileRegistry`]: crate::registry::PrecompileRegistry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two composition steps targeted the same address.
    #[error("precompile address {address} already registered by `{existing}`, cannot register `{incoming}`")]
    AddressCollision {
        /// The contested address.
        address: Address,
        /// Family that already owns the address.
        existing: &'static str,
        /// Family that attempted the insertion.
        incoming: &'static str,
    },
    /// A family was activated but its capability provider was not supplied.
    #[error("precompile `{family}` is active but no {capability} capability was provided")]
    MissingCapability {
        /// Family that could not be built.
        family: &'static str,
        /// The absent capability.
        capability: &'static str,
    },
    /// The chain configuration activates an address no static precompile lives at.
    #[error("unknown static precompile address {0}")]
    UnknownPrecompile(Address),
    /// A family rejected its construction parameters.
    #[error("invalid `{family}` precompile parameters: {reason}")]
    InvalidFamily {
        /// Family that could not be built.
        family: &'static str,
        /// Human readable cause.
        reason: String,
    },
}

/// Whether a failed call only rolls back itself or aborts the whole transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Well-formed rejection; only the current call's effects are rolled back.
    Revert,
    /// Unexpected internal failure; aborts the encompassing transaction.
    Fault,
}

/// Errors returned by [`PrecompiledContract::run`].
///
/// [`PrecompiledContract::run`]: crate::contract::PrecompiledContract::run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrecompileError {
    /// The supplied gas does not cover [`required_gas`].
    ///
    /// [`required_gas`]: crate::contract::PrecompiledContract::required_gas
    #[error("out of gas: required {required}, available {available}")]
    OutOfGas {
        /// Gas required by the call.
        required: u64,
        /// Gas available to the call.
        available: u64,
    },
    /// A state-mutating method was invoked in a read-only (static) call.
    #[error("write protection")]
    WriteProtection,
    /// The input did not start with a selector the contract knows.
    #[error("unknown method selector 0x{}", alloy_primitives::hex::encode(.0))]
    UnknownSelector([u8; 4]),
    /// Input could not be decoded or carried an invalid argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The capability provider refused the operation on business-rule grounds.
    #[error("{0}")]
    Rejected(String),
    /// The capability provider failed unexpectedly, or the contract panicked.
    #[error("execution fault: {0}")]
    Fault(String),
}

impl PrecompileError {
    /// Classifies the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Fault(_) => ErrorKind::Fault,
            _ => ErrorKind::Revert,
        }
    }

    /// Returns `true` if only the current call should be rolled back.
    pub const fn is_revert(&self) -> bool {
        matches!(self.kind(), ErrorKind::Revert)
    }

    /// Returns `true` if the encompassing transaction must be aborted.
    pub const fn is_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::Fault)
    }

    /// Revert data handed back to the interpreter, ABI encoded as `Error(string)`
    /// so callers see an ordinary contract revert.
    pub fn revert_data(&self) -> Bytes {
        Revert::from(self.to_string()).abi_encode().into()
    }
}

/// Errors surfaced by capability providers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The ledger refused the operation (insufficient funds, unknown validator, ...).
    #[error("{0}")]
    Rejected(String),
    /// The ledger failed internally.
    #[error("internal error: {0}")]
    Internal(String),
    /// An externally imposed deadline or cancellation interrupted the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<CapabilityError> for PrecompileError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Rejected(reason) => Self::Rejected(reason),
            err @ (CapabilityError::Internal(_) | CapabilityError::Cancelled) => {
                Self::Fault(err.to_string())
            }
        }
    }
}

impl From<alloy_sol_types::Error> for PrecompileError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<CodecError> for PrecompileError {
    fn from(err: CodecError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_errors_map_to_kinds() {
        let rejected: PrecompileError = CapabilityError::Rejected("no funds".into()).into();
        assert_eq!(rejected, PrecompileError::Rejected("no funds".into()));
        assert!(rejected.is_revert());

        let internal: PrecompileError = CapabilityError::Internal("store closed".into()).into();
        assert!(internal.is_fault());

        let cancelled: PrecompileError = CapabilityError::Cancelled.into();
        assert_eq!(cancelled, PrecompileError::Fault("operation cancelled".into()));
    }

    #[test]
    fn revert_data_is_solidity_error_string() {
        let data = PrecompileError::WriteProtection.revert_data();
        assert_eq!(&data[..4], Revert::SELECTOR.as_slice());

        let decoded = Revert::abi_decode(&data).expect("decodes as Error(string)");
        assert_eq!(decoded.reason, "write protection");
    }

    #[test]
    fn unknown_selector_renders_hex() {
        let err = PrecompileError::UnknownSelector([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(err.to_string(), "unknown method selector 0xdeadbeef");
    }
}
