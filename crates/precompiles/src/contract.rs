//! The precompiled contract abstraction and helpers shared by the native families.

use crate::{context::ExecutionContext, error::PrecompileError};
use alloy_primitives::{Address, Bytes, Log, LogData, U256};
use alloy_sol_types::SolInterface;
use std::fmt;

/// Result of a precompile invocation.
pub type PrecompileResult = Result<PrecompileOutput, PrecompileError>;

/// Length of a Solidity method selector.
pub const SELECTOR_LEN: usize = 4;

/// Per-call inputs taken from the calling frame.
#[derive(Debug, Clone, Copy)]
pub struct CallInput<'a> {
    /// Raw call data, selector included.
    pub data: &'a [u8],
    /// Immediate caller of the precompile.
    pub caller: Address,
    /// Value transferred with the call.
    pub value: U256,
    /// Gas available to the call.
    pub gas: u64,
}

impl<'a> CallInput<'a> {
    /// Creates an input with zero value.
    pub const fn new(data: &'a [u8], caller: Address, gas: u64) -> Self {
        Self {
            data,
            caller,
            value: U256::ZERO,
            gas,
        }
    }
}

/// Successful precompile output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// ABI encoded return data.
    pub bytes: Bytes,
    /// Logs emitted by the call.
    pub logs: Vec<Log>,
}

impl PrecompileOutput {
    /// Output carrying only return data.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            logs: Vec::new(),
        }
    }

    /// Appends a log emitted by `address`.
    pub fn with_log(mut self, address: Address, data: LogData) -> Self {
        self.logs.push(Log { address, data });
        self
    }
}

/// A native capability exposed at a fixed address.
///
/// Implementations are stateless; mutable state lives in the bound capability
/// providers. A contract is shared by every reader of the sealed registry, so
/// it must be `Send + Sync`.
pub trait PrecompiledContract: Send + Sync + fmt::Debug {
    /// Address the contract is bound to. Constant for the contract's lifetime.
    fn address(&self) -> Address;

    /// Short family name used in logs and configuration errors.
    fn name(&self) -> &'static str;

    /// Gas charged for `input`.
    ///
    /// Must be a pure function of `input`: callers use it to reject underfunded
    /// calls before [`run`](Self::run), and every node must agree on it.
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Executes the call.
    ///
    /// State-mutating methods must fail with [`PrecompileError::WriteProtection`]
    /// when `read_only` is set, before touching any provider.
    fn run(
        &self,
        ctx: &ExecutionContext,
        input: CallInput<'_>,
        read_only: bool,
    ) -> PrecompileResult;
}

/// KV-store gas schedule used to price selector-dispatched methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasConfig {
    /// Flat cost of a read method.
    pub read_cost_flat: u64,
    /// Cost per argument byte of a read method.
    pub read_cost_per_byte: u64,
    /// Flat cost of a write method.
    pub write_cost_flat: u64,
    /// Cost per argument byte of a write method.
    pub write_cost_per_byte: u64,
}

impl GasConfig {
    /// The Cosmos SDK KV gas schedule.
    pub const KV: Self = Self {
        read_cost_flat: 1_000,
        read_cost_per_byte: 3,
        write_cost_flat: 2_000,
        write_cost_per_byte: 30,
    };

    /// Gas for a method taking `args_len` argument bytes.
    pub const fn cost(&self, is_transaction: bool, args_len: usize) -> u64 {
        let len = args_len as u64;
        if is_transaction {
            self.write_cost_flat
                .saturating_add(self.write_cost_per_byte.saturating_mul(len))
        } else {
            self.read_cost_flat
                .saturating_add(self.read_cost_per_byte.saturating_mul(len))
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self::KV
    }
}

/// Splits call data into its selector and argument bytes.
pub fn split_selector(input: &[u8]) -> Option<([u8; SELECTOR_LEN], &[u8])> {
    if input.len() < SELECTOR_LEN {
        return None;
    }
    let (selector, args) = input.split_at(SELECTOR_LEN);
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(selector);
    Some((out, args))
}

/// Prices selector-dispatched input.
///
/// `is_transaction` maps a selector to `Some(true)` for mutating methods,
/// `Some(false)` for queries and `None` for unknown selectors. Short input and
/// unknown selectors cost nothing; the subsequent run reverts.
pub fn selector_gas(
    gas: &GasConfig,
    input: &[u8],
    is_transaction: impl FnOnce([u8; SELECTOR_LEN]) -> Option<bool>,
) -> u64 {
    let Some((selector, args)) = split_selector(input) else {
        return 0;
    };
    is_transaction(selector).map_or(0, |tx| gas.cost(tx, args.len()))
}

/// Decodes selector-dispatched call data.
///
/// Returns the decoded call and whether it names a state-mutating method.
pub fn decode_call<C: SolInterface>(
    data: &[u8],
    is_transaction: impl FnOnce([u8; SELECTOR_LEN]) -> Option<bool>,
) -> Result<(C, bool), PrecompileError> {
    let (selector, _) = split_selector(data).ok_or_else(|| {
        PrecompileError::InvalidInput(format!("call data too short: {} bytes", data.len()))
    })?;
    let is_tx = is_transaction(selector).ok_or(PrecompileError::UnknownSelector(selector))?;
    let call = C::abi_decode(data)?;
    Ok((call, is_tx))
}

/// Rejects a mutating method invoked from a static call.
pub const fn ensure_writable(read_only: bool) -> Result<(), PrecompileError> {
    if read_only {
        Err(PrecompileError::WriteProtection)
    } else {
        Ok(())
    }
}

/// Requires the acting account of a mutating method to be the caller.
pub fn ensure_caller(
    role: &str,
    account: Address,
    caller: Address,
) -> Result<(), PrecompileError> {
    if account == caller {
        Ok(())
    } else {
        tracing::warn!(target: "precompiles", role, %account, %caller, "caller mismatch");
        Err(PrecompileError::Rejected(format!(
            "{role} address {account} does not match caller {caller}"
        )))
    }
}

/// Requires a strictly positive amount.
pub fn ensure_positive(amount: U256) -> Result<(), PrecompileError> {
    if amount.is_zero() {
        Err(PrecompileError::InvalidInput(
            "amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn gas_config_prices_by_method_kind() {
        let gas = GasConfig::KV;
        assert_eq!(gas.cost(false, 0), 1_000);
        assert_eq!(gas.cost(false, 64), 1_000 + 3 * 64);
        assert_eq!(gas.cost(true, 64), 2_000 + 30 * 64);
    }

    #[test]
    fn selector_gas_ignores_short_and_unknown_input() {
        let gas = GasConfig::KV;
        assert_eq!(selector_gas(&gas, &[0x01, 0x02], |_| Some(true)), 0);
        assert_eq!(selector_gas(&gas, &[0u8; 36], |_| None), 0);
        assert_eq!(selector_gas(&gas, &[0u8; 36], |_| Some(false)), 1_000 + 3 * 32);
    }

    #[test]
    fn split_selector_separates_arguments() {
        let (selector, args) = split_selector(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(selector, [1, 2, 3, 4]);
        assert_eq!(args, &[5, 6]);
        assert!(split_selector(&[1, 2, 3]).is_none());
    }

    #[test]
    fn caller_guard_reports_mismatch() {
        let a = address!("0x00000000000000000000000000000000000000a1");
        let b = address!("0x00000000000000000000000000000000000000b1");
        assert!(ensure_caller("delegator", a, a).is_ok());
        let err = ensure_caller("delegator", a, b).unwrap_err();
        assert!(matches!(
            err,
            PrecompileError::Rejected(msg) if msg.contains("does not match caller")
        ));
    }

    #[test]
    fn write_guard() {
        assert_eq!(ensure_writable(true), Err(PrecompileError::WriteProtection));
        assert_eq!(ensure_writable(false), Ok(()));
    }
}
