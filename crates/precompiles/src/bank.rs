//! Bank precompile
//!
//! Exposes balances and transfers of the EVM denomination held by the bank
//! module. The denomination is read from [`LedgerParams::evm_denom`] of the
//! call context, so a chain upgrade that renames it needs no new contract.
//!
//! [`LedgerParams::evm_denom`]: crate::context::LedgerParams::evm_denom

use crate::{
    address::BANK_PRECOMPILE_ADDRESS,
    capability::BankCapability,
    context::ExecutionContext,
    contract::{
        decode_call, ensure_caller, ensure_positive, ensure_writable, selector_gas, CallInput,
        GasConfig, PrecompileOutput, PrecompileResult, PrecompiledContract, SELECTOR_LEN,
    },
    error::PrecompileError,
};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall, SolEvent, SolValue};
use std::{fmt, sync::Arc};

sol! {
    interface IBank {
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function transfer(address from, address to, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 amount);
    }
}

use IBank::IBankCalls;

/// Native bank module exposed at [`BANK_PRECOMPILE_ADDRESS`].
#[derive(Clone)]
pub struct BankPrecompile {
    bank: Arc<dyn BankCapability>,
    gas: GasConfig,
}

impl BankPrecompile {
    /// Binds the precompile to a bank provider.
    pub fn new(bank: Arc<dyn BankCapability>) -> Self {
        Self {
            bank,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IBank::transferCall::SELECTOR {
            Some(true)
        } else if selector == IBank::balanceOfCall::SELECTOR
            || selector == IBank::totalSupplyCall::SELECTOR
        {
            Some(false)
        } else {
            None
        }
    }

    fn transfer(
        &self,
        ctx: &ExecutionContext,
        caller: Address,
        call: IBank::transferCall,
    ) -> PrecompileResult {
        ensure_caller("sender", call.from, caller)?;
        ensure_positive(call.amount)?;
        if call.to.is_zero() {
            return Err(PrecompileError::InvalidInput(
                "cannot transfer to the zero address".to_string(),
            ));
        }

        let denom = ctx.params().evm_denom.as_str();
        let balance = self.bank.balance(call.from, denom)?;
        if balance < call.amount {
            return Err(PrecompileError::Rejected(format!(
                "insufficient balance: {balance}{denom} is smaller than {}{denom}",
                call.amount
            )));
        }

        self.bank.send(call.from, call.to, denom, call.amount)?;

        tracing::debug!(
            target: "precompiles::bank",
            from = %call.from,
            to = %call.to,
            amount = %call.amount,
            denom,
            "transfer"
        );

        let event = IBank::Transfer {
            from: call.from,
            to: call.to,
            amount: call.amount,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }
}

impl fmt::Debug for BankPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankPrecompile")
            .field("gas", &self.gas)
            .finish_non_exhaustive()
    }
}

impl PrecompiledContract for BankPrecompile {
    fn address(&self) -> Address {
        BANK_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "bank"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        selector_gas(&self.gas, input, Self::is_transaction)
    }

    fn run(
        &self,
        ctx: &ExecutionContext,
        input: CallInput<'_>,
        read_only: bool,
    ) -> PrecompileResult {
        let (call, is_tx) = decode_call::<IBankCalls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            IBankCalls::balanceOf(call) => {
                let balance = self.bank.balance(call.account, &ctx.params().evm_denom)?;
                Ok(PrecompileOutput::new(balance.abi_encode()))
            }
            IBankCalls::totalSupply(_) => {
                let supply = self.bank.supply(&ctx.params().evm_denom)?;
                Ok(PrecompileOutput::new(supply.abi_encode()))
            }
            IBankCalls::transfer(call) => self.transfer(ctx, input.caller, call),
        }
    }
}
