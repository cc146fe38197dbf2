//! Bridge between the interpreter's call path and the sealed precompile set.
//!
//! For every call the interpreter asks [`NativeDispatch::call`] whether the
//! target is native. Native calls are priced, run inside a journal checkpoint,
//! and either committed or rolled back; everything else falls through to
//! bytecode execution.

use crate::{
    capability::Journal,
    context::{ExecutionContext, LogAttribution},
    contract::{CallInput, PrecompileOutput, PrecompiledContract},
    error::{ErrorKind, PrecompileError},
    registry::Precompiles,
};
use alloy_primitives::{Address, Bytes};
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

/// How the interpreter must continue a call.
#[derive(Debug)]
pub enum Dispatch {
    /// The target was native; the call is complete.
    Native(CallOutcome),
    /// The target is not a precompile; execute its bytecode.
    Bytecode,
}

/// Result of a native call as seen by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Gas charged to the caller.
    pub gas_used: u64,
    /// Output on success, the error otherwise.
    pub result: Result<PrecompileOutput, PrecompileError>,
    /// Transaction the emitted logs belong to, `None` in simulation.
    pub attribution: Option<LogAttribution>,
}

impl CallOutcome {
    /// Whether the call returned without an error.
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Error classification, `None` on success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(PrecompileError::kind)
    }

    /// Bytes handed back to the caller: the output on success, `Error(string)`
    /// revert data on revert, nothing on a fault or when gas ran out.
    pub fn return_data(&self) -> Bytes {
        match &self.result {
            Ok(output) => output.bytes.clone(),
            Err(err) if err.is_revert() && !matches!(err, PrecompileError::OutOfGas { .. }) => {
                err.revert_data()
            }
            Err(_) => Bytes::new(),
        }
    }
}

/// Routes calls to native contracts with per-call atomicity.
#[derive(Clone)]
pub struct NativeDispatch {
    precompiles: Precompiles,
    journal: Arc<dyn Journal>,
}

impl NativeDispatch {
    /// Routes calls to `precompiles`, checkpointing `journal` around each run.
    pub fn new(precompiles: Precompiles, journal: Arc<dyn Journal>) -> Self {
        Self {
            precompiles,
            journal,
        }
    }

    /// The sealed precompile set.
    pub const fn precompiles(&self) -> &Precompiles {
        &self.precompiles
    }

    /// Returns true if `address` is served natively.
    pub fn is_native(&self, address: &Address) -> bool {
        self.precompiles.contains(address)
    }

    /// Dispatches a call to `address`.
    pub fn call(
        &self,
        ctx: &ExecutionContext,
        address: Address,
        input: CallInput<'_>,
        read_only: bool,
    ) -> Dispatch {
        match self.precompiles.get(&address) {
            Some(contract) => {
                Dispatch::Native(self.execute(contract.as_ref(), ctx, input, read_only))
            }
            None => Dispatch::Bytecode,
        }
    }

    /// Prices and runs `contract` inside a journal checkpoint.
    ///
    /// Calls that cannot pay [`required_gas`](PrecompiledContract::required_gas)
    /// never reach the contract. A panic inside the contract is caught and
    /// reported as a fault.
    pub fn execute(
        &self,
        contract: &dyn PrecompiledContract,
        ctx: &ExecutionContext,
        input: CallInput<'_>,
        read_only: bool,
    ) -> CallOutcome {
        let attribution = ctx.log_attribution();
        let required = contract.required_gas(input.data);
        if required > input.gas {
            return CallOutcome {
                gas_used: input.gas,
                result: Err(PrecompileError::OutOfGas {
                    required,
                    available: input.gas,
                }),
                attribution,
            };
        }

        let checkpoint = self.journal.checkpoint();
        let result = panic::catch_unwind(AssertUnwindSafe(|| contract.run(ctx, input, read_only)))
            .unwrap_or_else(|payload| Err(PrecompileError::Fault(panic_message(payload.as_ref()))));

        let gas_used = match &result {
            Ok(_) => {
                self.journal.commit(checkpoint);
                required
            }
            Err(err) => {
                self.journal.revert_to(checkpoint);
                match err.kind() {
                    ErrorKind::Revert => {
                        tracing::debug!(
                            target: "precompiles::dispatch",
                            address = %contract.address(),
                            name = contract.name(),
                            %err,
                            "precompile reverted"
                        );
                        required
                    }
                    ErrorKind::Fault => {
                        tracing::warn!(
                            target: "precompiles::dispatch",
                            address = %contract.address(),
                            name = contract.name(),
                            %err,
                            "precompile execution fault"
                        );
                        input.gas
                    }
                }
            }
        };

        CallOutcome {
            gas_used,
            result,
            attribution,
        }
    }
}

impl fmt::Debug for NativeDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeDispatch")
            .field("precompiles", &self.precompiles.addresses())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        address::BANK_PRECOMPILE_ADDRESS,
        bank::IBank,
        context::EvmConfig,
        registry::PrecompileRegistry,
        test_utils::MemoryLedger,
    };
    use alloy_primitives::{address, b256, U256};
    use alloy_sol_types::{SolCall, SolError};

    const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");
    const BOB: Address = address!("0x00000000000000000000000000000000000000b0");

    fn dispatch(ledger: &Arc<MemoryLedger>) -> NativeDispatch {
        let precompiles = PrecompileRegistry::new()
            .with_bank(ledger.clone())
            .expect("insert bank")
            .seal();
        NativeDispatch::new(precompiles, ledger.clone())
    }

    fn transfer(amount: u64) -> Vec<u8> {
        IBank::transferCall {
            from: ALICE,
            to: BOB,
            amount: U256::from(amount),
        }
        .abi_encode()
    }

    #[test]
    fn non_native_address_falls_through() {
        let ledger = Arc::new(MemoryLedger::default());
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());

        let outcome = dispatch(&ledger).call(&ctx, BOB, CallInput::new(&[], ALICE, 0), false);
        assert!(matches!(outcome, Dispatch::Bytecode));
    }

    #[test]
    fn underfunded_call_never_runs() {
        let ledger = Arc::new(MemoryLedger::default());
        ledger.set_balance(ALICE, "drop", U256::from(10));
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());
        let data = transfer(5);

        let Dispatch::Native(outcome) = dispatch(&ledger).call(
            &ctx,
            BANK_PRECOMPILE_ADDRESS,
            CallInput::new(&data, ALICE, 100),
            false,
        ) else {
            panic!("bank is native");
        };
        assert_eq!(outcome.gas_used, 100);
        assert!(matches!(
            outcome.result,
            Err(PrecompileError::OutOfGas { available: 100, .. })
        ));
        // indistinguishable from a bytecode out-of-gas
        assert!(outcome.return_data().is_empty());
        assert_eq!(ledger.balance_of(ALICE, "drop"), U256::from(10));
        assert_eq!(ledger.checkpoint_depth(), 0);
    }

    #[test]
    fn success_commits_and_is_attributed() {
        let ledger = Arc::new(MemoryLedger::default());
        ledger.set_balance(ALICE, "drop", U256::from(10));
        let hash = b256!("0x2222222222222222222222222222222222222222222222222222222222222222");
        let ctx = ExecutionContext::for_transaction(hash, 4, EvmConfig::default());
        let data = transfer(5);

        let Dispatch::Native(outcome) = dispatch(&ledger).call(
            &ctx,
            BANK_PRECOMPILE_ADDRESS,
            CallInput::new(&data, ALICE, 1_000_000),
            false,
        ) else {
            panic!("bank is native");
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.gas_used, 2_000 + 30 * 96);
        assert_eq!(
            outcome.attribution,
            Some(LogAttribution {
                tx_hash: hash,
                tx_index: 4
            })
        );
        assert_eq!(ledger.balance_of(BOB, "drop"), U256::from(5));
        assert_eq!(ledger.checkpoint_depth(), 0);
    }

    #[test]
    fn revert_returns_solidity_error_data() {
        let ledger = Arc::new(MemoryLedger::default());
        let ctx = ExecutionContext::for_simulation(EvmConfig::default());
        let data = transfer(5);

        let Dispatch::Native(outcome) = dispatch(&ledger).call(
            &ctx,
            BANK_PRECOMPILE_ADDRESS,
            CallInput::new(&data, ALICE, 1_000_000),
            false,
        ) else {
            panic!("bank is native");
        };
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Revert));
        assert_eq!(outcome.gas_used, 2_000 + 30 * 96);
        assert_eq!(outcome.attribution, None);
        let reason = alloy_sol_types::Revert::abi_decode(&outcome.return_data())
            .expect("Error(string) payload")
            .reason;
        assert!(reason.contains("insufficient balance"));
    }

    #[test]
    fn panic_message_is_extracted() {
        assert_eq!(panic_message(&"boom"), "panic: boom");
        assert_eq!(panic_message(&String::from("bang")), "panic: bang");
        assert_eq!(panic_message(&7u8), "panic");
    }
}
