//! ICS-20 precompile
//!
//! Sends fungible tokens over an open IBC channel and resolves `ibc/{hash}`
//! denominations back to their trace path.

use crate::{
    address::ICS20_PRECOMPILE_ADDRESS,
    capability::{BankCapability, TransferCapability, TransferRequest},
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
    interface IICS20 {
        struct Height {
            uint64 revisionNumber;
            uint64 revisionHeight;
        }

        function transfer(
            string sourcePort,
            string sourceChannel,
            string denom,
            uint256 amount,
            address sender,
            string receiver,
            Height timeoutHeight,
            uint64 timeoutTimestamp,
            string memo
        ) external returns (uint64 nextSequence);
        function denom(string hash) external view returns (string path);

        event IBCTransfer(
            address indexed sender,
            string receiver,
            string sourcePort,
            string sourceChannel,
            string denom,
            uint256 amount,
            string memo
        );
    }
}

use IICS20::IICS20Calls;

const IBC_DENOM_PREFIX: &str = "ibc/";

/// Cross-chain token transfer exposed at [`ICS20_PRECOMPILE_ADDRESS`].
#[derive(Clone)]
pub struct Ics20Precompile {
    transfer: Arc<dyn TransferCapability>,
    bank: Arc<dyn BankCapability>,
    gas: GasConfig,
}

impl Ics20Precompile {
    /// Binds the contract to transfer and bank providers.
    pub fn new(transfer: Arc<dyn TransferCapability>, bank: Arc<dyn BankCapability>) -> Self {
        Self {
            transfer,
            bank,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IICS20::transferCall::SELECTOR {
            Some(true)
        } else if selector == IICS20::denomCall::SELECTOR {
            Some(false)
        } else {
            None
        }
    }

    fn send(&self, caller: Address, call: IICS20::transferCall) -> PrecompileResult {
        ensure_caller("sender", call.sender, caller)?;
        ensure_positive(call.amount)?;
        if call.receiver.is_empty() {
            return Err(PrecompileError::InvalidInput(
                "receiver cannot be empty".to_string(),
            ));
        }
        if call.timeoutHeight.revisionHeight == 0 && call.timeoutTimestamp == 0 {
            return Err(PrecompileError::InvalidInput(
                "timeout height and timeout timestamp cannot both be zero".to_string(),
            ));
        }
        if !self
            .transfer
            .channel_is_open(&call.sourcePort, &call.sourceChannel)?
        {
            return Err(PrecompileError::Rejected(format!(
                "channel {}/{} is not open",
                call.sourcePort, call.sourceChannel
            )));
        }

        let balance = self.bank.balance(call.sender, &call.denom)?;
        if balance < call.amount {
            return Err(PrecompileError::Rejected(format!(
                "insufficient balance to transfer: {balance}{denom} is smaller than {}{denom}",
                call.amount,
                denom = call.denom
            )));
        }

        let request = TransferRequest {
            source_port: call.sourcePort,
            source_channel: call.sourceChannel,
            denom: call.denom,
            amount: call.amount,
            sender: call.sender,
            receiver: call.receiver,
            timeout_revision_number: call.timeoutHeight.revisionNumber,
            timeout_revision_height: call.timeoutHeight.revisionHeight,
            timeout_timestamp: call.timeoutTimestamp,
            memo: call.memo,
        };
        let sequence = self.transfer.transfer(&request)?;

        tracing::info!(
            target: "precompiles::ics20",
            sender = %request.sender,
            receiver = %request.receiver,
            channel = %request.source_channel,
            denom = %request.denom,
            amount = %request.amount,
            sequence,
            "ibc transfer sent"
        );

        let event = IICS20::IBCTransfer {
            sender: request.sender,
            receiver: request.receiver,
            sourcePort: request.source_port,
            sourceChannel: request.source_channel,
            denom: request.denom,
            amount: request.amount,
            memo: request.memo,
        };
        Ok(PrecompileOutput::new(sequence.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn denom(&self, call: IICS20::denomCall) -> PrecompileResult {
        let hash = call.hash.strip_prefix(IBC_DENOM_PREFIX).unwrap_or(&call.hash);
        if hash.is_empty() {
            return Err(PrecompileError::InvalidInput(
                "denom hash cannot be empty".to_string(),
            ));
        }
        let path = self
            .transfer
            .denom_path(hash)?
            .ok_or_else(|| PrecompileError::Rejected(format!("denom {hash} not found")))?;
        Ok(PrecompileOutput::new(path.abi_encode()))
    }
}

impl fmt::Debug for Ics20Precompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ics20Precompile").finish_non_exhaustive()
    }
}

impl PrecompiledContract for Ics20Precompile {
    fn address(&self) -> Address {
        ICS20_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "ics20"
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
        let (call, is_tx) = decode_call::<IICS20Calls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            IICS20Calls::transfer(call) => self.send(input.caller, call),
            IICS20Calls::denom(call) => self.denom(call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::EvmConfig, test_utils::MemoryLedger};
    use alloy_primitives::{address, U256};

    const SENDER: Address = address!("0x00000000000000000000000000000000000000a1");

    fn setup() -> (Arc<MemoryLedger>, Ics20Precompile, ExecutionContext) {
        let ledger = Arc::new(MemoryLedger::default());
        ledger.set_balance(SENDER, "drop", U256::from(1_000));
        ledger.open_channel("transfer", "channel-0");
        let precompile = Ics20Precompile::new(ledger.clone(), ledger.clone());
        (ledger, precompile, ExecutionContext::for_simulation(EvmConfig::default()))
    }

    fn transfer_call(channel: &str, amount: u64) -> Vec<u8> {
        IICS20::transferCall {
            sourcePort: "transfer".to_string(),
            sourceChannel: channel.to_string(),
            denom: "drop".to_string(),
            amount: U256::from(amount),
            sender: SENDER,
            receiver: "cosmos1receiver".to_string(),
            timeoutHeight: IICS20::Height {
                revisionNumber: 1,
                revisionHeight: 100,
            },
            timeoutTimestamp: 0,
            memo: String::new(),
        }
        .abi_encode()
    }

    #[test]
    fn transfer_escrows_and_returns_sequence() {
        let (ledger, precompile, ctx) = setup();

        let out = precompile
            .run(&ctx, CallInput::new(&transfer_call("channel-0", 400), SENDER, 1_000_000), false)
            .expect("transfer succeeds");
        assert_eq!(u64::abi_decode(&out.bytes).expect("decode result"), 1);
        assert_eq!(out.logs.len(), 1);
        assert_eq!(ledger.balance_of(SENDER, "drop"), U256::from(600));
    }

    #[test]
    fn transfer_on_closed_channel_is_rejected() {
        let (ledger, precompile, ctx) = setup();

        let err = precompile
            .run(&ctx, CallInput::new(&transfer_call("channel-9", 400), SENDER, 1_000_000), false)
            .unwrap_err();
        assert!(matches!(err, PrecompileError::Rejected(ref msg) if msg.contains("not open")));
        assert_eq!(ledger.balance_of(SENDER, "drop"), U256::from(1_000));
    }

    #[test]
    fn denom_strips_ibc_prefix() {
        let (ledger, precompile, ctx) = setup();
        ledger.add_denom_trace("ABCDEF", "transfer/channel-0/uatom");

        let data = IICS20::denomCall {
            hash: "ibc/ABCDEF".to_string(),
        }
        .abi_encode();
        let out = precompile
            .run(&ctx, CallInput::new(&data, SENDER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(
            String::abi_decode(&out.bytes).expect("decode result"),
            "transfer/channel-0/uatom"
        );
    }
}
