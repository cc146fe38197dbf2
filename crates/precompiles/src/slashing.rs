//! Slashing precompile
//!
//! Validators call `unjail` with their own operator account; the hex address is
//! rendered with the validator codec before it reaches the slashing module.
//! Signing infos are looked up by consensus address.

use crate::{
    address::SLASHING_PRECOMPILE_ADDRESS,
    capability::SlashingCapability,
    codec::CapabilityOptions,
    context::ExecutionContext,
    contract::{
        decode_call, ensure_caller, ensure_writable, selector_gas, CallInput, GasConfig,
        PrecompileOutput, PrecompileResult, PrecompiledContract, SELECTOR_LEN,
    },
    error::PrecompileError,
};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall, SolEvent, SolValue};
use std::{fmt, sync::Arc};

sol! {
    interface ISlashing {
        struct SigningInfo {
            address validatorAddress;
            int64 startHeight;
            int64 indexOffset;
            int64 jailedUntil;
            bool tombstoned;
            int64 missedBlocksCounter;
        }

        function unjail(address validatorAddress) external returns (bool);
        function getSigningInfo(address consAddress) external view returns (SigningInfo signingInfo);

        event ValidatorUnjailed(address indexed validator);
    }
}

use ISlashing::ISlashingCalls;

/// Native slashing module exposed at [`SLASHING_PRECOMPILE_ADDRESS`].
#[derive(Clone)]
pub struct SlashingPrecompile {
    slashing: Arc<dyn SlashingCapability>,
    options: CapabilityOptions,
    gas: GasConfig,
}

impl SlashingPrecompile {
    /// Binds the contract to a slashing provider.
    pub fn new(slashing: Arc<dyn SlashingCapability>, options: CapabilityOptions) -> Self {
        Self {
            slashing,
            options,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == ISlashing::unjailCall::SELECTOR {
            Some(true)
        } else if selector == ISlashing::getSigningInfoCall::SELECTOR {
            Some(false)
        } else {
            None
        }
    }

    fn unjail(&self, caller: Address, call: ISlashing::unjailCall) -> PrecompileResult {
        ensure_caller("validator", call.validatorAddress, caller)?;
        let operator = self
            .options
            .validator_addr_codec
            .encode(&call.validatorAddress)?;

        self.slashing.unjail(&operator)?;

        tracing::info!(
            target: "precompiles::slashing",
            validator = %operator,
            "validator unjailed"
        );

        let event = ISlashing::ValidatorUnjailed {
            validator: call.validatorAddress,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn signing_info(&self, call: ISlashing::getSigningInfoCall) -> PrecompileResult {
        let consensus = self
            .options
            .consensus_addr_codec
            .encode(&call.consAddress)?;
        let info = self.slashing.signing_info(&consensus)?.ok_or_else(|| {
            PrecompileError::Rejected(format!("no signing info found for {consensus}"))
        })?;

        let info = ISlashing::SigningInfo {
            validatorAddress: call.consAddress,
            startHeight: info.start_height,
            indexOffset: info.index_offset,
            jailedUntil: info.jailed_until,
            tombstoned: info.tombstoned,
            missedBlocksCounter: info.missed_blocks_counter,
        };
        Ok(PrecompileOutput::new((info,).abi_encode_params()))
    }
}

impl fmt::Debug for SlashingPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlashingPrecompile")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PrecompiledContract for SlashingPrecompile {
    fn address(&self) -> Address {
        SLASHING_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "slashing"
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
        let (call, is_tx) = decode_call::<ISlashingCalls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            ISlashingCalls::unjail(call) => self.unjail(input.caller, call),
            ISlashingCalls::getSigningInfo(call) => self.signing_info(call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::SigningInfo, context::EvmConfig, test_utils::MemoryLedger};
    use alloy_primitives::address;

    const OPERATOR: Address = address!("0x00000000000000000000000000000000000000e1");
    const CONSENSUS: Address = address!("0x00000000000000000000000000000000000000c5");

    fn setup() -> (Arc<MemoryLedger>, SlashingPrecompile, ExecutionContext) {
        let ledger = Arc::new(MemoryLedger::default());
        let precompile = SlashingPrecompile::new(ledger.clone(), CapabilityOptions::default());
        (ledger, precompile, ExecutionContext::for_simulation(EvmConfig::default()))
    }

    #[test]
    fn unjail_releases_own_validator() {
        let (ledger, precompile, ctx) = setup();
        let valoper = CapabilityOptions::default()
            .validator_addr_codec
            .encode(&OPERATOR)
            .expect("encode");
        ledger.add_validator(&valoper);
        ledger.jail(&valoper);

        let data = ISlashing::unjailCall {
            validatorAddress: OPERATOR,
        }
        .abi_encode();
        let out = precompile
            .run(&ctx, CallInput::new(&data, OPERATOR, 100_000), false)
            .expect("unjail succeeds");
        assert_eq!(out.logs.len(), 1);
        assert!(!ledger.is_jailed(&valoper));
    }

    #[test]
    fn unjail_of_other_validator_is_rejected() {
        let (_, precompile, ctx) = setup();
        let data = ISlashing::unjailCall {
            validatorAddress: OPERATOR,
        }
        .abi_encode();

        let err = precompile
            .run(&ctx, CallInput::new(&data, CONSENSUS, 100_000), false)
            .unwrap_err();
        assert!(matches!(err, PrecompileError::Rejected(_)));
    }

    #[test]
    fn signing_info_is_looked_up_by_consensus_address() {
        let (ledger, precompile, ctx) = setup();
        let valcons = CapabilityOptions::default()
            .consensus_addr_codec
            .encode(&CONSENSUS)
            .expect("encode");
        ledger.set_signing_info(
            &valcons,
            SigningInfo {
                start_height: 10,
                missed_blocks_counter: 3,
                ..Default::default()
            },
        );

        let data = ISlashing::getSigningInfoCall {
            consAddress: CONSENSUS,
        }
        .abi_encode();
        let out = precompile
            .run(&ctx, CallInput::new(&data, CONSENSUS, 100_000), true)
            .expect("query succeeds");
        let info =
            ISlashing::getSigningInfoCall::abi_decode_returns(&out.bytes).expect("decode returns");
        assert_eq!(info.validatorAddress, CONSENSUS);
        assert_eq!(info.startHeight, 10);
        assert_eq!(info.missedBlocksCounter, 3);
        assert!(!info.tombstoned);
    }
}
