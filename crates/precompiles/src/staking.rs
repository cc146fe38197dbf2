//! Staking precompile
//!
//! Delegation management on behalf of the calling account. Validators are
//! addressed by their bech32 operator address and checked against the
//! configured validator codec before the staking module sees them.

use crate::{
    address::STAKING_PRECOMPILE_ADDRESS,
    capability::{BankCapability, StakingCapability},
    codec::CapabilityOptions,
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
    interface IStaking {
        struct Coin {
            string denom;
            uint256 amount;
        }

        function delegate(address delegatorAddress, string validatorAddress, uint256 amount) external returns (bool);
        function undelegate(address delegatorAddress, string validatorAddress, uint256 amount) external returns (int64 completionTime);
        function redelegate(address delegatorAddress, string validatorSrcAddress, string validatorDstAddress, uint256 amount) external returns (int64 completionTime);
        function delegation(address delegatorAddress, string validatorAddress) external view returns (uint256 shares, Coin balance);

        event Delegate(address indexed delegatorAddress, string validatorAddress, uint256 amount);
        event Unbond(address indexed delegatorAddress, string validatorAddress, uint256 amount, int64 completionTime);
        event Redelegate(address indexed delegatorAddress, string validatorSrcAddress, string validatorDstAddress, uint256 amount, int64 completionTime);
    }
}

use IStaking::IStakingCalls;

/// Native staking module exposed at [`STAKING_PRECOMPILE_ADDRESS`].
#[derive(Clone)]
pub struct StakingPrecompile {
    staking: Arc<dyn StakingCapability>,
    bank: Arc<dyn BankCapability>,
    options: CapabilityOptions,
    gas: GasConfig,
}

impl StakingPrecompile {
    /// Binds the precompile to its providers.
    ///
    /// The bank provider is consulted for the spendable balance before a
    /// delegation is forwarded.
    pub fn new(
        staking: Arc<dyn StakingCapability>,
        bank: Arc<dyn BankCapability>,
        options: CapabilityOptions,
    ) -> Self {
        Self {
            staking,
            bank,
            options,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IStaking::delegateCall::SELECTOR
            || selector == IStaking::undelegateCall::SELECTOR
            || selector == IStaking::redelegateCall::SELECTOR
        {
            Some(true)
        } else if selector == IStaking::delegationCall::SELECTOR {
            Some(false)
        } else {
            None
        }
    }

    fn check_validator(&self, validator: &str) -> Result<(), PrecompileError> {
        self.options.validator_addr_codec.decode(validator)?;
        Ok(())
    }

    fn delegate(&self, caller: Address, call: IStaking::delegateCall) -> PrecompileResult {
        ensure_caller("delegator", call.delegatorAddress, caller)?;
        ensure_positive(call.amount)?;
        self.check_validator(&call.validatorAddress)?;

        let denom = self.staking.bond_denom()?;
        let balance = self.bank.balance(call.delegatorAddress, &denom)?;
        if balance < call.amount {
            return Err(PrecompileError::Rejected(format!(
                "insufficient balance to delegate: {balance}{denom} is smaller than {}{denom}",
                call.amount
            )));
        }

        self.staking
            .delegate(call.delegatorAddress, &call.validatorAddress, call.amount)?;

        tracing::debug!(
            target: "precompiles::staking",
            delegator = %call.delegatorAddress,
            validator = %call.validatorAddress,
            amount = %call.amount,
            "delegate"
        );

        let event = IStaking::Delegate {
            delegatorAddress: call.delegatorAddress,
            validatorAddress: call.validatorAddress,
            amount: call.amount,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn undelegate(&self, caller: Address, call: IStaking::undelegateCall) -> PrecompileResult {
        ensure_caller("delegator", call.delegatorAddress, caller)?;
        ensure_positive(call.amount)?;
        self.check_validator(&call.validatorAddress)?;

        let completion_time =
            self.staking
                .undelegate(call.delegatorAddress, &call.validatorAddress, call.amount)?;

        tracing::debug!(
            target: "precompiles::staking",
            delegator = %call.delegatorAddress,
            validator = %call.validatorAddress,
            amount = %call.amount,
            completion_time,
            "undelegate"
        );

        let event = IStaking::Unbond {
            delegatorAddress: call.delegatorAddress,
            validatorAddress: call.validatorAddress,
            amount: call.amount,
            completionTime: completion_time,
        };
        Ok(PrecompileOutput::new(completion_time.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn redelegate(&self, caller: Address, call: IStaking::redelegateCall) -> PrecompileResult {
        ensure_caller("delegator", call.delegatorAddress, caller)?;
        ensure_positive(call.amount)?;
        self.check_validator(&call.validatorSrcAddress)?;
        self.check_validator(&call.validatorDstAddress)?;
        if call.validatorSrcAddress == call.validatorDstAddress {
            return Err(PrecompileError::InvalidInput(
                "cannot redelegate to the same validator".to_string(),
            ));
        }

        let completion_time = self.staking.redelegate(
            call.delegatorAddress,
            &call.validatorSrcAddress,
            &call.validatorDstAddress,
            call.amount,
        )?;

        tracing::debug!(
            target: "precompiles::staking",
            delegator = %call.delegatorAddress,
            src = %call.validatorSrcAddress,
            dst = %call.validatorDstAddress,
            amount = %call.amount,
            completion_time,
            "redelegate"
        );

        let event = IStaking::Redelegate {
            delegatorAddress: call.delegatorAddress,
            validatorSrcAddress: call.validatorSrcAddress,
            validatorDstAddress: call.validatorDstAddress,
            amount: call.amount,
            completionTime: completion_time,
        };
        Ok(PrecompileOutput::new(completion_time.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn delegation(&self, call: IStaking::delegationCall) -> PrecompileResult {
        self.check_validator(&call.validatorAddress)?;

        let denom = self.staking.bond_denom()?;
        let delegation = self
            .staking
            .delegation(call.delegatorAddress, &call.validatorAddress)?
            .unwrap_or_default();
        let balance = IStaking::Coin {
            denom,
            amount: delegation.balance,
        };
        Ok(PrecompileOutput::new(
            (delegation.shares, balance).abi_encode_params(),
        ))
    }
}

impl fmt::Debug for StakingPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingPrecompile")
            .field("options", &self.options)
            .field("gas", &self.gas)
            .finish_non_exhaustive()
    }
}

impl PrecompiledContract for StakingPrecompile {
    fn address(&self) -> Address {
        STAKING_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "staking"
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
        let (call, is_tx) = decode_call::<IStakingCalls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            IStakingCalls::delegate(call) => self.delegate(input.caller, call),
            IStakingCalls::undelegate(call) => self.undelegate(input.caller, call),
            IStakingCalls::redelegate(call) => self.redelegate(input.caller, call),
            IStakingCalls::delegation(call) => self.delegation(call),
        }
    }
}
