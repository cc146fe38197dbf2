//! Distribution precompile
//!
//! Reward withdrawal and withdraw-address management. Withdraw addresses cross
//! the ABI as bech32 account strings.

use crate::{
    address::DISTRIBUTION_PRECOMPILE_ADDRESS,
    capability::DistributionCapability,
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
    interface IDistribution {
        function setWithdrawAddress(address delegatorAddress, string withdrawerAddress) external returns (bool);
        function withdrawDelegatorRewards(address delegatorAddress, string validatorAddress) external returns (uint256 amount);
        function delegationRewards(address delegatorAddress, string validatorAddress) external view returns (uint256 amount);
        function withdrawAddress(address delegatorAddress) external view returns (string withdrawerAddress);

        event SetWithdrawerAddress(address indexed caller, string withdrawerAddress);
        event WithdrawDelegatorReward(address indexed delegatorAddress, string validatorAddress, uint256 amount);
    }
}

use IDistribution::IDistributionCalls;

/// Native distribution module exposed at [`DISTRIBUTION_PRECOMPILE_ADDRESS`].
#[derive(Clone)]
pub struct DistributionPrecompile {
    distribution: Arc<dyn DistributionCapability>,
    options: CapabilityOptions,
    gas: GasConfig,
}

impl DistributionPrecompile {
    /// Binds the contract to a distribution provider.
    pub fn new(distribution: Arc<dyn DistributionCapability>, options: CapabilityOptions) -> Self {
        Self {
            distribution,
            options,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IDistribution::setWithdrawAddressCall::SELECTOR
            || selector == IDistribution::withdrawDelegatorRewardsCall::SELECTOR
        {
            Some(true)
        } else if selector == IDistribution::delegationRewardsCall::SELECTOR
            || selector == IDistribution::withdrawAddressCall::SELECTOR
        {
            Some(false)
        } else {
            None
        }
    }

    fn set_withdraw_address(
        &self,
        caller: Address,
        call: IDistribution::setWithdrawAddressCall,
    ) -> PrecompileResult {
        ensure_caller("delegator", call.delegatorAddress, caller)?;
        let withdrawer = self.options.address_codec.decode(&call.withdrawerAddress)?;

        self.distribution
            .set_withdraw_address(call.delegatorAddress, withdrawer)?;

        tracing::debug!(
            target: "precompiles::distribution",
            delegator = %call.delegatorAddress,
            %withdrawer,
            "set withdraw address"
        );

        let event = IDistribution::SetWithdrawerAddress {
            caller: call.delegatorAddress,
            withdrawerAddress: call.withdrawerAddress,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn withdraw_rewards(
        &self,
        caller: Address,
        call: IDistribution::withdrawDelegatorRewardsCall,
    ) -> PrecompileResult {
        ensure_caller("delegator", call.delegatorAddress, caller)?;
        self.options
            .validator_addr_codec
            .decode(&call.validatorAddress)?;

        let amount = self
            .distribution
            .withdraw_rewards(call.delegatorAddress, &call.validatorAddress)?;

        tracing::debug!(
            target: "precompiles::distribution",
            delegator = %call.delegatorAddress,
            validator = %call.validatorAddress,
            %amount,
            "withdraw delegator rewards"
        );

        let event = IDistribution::WithdrawDelegatorReward {
            delegatorAddress: call.delegatorAddress,
            validatorAddress: call.validatorAddress,
            amount,
        };
        Ok(PrecompileOutput::new(amount.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }
}

impl fmt::Debug for DistributionPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionPrecompile")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PrecompiledContract for DistributionPrecompile {
    fn address(&self) -> Address {
        DISTRIBUTION_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "distribution"
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
        let (call, is_tx) = decode_call::<IDistributionCalls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            IDistributionCalls::setWithdrawAddress(call) => {
                self.set_withdraw_address(input.caller, call)
            }
            IDistributionCalls::withdrawDelegatorRewards(call) => {
                self.withdraw_rewards(input.caller, call)
            }
            IDistributionCalls::delegationRewards(call) => {
                self.options
                    .validator_addr_codec
                    .decode(&call.validatorAddress)?;
                let amount = self
                    .distribution
                    .rewards(call.delegatorAddress, &call.validatorAddress)?;
                Ok(PrecompileOutput::new(amount.abi_encode()))
            }
            IDistributionCalls::withdrawAddress(call) => {
                let withdrawer = self.distribution.withdraw_address(call.delegatorAddress)?;
                let encoded = self
                    .options
                    .address_codec
                    .encode(&withdrawer)
                    .map_err(|err| PrecompileError::Fault(err.to_string()))?;
                Ok(PrecompileOutput::new(encoded.abi_encode()))
            }
        }
    }
}
