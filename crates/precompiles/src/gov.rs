//! Governance precompile

use crate::{
    address::GOV_PRECOMPILE_ADDRESS,
    capability::{BankCapability, GovCapability, VoteOption},
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
    interface IGov {
        function vote(address voter, uint64 proposalId, uint8 option, string metadata) external returns (bool);
        function deposit(address depositor, uint64 proposalId, uint256 amount) external returns (bool);
        function getProposalStatus(uint64 proposalId) external view returns (uint8);
        function getVote(uint64 proposalId, address voter) external view returns (uint8);

        event Vote(address indexed voter, uint64 proposalId, uint8 option);
        event Deposit(address indexed depositor, uint64 proposalId, uint256 amount);
    }
}

use IGov::IGovCalls;

/// Native governance module exposed at [`GOV_PRECOMPILE_ADDRESS`].
///
/// Deposits are made in the EVM denomination of the call context.
#[derive(Clone)]
pub struct GovPrecompile {
    gov: Arc<dyn GovCapability>,
    bank: Arc<dyn BankCapability>,
    gas: GasConfig,
}

impl GovPrecompile {
    /// Binds the contract to gov and bank providers.
    pub fn new(gov: Arc<dyn GovCapability>, bank: Arc<dyn BankCapability>) -> Self {
        Self {
            gov,
            bank,
            gas: GasConfig::KV,
        }
    }

    fn is_transaction(selector: [u8; SELECTOR_LEN]) -> Option<bool> {
        if selector == IGov::voteCall::SELECTOR || selector == IGov::depositCall::SELECTOR {
            Some(true)
        } else if selector == IGov::getProposalStatusCall::SELECTOR
            || selector == IGov::getVoteCall::SELECTOR
        {
            Some(false)
        } else {
            None
        }
    }

    fn vote(&self, caller: Address, call: IGov::voteCall) -> PrecompileResult {
        ensure_caller("voter", call.voter, caller)?;
        let option = VoteOption::from_u8(call.option).ok_or_else(|| {
            PrecompileError::InvalidInput(format!("invalid vote option {}", call.option))
        })?;

        self.gov
            .vote(call.voter, call.proposalId, option, &call.metadata)?;

        tracing::debug!(
            target: "precompiles::gov",
            voter = %call.voter,
            proposal_id = call.proposalId,
            ?option,
            "vote"
        );

        let event = IGov::Vote {
            voter: call.voter,
            proposalId: call.proposalId,
            option: call.option,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }

    fn deposit(
        &self,
        ctx: &ExecutionContext,
        caller: Address,
        call: IGov::depositCall,
    ) -> PrecompileResult {
        ensure_caller("depositor", call.depositor, caller)?;
        ensure_positive(call.amount)?;

        let denom = ctx.params().evm_denom.as_str();
        let balance = self.bank.balance(call.depositor, denom)?;
        if balance < call.amount {
            return Err(PrecompileError::Rejected(format!(
                "insufficient balance to deposit: {balance}{denom} is smaller than {}{denom}",
                call.amount
            )));
        }

        self.gov
            .deposit(call.depositor, call.proposalId, denom, call.amount)?;

        tracing::debug!(
            target: "precompiles::gov",
            depositor = %call.depositor,
            proposal_id = call.proposalId,
            amount = %call.amount,
            "deposit"
        );

        let event = IGov::Deposit {
            depositor: call.depositor,
            proposalId: call.proposalId,
            amount: call.amount,
        };
        Ok(PrecompileOutput::new(true.abi_encode())
            .with_log(self.address(), event.encode_log_data()))
    }
}

impl fmt::Debug for GovPrecompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovPrecompile").finish_non_exhaustive()
    }
}

impl PrecompiledContract for GovPrecompile {
    fn address(&self) -> Address {
        GOV_PRECOMPILE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "gov"
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
        let (call, is_tx) = decode_call::<IGovCalls>(input.data, Self::is_transaction)?;
        if is_tx {
            ensure_writable(read_only)?;
        }

        match call {
            IGovCalls::vote(call) => self.vote(input.caller, call),
            IGovCalls::deposit(call) => self.deposit(ctx, input.caller, call),
            IGovCalls::getProposalStatus(call) => {
                let status = self
                    .gov
                    .proposal_status(call.proposalId)?
                    .ok_or_else(|| {
                        PrecompileError::Rejected(format!("proposal {} not found", call.proposalId))
                    })?;
                Ok(PrecompileOutput::new(IGov::getProposalStatusCall::abi_encode_returns(
                    &(status as u8),
                )))
            }
            IGovCalls::getVote(call) => {
                // 0 is the unspecified option: no vote cast.
                let option = self
                    .gov
                    .vote_of(call.proposalId, call.voter)?
                    .map_or(0u8, |option| option as u8);
                Ok(PrecompileOutput::new(IGov::getVoteCall::abi_encode_returns(&option)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::ProposalStatus, context::EvmConfig, test_utils::MemoryLedger};
    use alloy_primitives::{address, U256};

    const VOTER: Address = address!("0x00000000000000000000000000000000000000c1");

    fn setup() -> (Arc<MemoryLedger>, GovPrecompile, ExecutionContext) {
        let ledger = Arc::new(MemoryLedger::default());
        ledger.set_balance(VOTER, "drop", U256::from(500));
        ledger.add_proposal(7, ProposalStatus::VotingPeriod);
        let gov = GovPrecompile::new(ledger.clone(), ledger.clone());
        (ledger, gov, ExecutionContext::for_simulation(EvmConfig::default()))
    }

    #[test]
    fn vote_is_recorded_and_queryable() {
        let (_, gov, ctx) = setup();
        let data = IGov::voteCall {
            voter: VOTER,
            proposalId: 7,
            option: VoteOption::NoWithVeto as u8,
            metadata: String::new(),
        }
        .abi_encode();
        gov.run(&ctx, CallInput::new(&data, VOTER, 100_000), false)
            .expect("vote succeeds");

        let query = IGov::getVoteCall {
            proposalId: 7,
            voter: VOTER,
        }
        .abi_encode();
        let out = gov
            .run(&ctx, CallInput::new(&query, VOTER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(
            IGov::getVoteCall::abi_decode_returns(&out.bytes).expect("decode result"),
            VoteOption::NoWithVeto as u8
        );
    }

    #[test]
    fn vote_rejects_unknown_option() {
        let (_, gov, ctx) = setup();
        let data = IGov::voteCall {
            voter: VOTER,
            proposalId: 7,
            option: 9,
            metadata: String::new(),
        }
        .abi_encode();

        let err = gov
            .run(&ctx, CallInput::new(&data, VOTER, 100_000), false)
            .unwrap_err();
        assert_eq!(err, PrecompileError::InvalidInput("invalid vote option 9".into()));
    }

    #[test]
    fn deposit_checks_balance() {
        let (ledger, gov, ctx) = setup();
        let data = IGov::depositCall {
            depositor: VOTER,
            proposalId: 7,
            amount: U256::from(501),
        }
        .abi_encode();

        let err = gov
            .run(&ctx, CallInput::new(&data, VOTER, 100_000), false)
            .unwrap_err();
        assert!(matches!(
            err,
            PrecompileError::Rejected(ref msg) if msg.contains("insufficient balance")
        ));
        assert_eq!(ledger.balance_of(VOTER, "drop"), U256::from(500));
    }

    #[test]
    fn proposal_status_of_unknown_proposal_reverts() {
        let (_, gov, ctx) = setup();
        let data = IGov::getProposalStatusCall { proposalId: 8 }.abi_encode();

        let err = gov
            .run(&ctx, CallInput::new(&data, VOTER, 100_000), true)
            .unwrap_err();
        assert!(err.is_revert());

        let data = IGov::getProposalStatusCall { proposalId: 7 }.abi_encode();
        let out = gov
            .run(&ctx, CallInput::new(&data, VOTER, 100_000), true)
            .expect("query succeeds");
        assert_eq!(
            IGov::getProposalStatusCall::abi_decode_returns(&out.bytes).expect("decode result"),
            ProposalStatus::VotingPeriod as u8
        );
    }
}
