//! Narrow contracts the precompiles require from the ledger's native modules.
//!
//! Providers are owned by the ledger state layer and outlive individual calls.
//! Writes are serialized by the surrounding execution pipeline; every method
//! here is synchronous.

use crate::error::CapabilityError;
use alloy_primitives::{Address, U256};

/// Result type returned by capability providers.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Balance and supply access of the bank module.
pub trait BankCapability: Send + Sync {
    /// Spendable balance of `account` in `denom`.
    fn balance(&self, account: Address, denom: &str) -> CapabilityResult<U256>;

    /// Total supply of `denom`.
    fn supply(&self, denom: &str) -> CapabilityResult<U256>;

    /// Moves `amount` of `denom` from `from` to `to`.
    fn send(&self, from: Address, to: Address, denom: &str, amount: U256)
        -> CapabilityResult<()>;
}

/// A delegation of one delegator to one validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delegation {
    /// Delegator shares in the validator.
    pub shares: U256,
    /// Token value of the shares in the bond denom.
    pub balance: U256,
}

/// Delegation management of the staking module.
///
/// Validators are identified by their bech32 operator address.
pub trait StakingCapability: Send + Sync {
    /// Denomination bonded by delegations.
    fn bond_denom(&self) -> CapabilityResult<String>;

    /// Bonds `amount` from `delegator` to `validator`.
    fn delegate(&self, delegator: Address, validator: &str, amount: U256) -> CapabilityResult<()>;

    /// Starts unbonding `amount`; returns the completion time as a unix timestamp.
    fn undelegate(&self, delegator: Address, validator: &str, amount: U256)
        -> CapabilityResult<i64>;

    /// Moves `amount` between validators; returns the completion time.
    fn redelegate(
        &self,
        delegator: Address,
        src_validator: &str,
        dst_validator: &str,
        amount: U256,
    ) -> CapabilityResult<i64>;

    /// Current delegation, if any.
    fn delegation(&self, delegator: Address, validator: &str)
        -> CapabilityResult<Option<Delegation>>;
}

/// Reward accounting of the distribution module.
pub trait DistributionCapability: Send + Sync {
    /// Sets the address rewards are paid to.
    fn set_withdraw_address(&self, delegator: Address, withdrawer: Address)
        -> CapabilityResult<()>;

    /// Address rewards are paid to; the delegator itself unless overridden.
    fn withdraw_address(&self, delegator: Address) -> CapabilityResult<Address>;

    /// Pays out accumulated rewards and returns the amount.
    fn withdraw_rewards(&self, delegator: Address, validator: &str) -> CapabilityResult<U256>;

    /// Outstanding rewards without paying them out.
    fn rewards(&self, delegator: Address, validator: &str) -> CapabilityResult<U256>;
}

/// Governance vote options, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteOption {
    /// Approve.
    Yes = 1,
    /// Count towards quorum only.
    Abstain = 2,
    /// Reject.
    No = 3,
    /// Reject and burn deposits.
    NoWithVeto = 4,
}

impl VoteOption {
    /// Parses a wire value.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Yes),
            2 => Some(Self::Abstain),
            3 => Some(Self::No),
            4 => Some(Self::NoWithVeto),
            _ => None,
        }
    }
}

/// Governance proposal lifecycle states, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    /// Collecting deposits.
    DepositPeriod = 1,
    /// Collecting votes.
    VotingPeriod = 2,
    /// Tallied and accepted.
    Passed = 3,
    /// Tallied and refused.
    Rejected = 4,
    /// Accepted but its messages failed.
    Failed = 5,
}

/// Proposal voting and deposits of the gov module.
pub trait GovCapability: Send + Sync {
    /// Casts or replaces a vote.
    fn vote(
        &self,
        voter: Address,
        proposal_id: u64,
        option: VoteOption,
        metadata: &str,
    ) -> CapabilityResult<()>;

    /// Adds `amount` of `denom` to a proposal deposit.
    fn deposit(
        &self,
        depositor: Address,
        proposal_id: u64,
        denom: &str,
        amount: U256,
    ) -> CapabilityResult<()>;

    /// Status of a proposal, `None` if it does not exist.
    fn proposal_status(&self, proposal_id: u64) -> CapabilityResult<Option<ProposalStatus>>;

    /// Vote cast by `voter`, if any.
    fn vote_of(&self, proposal_id: u64, voter: Address) -> CapabilityResult<Option<VoteOption>>;
}

/// Liveness record of a validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SigningInfo {
    /// Height at which the validator became active.
    pub start_height: i64,
    /// Offset into the missed blocks bit array.
    pub index_offset: i64,
    /// Unix timestamp until which the validator is jailed.
    pub jailed_until: i64,
    /// Whether the validator was permanently removed.
    pub tombstoned: bool,
    /// Missed blocks in the current window.
    pub missed_blocks_counter: i64,
}

/// Jailing state of the slashing module.
///
/// Validators are identified by operator address, signing infos by consensus
/// address, both in bech32.
pub trait SlashingCapability: Send + Sync {
    /// Releases a jailed validator.
    fn unjail(&self, validator: &str) -> CapabilityResult<()>;

    /// Signing info of a consensus address, if known.
    fn signing_info(&self, consensus_address: &str) -> CapabilityResult<Option<SigningInfo>>;
}

/// An outgoing ICS-20 fungible token transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source port, usually `transfer`.
    pub source_port: String,
    /// Source channel.
    pub source_channel: String,
    /// Denomination sent.
    pub denom: String,
    /// Amount sent.
    pub amount: U256,
    /// Sending account.
    pub sender: Address,
    /// Receiver on the counterparty chain.
    pub receiver: String,
    /// Revision number of the timeout height.
    pub timeout_revision_number: u64,
    /// Revision height of the timeout height.
    pub timeout_revision_height: u64,
    /// Timeout as unix nanoseconds.
    pub timeout_timestamp: u64,
    /// Free-form memo.
    pub memo: String,
}

/// Cross-chain token transfer module.
pub trait TransferCapability: Send + Sync {
    /// Returns true if `port`/`channel` is open.
    fn channel_is_open(&self, port: &str, channel: &str) -> CapabilityResult<bool>;

    /// Escrows or burns the tokens and sends the packet; returns its sequence.
    fn transfer(&self, request: &TransferRequest) -> CapabilityResult<u64>;

    /// Full denomination path behind an `ibc/{hash}` denom, if known.
    fn denom_path(&self, hash: &str) -> CapabilityResult<Option<String>>;
}

/// Opaque marker of a ledger state version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(pub usize);

/// Cache boundary over all capability providers.
///
/// The dispatch bridge opens a checkpoint before each precompile call and
/// either commits or reverts it, so a reverted call leaves no trace.
pub trait Journal: Send + Sync {
    /// Opens a new checkpoint.
    fn checkpoint(&self) -> Checkpoint;

    /// Discards every write made since `checkpoint`.
    fn revert_to(&self, checkpoint: Checkpoint);

    /// Keeps every write made since `checkpoint`.
    fn commit(&self, checkpoint: Checkpoint);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_option_wire_values() {
        assert_eq!(VoteOption::from_u8(1), Some(VoteOption::Yes));
        assert_eq!(VoteOption::from_u8(4), Some(VoteOption::NoWithVeto));
        assert_eq!(VoteOption::from_u8(0), None);
        assert_eq!(VoteOption::from_u8(5), None);
        assert_eq!(VoteOption::No as u8, 3);
    }
}
