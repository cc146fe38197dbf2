//! In-memory ledger implementing every capability and the journal.
//!
//! Intended for tests and local tooling. The ledger keeps its whole state in
//! one value and snapshots it on every checkpoint, which makes atomicity easy
//! to assert: a reverted call must leave [`MemoryLedger::snapshot`] unchanged.

use crate::{
    address::derive_module_address,
    capability::{
        BankCapability, CapabilityResult, Checkpoint, Delegation, DistributionCapability,
        GovCapability, Journal, ProposalStatus, SigningInfo, SlashingCapability,
        StakingCapability, TransferCapability, TransferRequest, VoteOption,
    },
    error::CapabilityError,
};
use alloy_primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};

/// Complete state of a [`MemoryLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    balances: BTreeMap<(Address, String), U256>,
    validators: BTreeMap<String, bool>,
    delegations: BTreeMap<(Address, String), U256>,
    withdraw_addresses: BTreeMap<Address, Address>,
    rewards: BTreeMap<(Address, String), U256>,
    proposals: BTreeMap<u64, ProposalStatus>,
    votes: BTreeMap<(u64, Address), VoteOption>,
    deposits: BTreeMap<u64, U256>,
    signing_infos: BTreeMap<String, SigningInfo>,
    channels: BTreeSet<(String, String)>,
    denom_traces: BTreeMap<String, String>,
    next_sequence: u64,
}

impl LedgerState {
    fn balance(&self, account: Address, denom: &str) -> U256 {
        self.balances
            .get(&(account, denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, account: Address, denom: &str, amount: U256) {
        let entry = self
            .balances
            .entry((account, denom.to_string()))
            .or_default();
        *entry = entry.saturating_add(amount);
    }

    fn debit(&mut self, account: Address, denom: &str, amount: U256) -> CapabilityResult<()> {
        let balance = self.balance(account, denom);
        let remaining = balance.checked_sub(amount).ok_or_else(|| {
            CapabilityError::Rejected(format!(
                "insufficient funds: {balance}{denom} is smaller than {amount}{denom}"
            ))
        })?;
        self.balances.insert((account, denom.to_string()), remaining);
        Ok(())
    }

    fn ensure_validator(&self, validator: &str) -> CapabilityResult<()> {
        if self.validators.contains_key(validator) {
            Ok(())
        } else {
            Err(CapabilityError::Rejected(format!(
                "validator {validator} does not exist"
            )))
        }
    }

    fn proposal(&self, proposal_id: u64) -> CapabilityResult<ProposalStatus> {
        self.proposals
            .get(&proposal_id)
            .copied()
            .ok_or_else(|| CapabilityError::Rejected(format!("proposal {proposal_id} not found")))
    }
}

/// Shared in-memory ledger with a snapshot journal and failure injection.
#[derive(Debug)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    checkpoints: Mutex<Vec<LedgerState>>,
    fail_next: Mutex<Option<CapabilityError>>,
    bond_denom: String,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new("drop")
    }
}

impl MemoryLedger {
    /// Completion time returned by every unbonding and redelegation.
    pub const UNBONDING_COMPLETION_TIME: i64 = 1_700_000_000;

    /// Creates an empty ledger bonding `bond_denom`.
    pub fn new(bond_denom: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            checkpoints: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            bond_denom: bond_denom.into(),
        }
    }

    /// Module account holding bonded tokens.
    pub fn bonded_pool() -> Address {
        derive_module_address("bonded_tokens_pool")
    }

    /// Module account holding IBC escrow.
    pub fn transfer_escrow() -> Address {
        derive_module_address("transfer")
    }

    /// Module account holding proposal deposits.
    pub fn gov_account() -> Address {
        derive_module_address("gov")
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Number of open checkpoints.
    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.lock().len()
    }

    /// Makes the next provider call fail with `err`.
    pub fn fail_next(&self, err: CapabilityError) {
        *self.fail_next.lock() = Some(err);
    }

    /// Overwrites the balance of `account` in `denom`.
    pub fn set_balance(&self, account: Address, denom: &str, amount: U256) {
        self.state
            .write()
            .balances
            .insert((account, denom.to_string()), amount);
    }

    /// Current balance of `account` in `denom`.
    pub fn balance_of(&self, account: Address, denom: &str) -> U256 {
        self.state.read().balance(account, denom)
    }

    /// Registers a bonded validator.
    pub fn add_validator(&self, operator: &str) {
        self.state.write().validators.insert(operator.to_string(), false);
    }

    /// Marks `operator` as jailed.
    pub fn jail(&self, operator: &str) {
        self.state.write().validators.insert(operator.to_string(), true);
    }

    /// Whether `operator` is jailed; unknown validators are not.
    pub fn is_jailed(&self, operator: &str) -> bool {
        self.state
            .read()
            .validators
            .get(operator)
            .copied()
            .unwrap_or_default()
    }

    /// Sets the rewards `delegator` can withdraw from `validator`.
    pub fn set_rewards(&self, delegator: Address, validator: &str, amount: U256) {
        self.state
            .write()
            .rewards
            .insert((delegator, validator.to_string()), amount);
    }

    /// Registers a proposal in `status`.
    pub fn add_proposal(&self, proposal_id: u64, status: ProposalStatus) {
        self.state.write().proposals.insert(proposal_id, status);
    }

    /// Total deposited on a proposal.
    pub fn deposits_of(&self, proposal_id: u64) -> U256 {
        self.state
            .read()
            .deposits
            .get(&proposal_id)
            .copied()
            .unwrap_or_default()
    }

    /// Stores the signing info returned for `consensus_address`.
    pub fn set_signing_info(&self, consensus_address: &str, info: SigningInfo) {
        self.state
            .write()
            .signing_infos
            .insert(consensus_address.to_string(), info);
    }

    /// Marks `port`/`channel` as open.
    pub fn open_channel(&self, port: &str, channel: &str) {
        self.state
            .write()
            .channels
            .insert((port.to_string(), channel.to_string()));
    }

    /// Registers an IBC denom trace for `hash`.
    pub fn add_denom_trace(&self, hash: &str, path: &str) {
        self.state
            .write()
            .denom_traces
            .insert(hash.to_string(), path.to_string());
    }

    fn check_failure(&self) -> CapabilityResult<()> {
        self.fail_next.lock().take().map_or(Ok(()), Err)
    }
}

impl BankCapability for MemoryLedger {
    fn balance(&self, account: Address, denom: &str) -> CapabilityResult<U256> {
        self.check_failure()?;
        Ok(self.state.read().balance(account, denom))
    }

    fn supply(&self, denom: &str) -> CapabilityResult<U256> {
        self.check_failure()?;
        let state = self.state.read();
        Ok(state
            .balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount)))
    }

    fn send(&self, from: Address, to: Address, denom: &str, amount: U256) -> CapabilityResult<()> {
        self.check_failure()?;
        let mut state = self.state.write();
        state.debit(from, denom, amount)?;
        state.credit(to, denom, amount);
        Ok(())
    }
}

impl StakingCapability for MemoryLedger {
    fn bond_denom(&self) -> CapabilityResult<String> {
        self.check_failure()?;
        Ok(self.bond_denom.clone())
    }

    fn delegate(&self, delegator: Address, validator: &str, amount: U256) -> CapabilityResult<()> {
        self.check_failure()?;
        let mut state = self.state.write();
        state.ensure_validator(validator)?;
        state.debit(delegator, &self.bond_denom, amount)?;
        state.credit(Self::bonded_pool(), &self.bond_denom, amount);
        let entry = state
            .delegations
            .entry((delegator, validator.to_string()))
            .or_default();
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    fn undelegate(
        &self,
        delegator: Address,
        validator: &str,
        amount: U256,
    ) -> CapabilityResult<i64> {
        self.check_failure()?;
        let mut state = self.state.write();
        state.ensure_validator(validator)?;
        let key = (delegator, validator.to_string());
        let delegated = state.delegations.get(&key).copied().unwrap_or_default();
        let remaining = delegated.checked_sub(amount).ok_or_else(|| {
            CapabilityError::Rejected(format!(
                "cannot undelegate {amount}: only {delegated} delegated"
            ))
        })?;
        state.delegations.insert(key, remaining);
        state.debit(Self::bonded_pool(), &self.bond_denom, amount)?;
        state.credit(delegator, &self.bond_denom, amount);
        Ok(Self::UNBONDING_COMPLETION_TIME)
    }

    fn redelegate(
        &self,
        delegator: Address,
        src_validator: &str,
        dst_validator: &str,
        amount: U256,
    ) -> CapabilityResult<i64> {
        self.check_failure()?;
        let mut state = self.state.write();
        state.ensure_validator(src_validator)?;
        state.ensure_validator(dst_validator)?;
        let src = (delegator, src_validator.to_string());
        let delegated = state.delegations.get(&src).copied().unwrap_or_default();
        let remaining = delegated.checked_sub(amount).ok_or_else(|| {
            CapabilityError::Rejected(format!(
                "cannot redelegate {amount}: only {delegated} delegated"
            ))
        })?;
        state.delegations.insert(src, remaining);
        let dst = state
            .delegations
            .entry((delegator, dst_validator.to_string()))
            .or_default();
        *dst = dst.saturating_add(amount);
        Ok(Self::UNBONDING_COMPLETION_TIME)
    }

    fn delegation(
        &self,
        delegator: Address,
        validator: &str,
    ) -> CapabilityResult<Option<Delegation>> {
        self.check_failure()?;
        let state = self.state.read();
        Ok(state
            .delegations
            .get(&(delegator, validator.to_string()))
            .filter(|amount| !amount.is_zero())
            .map(|amount| Delegation {
                shares: *amount,
                balance: *amount,
            }))
    }
}

impl DistributionCapability for MemoryLedger {
    fn set_withdraw_address(
        &self,
        delegator: Address,
        withdrawer: Address,
    ) -> CapabilityResult<()> {
        self.check_failure()?;
        self.state
            .write()
            .withdraw_addresses
            .insert(delegator, withdrawer);
        Ok(())
    }

    fn withdraw_address(&self, delegator: Address) -> CapabilityResult<Address> {
        self.check_failure()?;
        Ok(self
            .state
            .read()
            .withdraw_addresses
            .get(&delegator)
            .copied()
            .unwrap_or(delegator))
    }

    fn withdraw_rewards(&self, delegator: Address, validator: &str) -> CapabilityResult<U256> {
        self.check_failure()?;
        let mut state = self.state.write();
        let amount = state
            .rewards
            .remove(&(delegator, validator.to_string()))
            .unwrap_or_default();
        let recipient = state
            .withdraw_addresses
            .get(&delegator)
            .copied()
            .unwrap_or(delegator);
        state.credit(recipient, &self.bond_denom, amount);
        Ok(amount)
    }

    fn rewards(&self, delegator: Address, validator: &str) -> CapabilityResult<U256> {
        self.check_failure()?;
        Ok(self
            .state
            .read()
            .rewards
            .get(&(delegator, validator.to_string()))
            .copied()
            .unwrap_or_default())
    }
}

impl GovCapability for MemoryLedger {
    fn vote(
        &self,
        voter: Address,
        proposal_id: u64,
        option: VoteOption,
        _metadata: &str,
    ) -> CapabilityResult<()> {
        self.check_failure()?;
        let mut state = self.state.write();
        if state.proposal(proposal_id)? != ProposalStatus::VotingPeriod {
            return Err(CapabilityError::Rejected(format!(
                "proposal {proposal_id} is not in its voting period"
            )));
        }
        state.votes.insert((proposal_id, voter), option);
        Ok(())
    }

    fn deposit(
        &self,
        depositor: Address,
        proposal_id: u64,
        denom: &str,
        amount: U256,
    ) -> CapabilityResult<()> {
        self.check_failure()?;
        let mut state = self.state.write();
        if !matches!(
            state.proposal(proposal_id)?,
            ProposalStatus::DepositPeriod | ProposalStatus::VotingPeriod
        ) {
            return Err(CapabilityError::Rejected(format!(
                "proposal {proposal_id} no longer accepts deposits"
            )));
        }
        state.debit(depositor, denom, amount)?;
        state.credit(Self::gov_account(), denom, amount);
        let total = state.deposits.entry(proposal_id).or_default();
        *total = total.saturating_add(amount);
        Ok(())
    }

    fn proposal_status(&self, proposal_id: u64) -> CapabilityResult<Option<ProposalStatus>> {
        self.check_failure()?;
        Ok(self.state.read().proposals.get(&proposal_id).copied())
    }

    fn vote_of(&self, proposal_id: u64, voter: Address) -> CapabilityResult<Option<VoteOption>> {
        self.check_failure()?;
        Ok(self.state.read().votes.get(&(proposal_id, voter)).copied())
    }
}

impl SlashingCapability for MemoryLedger {
    fn unjail(&self, validator: &str) -> CapabilityResult<()> {
        self.check_failure()?;
        let mut state = self.state.write();
        match state.validators.get_mut(validator) {
            Some(jailed) if *jailed => {
                *jailed = false;
                Ok(())
            }
            Some(_) => Err(CapabilityError::Rejected(format!(
                "validator {validator} is not jailed"
            ))),
            None => Err(CapabilityError::Rejected(format!(
                "validator {validator} does not exist"
            ))),
        }
    }

    fn signing_info(&self, consensus_address: &str) -> CapabilityResult<Option<SigningInfo>> {
        self.check_failure()?;
        Ok(self
            .state
            .read()
            .signing_infos
            .get(consensus_address)
            .copied())
    }
}

impl TransferCapability for MemoryLedger {
    fn channel_is_open(&self, port: &str, channel: &str) -> CapabilityResult<bool> {
        self.check_failure()?;
        Ok(self
            .state
            .read()
            .channels
            .contains(&(port.to_string(), channel.to_string())))
    }

    fn transfer(&self, request: &TransferRequest) -> CapabilityResult<u64> {
        self.check_failure()?;
        let mut state = self.state.write();
        let channel = (request.source_port.clone(), request.source_channel.clone());
        if !state.channels.contains(&channel) {
            return Err(CapabilityError::Rejected(format!(
                "channel {}/{} is not open",
                request.source_port, request.source_channel
            )));
        }
        state.debit(request.sender, &request.denom, request.amount)?;
        state.credit(Self::transfer_escrow(), &request.denom, request.amount);
        state.next_sequence += 1;
        Ok(state.next_sequence)
    }

    fn denom_path(&self, hash: &str) -> CapabilityResult<Option<String>> {
        self.check_failure()?;
        Ok(self.state.read().denom_traces.get(hash).cloned())
    }
}

impl Journal for MemoryLedger {
    fn checkpoint(&self) -> Checkpoint {
        let mut checkpoints = self.checkpoints.lock();
        checkpoints.push(self.state.read().clone());
        Checkpoint(checkpoints.len() - 1)
    }

    fn revert_to(&self, checkpoint: Checkpoint) {
        let mut checkpoints = self.checkpoints.lock();
        if checkpoint.0 >= checkpoints.len() {
            return;
        }
        checkpoints.truncate(checkpoint.0 + 1);
        if let Some(restored) = checkpoints.pop() {
            *self.state.write() = restored;
        }
    }

    fn commit(&self, checkpoint: Checkpoint) {
        self.checkpoints.lock().truncate(checkpoint.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");
    const BOB: Address = address!("0x00000000000000000000000000000000000000b0");

    #[test]
    fn nested_checkpoints_revert_independently() {
        let ledger = MemoryLedger::default();
        ledger.set_balance(ALICE, "drop", U256::from(10));

        let outer = ledger.checkpoint();
        ledger.send(ALICE, BOB, "drop", U256::from(3)).unwrap();
        let inner = ledger.checkpoint();
        ledger.send(ALICE, BOB, "drop", U256::from(4)).unwrap();

        ledger.revert_to(inner);
        assert_eq!(ledger.balance_of(BOB, "drop"), U256::from(3));
        assert_eq!(ledger.checkpoint_depth(), 1);

        ledger.revert_to(outer);
        assert_eq!(ledger.balance_of(BOB, "drop"), U256::ZERO);
        assert_eq!(ledger.checkpoint_depth(), 0);
    }

    #[test]
    fn commit_keeps_writes() {
        let ledger = MemoryLedger::default();
        ledger.set_balance(ALICE, "drop", U256::from(10));

        let checkpoint = ledger.checkpoint();
        ledger.send(ALICE, BOB, "drop", U256::from(3)).unwrap();
        ledger.commit(checkpoint);

        assert_eq!(ledger.balance_of(BOB, "drop"), U256::from(3));
        assert_eq!(ledger.checkpoint_depth(), 0);
    }

    #[test]
    fn injected_failure_fires_once() {
        let ledger = MemoryLedger::default();
        ledger.fail_next(CapabilityError::Cancelled);

        assert_eq!(
            ledger.balance(ALICE, "drop"),
            Err(CapabilityError::Cancelled)
        );
        assert_eq!(ledger.balance(ALICE, "drop"), Ok(U256::ZERO));
    }

    #[test]
    fn send_rejects_overdraft() {
        let ledger = MemoryLedger::default();
        let err = ledger.send(ALICE, BOB, "drop", U256::from(1)).unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::Rejected(msg) if msg.contains("insufficient funds")
        ));
    }
}
