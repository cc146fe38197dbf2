//! Precompile registry composition and the sealed, shareable lookup table.
//!
//! A [`PrecompileRegistry`] is assembled once at startup, one family at a time,
//! then [`sealed`](PrecompileRegistry::seal) into [`Precompiles`], which has no
//! mutation API and is shared by every EVM instance.

use crate::{
    address::{
        BANK_PRECOMPILE_ADDRESS, BECH32_PRECOMPILE_ADDRESS, DISTRIBUTION_PRECOMPILE_ADDRESS,
        GOV_PRECOMPILE_ADDRESS, ICS20_PRECOMPILE_ADDRESS, P256_PRECOMPILE_ADDRESS,
        SLASHING_PRECOMPILE_ADDRESS, STAKING_PRECOMPILE_ADDRESS,
    },
    bank::BankPrecompile,
    bech32::Bech32Precompile,
    capability::{
        BankCapability, DistributionCapability, GovCapability, SlashingCapability,
        StakingCapability, TransferCapability,
    },
    codec::CapabilityOptions,
    config::PrecompilesConfig,
    contract::PrecompiledContract,
    distribution::DistributionPrecompile,
    erc20::{Erc20Precompile, TokenMetadata},
    error::RegistryError,
    ethereum::EthereumPrecompile,
    gov::GovPrecompile,
    ics20::Ics20Precompile,
    p256::P256Precompile,
    slashing::SlashingPrecompile,
    staking::StakingPrecompile,
};
use alloy_primitives::Address;
use std::{collections::HashMap, fmt, sync::Arc};

/// Shared handle to a registered contract.
pub type DynPrecompile = Arc<dyn PrecompiledContract>;

/// Capability providers available to [`PrecompileRegistry::from_config`].
///
/// A provider only has to be present if a family that needs it is active.
#[derive(Clone, Default)]
pub struct CapabilityProviders {
    /// Balances and transfers; also needed by staking, gov, ICS-20 and ERC-20.
    pub bank: Option<Arc<dyn BankCapability>>,
    /// Delegations.
    pub staking: Option<Arc<dyn StakingCapability>>,
    /// Rewards and withdraw addresses.
    pub distribution: Option<Arc<dyn DistributionCapability>>,
    /// Proposals, votes and deposits.
    pub gov: Option<Arc<dyn GovCapability>>,
    /// Validator jailing.
    pub slashing: Option<Arc<dyn SlashingCapability>>,
    /// Cross-chain transfers.
    pub transfer: Option<Arc<dyn TransferCapability>>,
}

impl CapabilityProviders {
    /// Sets the bank provider.
    pub fn with_bank(mut self, bank: Arc<dyn BankCapability>) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Sets the staking provider.
    pub fn with_staking(mut self, staking: Arc<dyn StakingCapability>) -> Self {
        self.staking = Some(staking);
        self
    }

    /// Sets the distribution provider.
    pub fn with_distribution(mut self, distribution: Arc<dyn DistributionCapability>) -> Self {
        self.distribution = Some(distribution);
        self
    }

    /// Sets the governance provider.
    pub fn with_gov(mut self, gov: Arc<dyn GovCapability>) -> Self {
        self.gov = Some(gov);
        self
    }

    /// Sets the slashing provider.
    pub fn with_slashing(mut self, slashing: Arc<dyn SlashingCapability>) -> Self {
        self.slashing = Some(slashing);
        self
    }

    /// Sets the cross-chain transfer provider.
    pub fn with_transfer(mut self, transfer: Arc<dyn TransferCapability>) -> Self {
        self.transfer = Some(transfer);
        self
    }
}

impl fmt::Debug for CapabilityProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProviders")
            .field("bank", &self.bank.is_some())
            .field("staking", &self.staking.is_some())
            .field("distribution", &self.distribution.is_some())
            .field("gov", &self.gov.is_some())
            .field("slashing", &self.slashing.is_some())
            .field("transfer", &self.transfer.is_some())
            .finish()
    }
}

fn require<T: ?Sized>(
    provider: Option<&Arc<T>>,
    family: &'static str,
    capability: &'static str,
) -> Result<Arc<T>, RegistryError> {
    provider
        .cloned()
        .ok_or(RegistryError::MissingCapability { family, capability })
}

/// Mutable builder of the address to contract mapping.
///
/// Every `with_*` step consumes the registry and returns it, failing with
/// [`RegistryError::AddressCollision`] instead of overwriting an occupied
/// address.
#[derive(Debug, Default)]
pub struct PrecompileRegistry {
    contracts: HashMap<Address, DynPrecompile>,
}

impl PrecompileRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `contract` at its own address.
    pub fn insert(&mut self, contract: DynPrecompile) -> Result<(), RegistryError> {
        let address = contract.address();
        if let Some(existing) = self.contracts.get(&address) {
            return Err(RegistryError::AddressCollision {
                address,
                existing: existing.name(),
                incoming: contract.name(),
            });
        }
        tracing::info!(
            target: "precompiles::registry",
            %address,
            name = contract.name(),
            "registered precompile"
        );
        self.contracts.insert(address, contract);
        Ok(())
    }

    /// Fluent form of [`insert`](Self::insert).
    pub fn with_contract(mut self, contract: DynPrecompile) -> Result<Self, RegistryError> {
        self.insert(contract)?;
        Ok(self)
    }

    /// Adds Ethereum's standard precompiles (`0x01..=0x11`) as of Prague.
    pub fn with_prague(self) -> Result<Self, RegistryError> {
        EthereumPrecompile::prague()
            .into_iter()
            .try_fold(self, |registry, contract| registry.with_contract(Arc::new(contract)))
    }

    /// Adds secp256r1 signature verification.
    pub fn with_p256(self) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(P256Precompile))
    }

    /// Adds the bech32 address converter.
    pub fn with_bech32(self) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(Bech32Precompile::default()))
    }

    /// Adds the bank precompile.
    pub fn with_bank(self, bank: Arc<dyn BankCapability>) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(BankPrecompile::new(bank)))
    }

    /// Adds the staking precompile.
    pub fn with_staking(
        self,
        staking: Arc<dyn StakingCapability>,
        bank: Arc<dyn BankCapability>,
        options: CapabilityOptions,
    ) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(StakingPrecompile::new(staking, bank, options)))
    }

    /// Adds the distribution precompile.
    pub fn with_distribution(
        self,
        distribution: Arc<dyn DistributionCapability>,
        options: CapabilityOptions,
    ) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(DistributionPrecompile::new(distribution, options)))
    }

    /// Adds the ICS-20 transfer precompile.
    pub fn with_ics20(
        self,
        transfer: Arc<dyn TransferCapability>,
        bank: Arc<dyn BankCapability>,
    ) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(Ics20Precompile::new(transfer, bank)))
    }

    /// Adds the governance precompile.
    pub fn with_gov(
        self,
        gov: Arc<dyn GovCapability>,
        bank: Arc<dyn BankCapability>,
    ) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(GovPrecompile::new(gov, bank)))
    }

    /// Adds the slashing precompile.
    pub fn with_slashing(
        self,
        slashing: Arc<dyn SlashingCapability>,
        options: CapabilityOptions,
    ) -> Result<Self, RegistryError> {
        self.with_contract(Arc::new(SlashingPrecompile::new(slashing, options)))
    }

    /// Adds the token pair of `metadata.denom`.
    pub fn with_erc20(
        self,
        metadata: TokenMetadata,
        bank: Arc<dyn BankCapability>,
    ) -> Result<Self, RegistryError> {
        if metadata.denom.is_empty() {
            return Err(RegistryError::InvalidFamily {
                family: "erc20",
                reason: "token pair denom cannot be empty".to_string(),
            });
        }
        self.with_contract(Arc::new(Erc20Precompile::new(metadata, bank)))
    }

    /// Composes the families activated by `config`, starting with the
    /// standard Ethereum set when it is enabled.
    ///
    /// Fails if an active family lacks a provider or an active address does not
    /// belong to a static precompile.
    pub fn from_config(
        config: &PrecompilesConfig,
        providers: &CapabilityProviders,
    ) -> Result<Self, RegistryError> {
        let options = config
            .capability_options()
            .map_err(|err| RegistryError::InvalidFamily {
                family: "address codec",
                reason: err.to_string(),
            })?;

        let mut registry = Self::new();
        if config.ethereum_precompiles {
            registry = registry.with_prague()?;
        }
        for &address in &config.active_static_precompiles {
            registry = registry.with_static(address, providers, options)?;
        }

        for token in &config.native_erc20_tokens {
            let bank = require(providers.bank.as_ref(), "erc20", "bank")?;
            registry = registry.with_erc20(token.clone(), bank)?;
        }

        Ok(registry)
    }

    fn with_static(
        self,
        address: Address,
        providers: &CapabilityProviders,
        options: CapabilityOptions,
    ) -> Result<Self, RegistryError> {
        match address {
            P256_PRECOMPILE_ADDRESS => self.with_p256(),
            BECH32_PRECOMPILE_ADDRESS => self.with_bech32(),
            STAKING_PRECOMPILE_ADDRESS => self.with_staking(
                require(providers.staking.as_ref(), "staking", "staking")?,
                require(providers.bank.as_ref(), "staking", "bank")?,
                options,
            ),
            DISTRIBUTION_PRECOMPILE_ADDRESS => self.with_distribution(
                require(providers.distribution.as_ref(), "distribution", "distribution")?,
                options,
            ),
            ICS20_PRECOMPILE_ADDRESS => self.with_ics20(
                require(providers.transfer.as_ref(), "ics20", "transfer")?,
                require(providers.bank.as_ref(), "ics20", "bank")?,
            ),
            BANK_PRECOMPILE_ADDRESS => {
                self.with_bank(require(providers.bank.as_ref(), "bank", "bank")?)
            }
            GOV_PRECOMPILE_ADDRESS => self.with_gov(
                require(providers.gov.as_ref(), "gov", "gov")?,
                require(providers.bank.as_ref(), "gov", "bank")?,
            ),
            SLASHING_PRECOMPILE_ADDRESS => self.with_slashing(
                require(providers.slashing.as_ref(), "slashing", "slashing")?,
                options,
            ),
            _ => Err(RegistryError::UnknownPrecompile(address)),
        }
    }

    /// Looks up the contract at `address`.
    pub fn get(&self, address: &Address) -> Option<&DynPrecompile> {
        self.contracts.get(address)
    }

    /// Returns true if a contract is registered at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Number of registered contracts.
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Registered addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        sorted_addresses(&self.contracts)
    }

    /// Freezes the registry.
    pub fn seal(self) -> Precompiles {
        tracing::debug!(
            target: "precompiles::registry",
            count = self.contracts.len(),
            "sealed precompile registry"
        );
        Precompiles {
            contracts: Arc::new(self.contracts),
        }
    }
}

fn sorted_addresses(contracts: &HashMap<Address, DynPrecompile>) -> Vec<Address> {
    let mut addresses: Vec<_> = contracts.keys().copied().collect();
    addresses.sort_unstable();
    addresses
}

/// Immutable precompile set, cheap to clone and safe to read concurrently.
#[derive(Debug, Clone, Default)]
pub struct Precompiles {
    contracts: Arc<HashMap<Address, DynPrecompile>>,
}

impl Precompiles {
    /// Looks up the contract at `address`.
    pub fn get(&self, address: &Address) -> Option<&DynPrecompile> {
        self.contracts.get(address)
    }

    /// Returns true if a contract is registered at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Number of registered contracts.
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Registered addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        sorted_addresses(&self.contracts)
    }

    /// Iterates over the registered contracts in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &DynPrecompile)> {
        self.contracts.iter()
    }
}
