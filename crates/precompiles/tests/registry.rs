use infinite_precompiles::{
    address::{
        BANK_PRECOMPILE_ADDRESS, GOV_PRECOMPILE_ADDRESS, STAKING_PRECOMPILE_ADDRESS,
        STATIC_PRECOMPILE_ADDRESSES,
    },
    codec::CapabilityOptions,
    config::PrecompilesConfig,
    erc20::{token_pair_address, TokenMetadata},
    ethereum::EthereumPrecompile,
    test_utils::MemoryLedger,
    CapabilityProviders, PrecompileRegistry, RegistryError,
};
use serde_json::json;
use std::{collections::HashSet, sync::Arc, thread};

#[test]
fn bank_and_staking_only() {
    let ledger = Arc::new(MemoryLedger::default());
    let registry = PrecompileRegistry::new()
        .with_bank(ledger.clone())
        .and_then(|r| r.with_staking(ledger.clone(), ledger.clone(), CapabilityOptions::default()))
        .expect("distinct addresses compose");

    assert!(registry.get(&BANK_PRECOMPILE_ADDRESS).is_some());
    assert!(registry.get(&STAKING_PRECOMPILE_ADDRESS).is_some());
    assert!(registry.get(&GOV_PRECOMPILE_ADDRESS).is_none());
    assert_eq!(registry.len(), 2);
}

#[test]
fn composition_order_does_not_matter() {
    let ledger = Arc::new(MemoryLedger::default());
    let forward = PrecompileRegistry::new()
        .with_bank(ledger.clone())
        .and_then(|r| r.with_p256())
        .and_then(|r| r.with_bech32())
        .expect("compose");
    let backward = PrecompileRegistry::new()
        .with_bech32()
        .and_then(|r| r.with_p256())
        .and_then(|r| r.with_bank(ledger))
        .expect("compose");

    assert_eq!(forward.addresses(), backward.addresses());
}

#[test]
fn every_family_gets_a_distinct_address() {
    let ledger = Arc::new(MemoryLedger::default());
    let providers = CapabilityProviders::default()
        .with_bank(ledger.clone())
        .with_staking(ledger.clone())
        .with_distribution(ledger.clone())
        .with_gov(ledger.clone())
        .with_slashing(ledger.clone())
        .with_transfer(ledger);
    let config = PrecompilesConfig {
        native_erc20_tokens: vec![TokenMetadata {
            denom: "uatom".to_string(),
            name: "Atom".to_string(),
            symbol: "ATOM".to_string(),
            decimals: 6,
        }],
        ..Default::default()
    };

    let sealed = PrecompileRegistry::from_config(&config, &providers)
        .expect("composes")
        .seal();

    let expected = EthereumPrecompile::prague().len() + STATIC_PRECOMPILE_ADDRESSES.len() + 1;
    let names: HashSet<_> = sealed.iter().map(|(_, contract)| contract.name()).collect();
    assert_eq!(names.len(), expected);
    assert_eq!(sealed.len(), expected);
    assert!(sealed.contains(&token_pair_address("uatom")));
    for (address, contract) in sealed.iter() {
        assert_eq!(*address, contract.address());
    }
}

#[test]
fn chainspec_extras_drive_composition() {
    let ledger = Arc::new(MemoryLedger::default());
    let providers = CapabilityProviders::default().with_bank(ledger);
    let extras = json!({
        "infinite": {
            "ethereumPrecompiles": false,
            "activeStaticPrecompiles": ["0x0000000000000000000000000000000000000804"]
        }
    });

    let config = PrecompilesConfig::from_extras(&extras).expect("valid extras");
    let sealed = PrecompileRegistry::from_config(&config, &providers)
        .expect("bank provider present")
        .seal();
    assert_eq!(sealed.addresses(), vec![BANK_PRECOMPILE_ADDRESS]);

    let extras = json!({
        "infinite": {
            "activeStaticPrecompiles": ["0x0000000000000000000000000000000000000800"]
        }
    });
    let config = PrecompilesConfig::from_extras(&extras).expect("valid extras");
    let err = PrecompileRegistry::from_config(&config, &providers).unwrap_err();
    assert_eq!(
        err,
        RegistryError::MissingCapability {
            family: "staking",
            capability: "staking",
        }
    );
}

#[test]
fn sealed_registry_is_shared_across_threads() {
    let ledger = Arc::new(MemoryLedger::default());
    let sealed = PrecompileRegistry::new()
        .with_bank(ledger.clone())
        .and_then(|r| r.with_staking(ledger.clone(), ledger, CapabilityOptions::default()))
        .expect("compose")
        .seal();

    thread::scope(|scope| {
        for _ in 0..8 {
            let sealed = sealed.clone();
            scope.spawn(move || {
                for _ in 0..1_000 {
                    assert!(sealed.get(&BANK_PRECOMPILE_ADDRESS).is_some());
                    assert!(sealed.get(&GOV_PRECOMPILE_ADDRESS).is_none());
                }
            });
        }
    });
}
