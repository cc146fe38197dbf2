//! Prints the address a native module account is derived to, both as EIP-55
//! hex and in bech32 form.

#![allow(missing_docs, rustdoc::missing_crate_level_docs)]

use alloy_primitives::Address;
use clap::Parser;
use eyre::WrapErr;
use infinite_precompiles::{
    address::{derive_module_address, to_checksum_hex},
    codec::{encode_address, DEFAULT_ACCOUNT_PREFIX},
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Module account address calculator.
#[derive(Parser, Debug)]
#[command(name = "infinite-addr", about = "Derive a module account address")]
struct Args {
    /// Module name, e.g. `bonded_tokens_pool` or `erc20|uatom`
    name: String,

    /// Bech32 human-readable prefix
    #[arg(long, env = "INFINITE_BECH32_PREFIX", default_value = DEFAULT_ACCOUNT_PREFIX)]
    prefix: String,
}

#[derive(Debug, PartialEq, Eq)]
struct ModuleAccount {
    address: Address,
    hex: String,
    bech32: String,
}

impl ModuleAccount {
    fn derive(name: &str, prefix: &str) -> eyre::Result<Self> {
        let address = derive_module_address(name);
        let bech32 = encode_address(prefix, &address)
            .wrap_err_with(|| format!("invalid bech32 prefix {prefix:?}"))?;
        Ok(Self {
            address,
            hex: to_checksum_hex(&address),
            bech32,
        })
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> eyre::Result<()> {
    init_tracing();

    let args = Args::parse();
    let account = ModuleAccount::derive(&args.name, &args.prefix)?;
    debug!(
        name = %args.name,
        prefix = %args.prefix,
        address = %account.address,
        "derived module account"
    );

    println!("{}", account.hex);
    println!("{}", account.bech32);
    Ok(())
}
