// Task entry points
//
// `accounts` and `configure` wire settings, provider, signer and contract
// adapters together. Setup problems (bad settings, unreachable node, missing
// signer, held cache lock) are errors; problems inside the configuration flow
// are reported through the returned `RunSummary`.

use anyhow::{anyhow, Context, Result};
use ethers::prelude::*;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::{WitnetBytecodes, WitnetRequestFactory};
use crate::addresses::{ContractAddresses, WitnetAddressBook, WitnetAddresses};
use crate::cache::{CacheError, CacheLock, RequestHashCache};
use crate::configurator::{Configurator, RunSummary};
use crate::registry::{RadonRegistry, TemplateFactory};
use crate::settings::{RadonSettings, Settings};

/// Client used for state-changing calls.
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub fn connect(settings: &Settings) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(settings.network.rpc_url.as_str())
        .with_context(|| format!("invalid RPC URL {}", settings.network.rpc_url))
}

/// Chain id from the settings, or from the node when not configured.
pub async fn resolve_chain_id<M: Middleware>(settings: &Settings, provider: &M) -> Result<u64> {
    if let Some(chain_id) = settings.network.chain_id {
        return Ok(chain_id);
    }
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| anyhow!("failed to query chain id: {}", e))?;
    Ok(chain_id.as_u64())
}

/// Wallets for every configured private key, bound to `chain_id`.
pub fn load_wallets(settings: &Settings, chain_id: u64) -> Result<Vec<LocalWallet>> {
    settings
        .signer
        .private_keys
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let key = key.trim();
            let key = key.strip_prefix("0x").unwrap_or(key);
            LocalWallet::from_str(key)
                .map(|wallet| wallet.with_chain_id(chain_id))
                .with_context(|| format!("invalid private key at index {}", index))
        })
        .collect()
}

/// Addresses of the configured signers, or the node's unlocked accounts when
/// no private key is configured.
pub async fn accounts<M: Middleware>(provider: &M, wallets: &[LocalWallet]) -> Result<Vec<Address>> {
    if !wallets.is_empty() {
        return Ok(wallets.iter().map(|wallet| wallet.address()).collect());
    }
    provider
        .get_accounts()
        .await
        .map_err(|e| anyhow!("failed to list node accounts: {}", e))
}

/// Resolves the Witnet contracts from the address book and explicit settings.
/// The address book is only read when an address is not given explicitly.
pub fn witnet_addresses(settings: &Settings) -> Result<WitnetAddresses> {
    let witnet = &settings.witnet;
    let book = if witnet.bytecodes.is_some() && witnet.request_factory.is_some() {
        WitnetAddressBook::default()
    } else {
        WitnetAddressBook::from_path(Path::new(&witnet.addresses_file)).context(
            "install witnet-solidity-bridge, or set witnet.addresses_file or both \
             witnet.bytecodes and witnet.request_factory",
        )?
    };
    let addresses = book.resolve(
        &witnet.ecosystem,
        &witnet.network,
        witnet.bytecodes,
        witnet.request_factory,
    )?;
    debug!("Witnet {}/{} addresses: {:?}", witnet.ecosystem, witnet.network, addresses);
    Ok(addresses)
}

/// Locks and loads the cache at `cache_path`, runs `configurator`, then writes
/// the cache back whatever the outcome of the individual steps.
pub async fn configure_with<R, F>(
    configurator: &Configurator<R, F>,
    cache_path: &Path,
    radon: &RadonSettings,
) -> Result<RunSummary, CacheError>
where
    R: RadonRegistry,
    F: TemplateFactory,
{
    let _lock = CacheLock::acquire(cache_path)?;
    let mut cache = RequestHashCache::load(cache_path);
    cache.entry_mut(configurator.chain_id());

    let summary = configurator.run(&mut cache, radon).await;
    cache.save(cache_path)?;
    Ok(summary)
}

/// The `configure` task against the network selected by `settings`.
pub async fn configure(settings: &Settings) -> Result<RunSummary> {
    let provider = connect(settings)?;
    let chain_id = resolve_chain_id(settings, &provider).await?;
    let wallet = load_wallets(settings, chain_id)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("configure needs a signer: set signer.private_keys or WITNET_PRIVATE_KEYS"))?;
    info!("Chain {} with signer {:?}", chain_id, wallet.address());

    let addresses = witnet_addresses(settings)?;
    log_contract_addresses(&settings.contract_addresses_path(), chain_id);

    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    let tx_options = settings.tx_options();
    let configurator = Configurator::new(
        WitnetBytecodes::new(addresses.bytecodes, Arc::clone(&client), tx_options),
        WitnetRequestFactory::new(addresses.request_factory, client, tx_options),
        chain_id,
    );
    info!(
        "Using WitnetBytecodes at {:?} and WitnetRequestFactory at {:?}",
        configurator.registry().address(),
        configurator.factory().address()
    );

    let cache_path: PathBuf = settings.request_hashes_path();
    let summary = configure_with(&configurator, &cache_path, &settings.radon).await?;
    Ok(summary)
}

fn log_contract_addresses(path: &Path, chain_id: u64) {
    let Some(addresses) = ContractAddresses::load(path) else {
        return;
    };
    match addresses.for_chain(chain_id) {
        Some(contracts) => {
            for (name, address) in contracts {
                info!("using {}: {:?}", name, address);
            }
        }
        None => info!("No project contracts recorded for chain {}", chain_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"
        [signer]
        private_keys = [
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        ]

        [radon.retrieval]
        authority = "https://example.org"
        script = "0x80"
    "#;

    #[test]
    fn test_load_wallets_accepts_prefixed_and_bare_keys() {
        let settings = Settings::from_toml_str(SETTINGS).unwrap();
        let wallets = load_wallets(&settings, 31337).unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(
            wallets[0].address(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        assert_eq!(
            wallets[1].address(),
            Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()
        );
        assert_eq!(wallets[0].chain_id(), 31337);
    }

    #[test]
    fn test_load_wallets_rejects_garbage() {
        let mut settings = Settings::from_toml_str(SETTINGS).unwrap();
        settings.signer.private_keys = vec!["not-a-key".to_string()];
        assert!(load_wallets(&settings, 1).is_err());
    }

    #[tokio::test]
    async fn test_accounts_prefer_configured_signers() {
        let settings = Settings::from_toml_str(SETTINGS).unwrap();
        let wallets = load_wallets(&settings, 1).unwrap();
        let (provider, _mock) = Provider::mocked();
        let addresses = accounts(&provider, &wallets).await.unwrap();
        assert_eq!(addresses.len(), 2);
    }

    #[tokio::test]
    async fn test_configured_chain_id_skips_the_node() {
        let mut settings = Settings::from_toml_str(SETTINGS).unwrap();
        settings.network.chain_id = Some(80001);
        let (provider, _mock) = Provider::mocked();
        assert_eq!(resolve_chain_id(&settings, &provider).await.unwrap(), 80001);
    }

    fn shipped_settings() -> Settings {
        Settings::from_path(&Path::new(env!("CARGO_MANIFEST_DIR")).join("Config.toml")).unwrap()
    }

    #[test]
    fn test_shipped_config_resolves_from_bridge_address_book() {
        let mut settings = shipped_settings();
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join(&settings.witnet.addresses_file);
        std::fs::create_dir_all(book.parent().unwrap()).unwrap();
        std::fs::write(
            &book,
            r#"{"polygon":{"polygon.goerli":{
                "WitnetBytecodes":"0x0000000000000000000000000000000000000b0b",
                "WitnetRequestFactory":"0x0000000000000000000000000000000000000fac"}}}"#,
        )
        .unwrap();
        settings.witnet.addresses_file = book.display().to_string();

        let addresses = witnet_addresses(&settings).unwrap();
        assert_eq!(
            addresses.request_factory,
            Address::from_str("0x0000000000000000000000000000000000000fac").unwrap()
        );
    }

    #[test]
    fn test_explicit_addresses_need_no_address_book() {
        let mut settings = shipped_settings();
        settings.witnet.addresses_file = "/nonexistent/witnet.addresses.json".to_string();
        settings.witnet.bytecodes = Some(Address::repeat_byte(0x0b));
        settings.witnet.request_factory = Some(Address::repeat_byte(0x0f));

        let addresses = witnet_addresses(&settings).unwrap();
        assert_eq!(addresses.bytecodes, Address::repeat_byte(0x0b));
    }

    #[test]
    fn test_missing_address_book_explains_the_fix() {
        let mut settings = shipped_settings();
        settings.witnet.addresses_file = "/nonexistent/witnet.addresses.json".to_string();
        settings.witnet.bytecodes = Some(Address::repeat_byte(0x0b));

        let err = witnet_addresses(&settings).unwrap_err();
        assert!(format!("{:#}", err).contains("witnet.request_factory"));
    }

    #[tokio::test]
    async fn test_chain_id_from_node() {
        let settings = Settings::from_toml_str(SETTINGS).unwrap();
        let (provider, mock) = Provider::mocked();
        mock.push(U64::from(1287)).unwrap();
        assert_eq!(resolve_chain_id(&settings, &provider).await.unwrap(), 1287);
    }
}
