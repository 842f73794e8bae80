use config::{Config, ConfigError, File, FileFormat};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::adapters::TxOptions;
use crate::radon::{RadonReducer, RadonRetrieval, RadonSla};

#[derive(Debug, Deserialize, Clone)]
pub struct Network {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Chain id used as the cache key. Queried from the node when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

impl Default for Network {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
        }
    }
}

#[derive(Deserialize, Clone, Default)]
pub struct SignerSettings {
    /// Hex-encoded private keys; the first one signs transactions
    #[serde(default)]
    pub private_keys: Vec<String>,
}

impl fmt::Debug for SignerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerSettings")
            .field("private_keys", &format_args!("[{} redacted]", self.private_keys.len()))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WitnetSettings {
    #[serde(default = "default_ecosystem")]
    pub ecosystem: String,
    #[serde(default = "default_witnet_network")]
    pub network: String,
    /// Witnet address book (`{ ecosystem: { network: { contract: address } } }`),
    /// by default the one published with the `witnet-solidity-bridge` package
    #[serde(default = "default_addresses_file")]
    pub addresses_file: String,
    /// Overrides the `WitnetBytecodes` entry of the address book
    #[serde(default)]
    pub bytecodes: Option<Address>,
    /// Overrides the `WitnetRequestFactory` entry of the address book
    #[serde(default)]
    pub request_factory: Option<Address>,
}

fn default_ecosystem() -> String {
    "polygon".to_string()
}
fn default_witnet_network() -> String {
    "polygon.goerli".to_string()
}
fn default_addresses_file() -> String {
    "node_modules/witnet-solidity-bridge/migrations/witnet.addresses.json".to_string()
}

impl Default for WitnetSettings {
    fn default() -> Self {
        Self {
            ecosystem: default_ecosystem(),
            network: default_witnet_network(),
            addresses_file: default_addresses_file(),
            bytecodes: None,
            request_factory: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Paths {
    #[serde(default = "default_request_hashes_path")]
    pub request_hashes: String,
    #[serde(default = "default_contract_addresses_path")]
    pub contract_addresses: String,
}

fn default_request_hashes_path() -> String {
    "abi/witnet-requesthashes.json".to_string()
}
fn default_contract_addresses_path() -> String {
    "abi/addresses.json".to_string()
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            request_hashes: default_request_hashes_path(),
            contract_addresses: default_contract_addresses_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Transactions {
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub legacy: bool,
}

/// Descriptors the `configure` task verifies or registers.
///
/// The retrieval is always supplied by the caller. The reducer defaults to
/// `ConcatenateAndHash` with no filters; the SLA defaults to 9 witnesses at 66%
/// consensus.
#[derive(Debug, Deserialize, Clone)]
pub struct RadonSettings {
    pub retrieval: RadonRetrieval,
    #[serde(default)]
    pub reducer: RadonReducer,
    #[serde(default)]
    pub sla: RadonSla,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub signer: SignerSettings,
    #[serde(default)]
    pub witnet: WitnetSettings,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub transactions: Transactions,
    pub radon: RadonSettings,
}

impl Settings {
    /// Loads `Config.toml` from the working directory.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path(Path::new("Config.toml"))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder().add_source(File::from(path)).build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Parses settings from TOML text without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Applies `WITNET_*` overrides obtained through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = non_empty("WITNET_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(raw) = non_empty("WITNET_CHAIN_ID") {
            match raw.parse() {
                Ok(chain_id) => self.network.chain_id = Some(chain_id),
                Err(e) => log::warn!("Ignoring WITNET_CHAIN_ID={:?}: {}", raw, e),
            }
        }
        if let Some(raw) = non_empty("WITNET_PRIVATE_KEYS") {
            let keys = parse_string_list(&raw);
            if !keys.is_empty() {
                self.signer.private_keys = keys;
            }
        }
        if let Some(ecosystem) = non_empty("WITNET_ECOSYSTEM") {
            self.witnet.ecosystem = ecosystem;
        }
        if let Some(network) = non_empty("WITNET_NETWORK") {
            self.witnet.network = network;
        }
    }

    pub fn tx_options(&self) -> TxOptions {
        TxOptions {
            gas_limit: self.transactions.gas_limit,
            legacy: self.transactions.legacy,
        }
    }

    pub fn request_hashes_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.request_hashes)
    }

    pub fn contract_addresses_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.contract_addresses)
    }
}

/// Accepts a JSON string array or a comma separated list.
fn parse_string_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
