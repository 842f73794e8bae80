// Address Books
//
// Two JSON documents feed contract addresses into the configuration tasks:
//
// - the Witnet address book, `{ ecosystem: { network: { "WitnetBytecodes": "0x..", ... } } }`,
//   published with the Witnet bridge deployments;
// - the project's own contract address file, `{ "contracts": { "<chainId>": { name: "0x.." } } }`,
//   which is optional and only consulted for logging.

use ethers::types::Address;
use log::{info, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Errors raised while resolving Witnet contract addresses.
#[derive(Debug, thiserror::Error)]
pub enum AddressBookError {
    #[error("cannot read address book {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed address book {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no Witnet deployment for {ecosystem}/{network}")]
    UnknownNetwork { ecosystem: String, network: String },
    #[error("Witnet deployment for {network} has no {contract} address")]
    MissingContract { network: String, contract: &'static str },
    #[error("invalid {contract} address {value:?}")]
    InvalidAddress { contract: &'static str, value: String },
}

/// Addresses of the Witnet contracts the configuration task talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnetAddresses {
    pub bytecodes: Address,
    pub request_factory: Address,
}

/// Witnet deployments by ecosystem, then network.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct WitnetAddressBook {
    ecosystems: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

impl WitnetAddressBook {
    pub fn from_path(path: &Path) -> Result<Self, AddressBookError> {
        let raw = fs::read_to_string(path).map_err(|source| AddressBookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AddressBookError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolves the bytecode registry and request factory of `ecosystem`/`network`.
    /// Explicit addresses take precedence over the book's entries.
    pub fn resolve(
        &self,
        ecosystem: &str,
        network: &str,
        bytecodes: Option<Address>,
        request_factory: Option<Address>,
    ) -> Result<WitnetAddresses, AddressBookError> {
        let deployment = self
            .ecosystems
            .get(ecosystem)
            .and_then(|networks| networks.get(network));

        let lookup = |contract: &'static str| -> Result<Address, AddressBookError> {
            let deployment = deployment.ok_or_else(|| AddressBookError::UnknownNetwork {
                ecosystem: ecosystem.to_string(),
                network: network.to_string(),
            })?;
            let value = deployment
                .get(contract)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AddressBookError::MissingContract {
                    network: network.to_string(),
                    contract,
                })?;
            Address::from_str(value.trim()).map_err(|_| AddressBookError::InvalidAddress {
                contract,
                value: value.clone(),
            })
        };

        let bytecodes = match bytecodes {
            Some(address) => address,
            None => lookup("WitnetBytecodes")?,
        };
        let request_factory = match request_factory {
            Some(address) => address,
            None => lookup("WitnetRequestFactory")?,
        };
        Ok(WitnetAddresses {
            bytecodes,
            request_factory,
        })
    }
}

/// The project's deployed contracts, keyed by chain id then contract name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractAddresses {
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, Address>>,
}

impl ContractAddresses {
    /// Reads the contract address file. Absence or a parse failure is logged
    /// and yields `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                info!("contract addresses file not found at {}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(addresses) => Some(addresses),
            Err(e) => {
                warn!("Ignoring malformed contract addresses file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn for_chain(&self, chain_id: u64) -> Option<&BTreeMap<String, Address>> {
        self.contracts.get(&chain_id.to_string())
    }
}
