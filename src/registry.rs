//! # Registry Traits
//!
//! Seams between the configuration logic and the external Witnet contracts.
//!
//! [`RadonRegistry`] abstracts the bytecode registry (`IWitnetBytecodes`) and
//! [`TemplateFactory`] abstracts the request factory (`IWitnetRequestFactory`).
//! The ethers-backed implementations live in [`crate::adapters`]; tests provide
//! in-memory implementations.

use async_trait::async_trait;
use ethers::types::{Address, H256};

use crate::radon::{Descriptor, DescriptorKind, DescriptorRecord};

/// Errors raised while talking to the Witnet contracts.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A read-only (simulated) contract call failed or reverted.
    #[error("contract call failed: {0}")]
    Call(String),
    /// Submitting or mining a transaction failed.
    #[error("transaction failed: {0}")]
    Transaction(String),
    /// The transaction was dropped from the mempool before being mined.
    #[error("transaction {0:?} dropped before being mined")]
    Dropped(H256),
    /// A provider-level request (logs, code) failed.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Access to the Radon bytecode registry.
#[async_trait]
pub trait RadonRegistry: Send + Sync {
    /// Canonical hash the registry assigns to `descriptor`, derived with a
    /// simulated call. No state changes.
    async fn hash_of(&self, descriptor: &Descriptor) -> Result<H256, RegistryError>;

    /// Registry entry stored under `hash`, `None` if the registry has no such entry.
    async fn lookup(
        &self,
        kind: DescriptorKind,
        hash: H256,
    ) -> Result<Option<DescriptorRecord>, RegistryError>;

    /// Registers `descriptor` with a transaction and waits for it to be mined.
    ///
    /// Returns the hash carried by the registration event emitted by that
    /// transaction, or `None` if no such event could be found or decoded. Once
    /// the transaction is mined, failures to read its logs also yield `None`.
    async fn register(&self, descriptor: &Descriptor) -> Result<Option<H256>, RegistryError>;
}

/// Parameters of `buildRequestTemplate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Retrieval descriptor hashes
    pub retrievals: Vec<H256>,
    /// Aggregation reducer hash
    pub aggregator: H256,
    /// Witnessing (tally) reducer hash
    pub tally: H256,
    /// Reserved; always zero
    pub result_max_size: u16,
}

impl TemplateSpec {
    pub fn new(retrievals: Vec<H256>, aggregator: H256, tally: H256) -> Self {
        Self {
            retrievals,
            aggregator,
            tally,
            result_max_size: 0,
        }
    }
}

/// Access to the request template factory.
#[async_trait]
pub trait TemplateFactory: Send + Sync {
    /// Address `build_template` would return for `spec`, derived with a
    /// simulated call. The template is deployed at a deterministic address.
    async fn template_address(&self, spec: &TemplateSpec) -> Result<Address, RegistryError>;

    /// Whether a contract is deployed at `address`.
    async fn code_exists(&self, address: Address) -> Result<bool, RegistryError>;

    /// Builds the template with a transaction and waits for it to be mined.
    ///
    /// Returns the address carried by the template-built event, or `None` if
    /// no such event was emitted by that transaction.
    async fn build_template(&self, spec: &TemplateSpec) -> Result<Option<Address>, RegistryError>;
}
