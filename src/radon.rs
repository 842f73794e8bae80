//! # Radon Descriptors
//!
//! Typed representation of the three descriptor kinds a Witnet data request is
//! assembled from: a data retrieval, a reducer (aggregation or tally function)
//! and a service-level agreement (witnessing policy).
//!
//! Descriptors are what we *intend* to register; [`DescriptorRecord`] is what the
//! registry returns when a hash is looked up. [`Descriptor::matches`] is the single
//! structural comparison between the two for all kinds.

use ethers::types::{Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP/RNG method of a data retrieval (`WitnetV2.DataRequestMethods`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMethod {
    Unknown = 0,
    HttpGet = 1,
    Rng = 2,
    HttpPost = 3,
}

impl RetrievalMethod {
    /// ABI encoding of the Solidity enum.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Default for RetrievalMethod {
    fn default() -> Self {
        RetrievalMethod::HttpGet
    }
}

/// A data-source descriptor as submitted to `verifyRadonRetrieval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadonRetrieval {
    #[serde(default)]
    pub method: RetrievalMethod,
    #[serde(default)]
    pub schema: String,
    pub authority: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: Vec<[String; 2]>,
    pub script: Bytes,
}

impl RadonRetrieval {
    /// URL the registry stores for this retrieval: schema and authority, then the
    /// path and query only when they are non-empty.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.schema, self.authority);
        if !self.path.is_empty() {
            url.push('/');
            url.push_str(&self.path);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        url
    }
}

/// Filter applied by a reducer before reducing (`WitnetV2.RadonFilter`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadonFilter {
    pub opcode: u8,
    #[serde(default)]
    pub args: Bytes,
}

/// Aggregation/tally reducer (`WitnetV2.RadonReducer`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadonReducer {
    pub opcode: u8,
    #[serde(default)]
    pub filters: Vec<RadonFilter>,
    #[serde(default)]
    pub script: Bytes,
}

/// Reducer opcode `ConcatenateAndHash`.
pub const OPCODE_CONCATENATE_AND_HASH: u8 = 11;

impl Default for RadonReducer {
    fn default() -> Self {
        Self {
            opcode: OPCODE_CONCATENATE_AND_HASH,
            filters: Vec::new(),
            script: Bytes::default(),
        }
    }
}

/// Witnessing policy (`WitnetV2.RadonSLA`). Amounts are in nanowits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadonSla {
    pub num_witnesses: u64,
    /// Percentage, 51..=99
    pub min_consensus_percentage: u64,
    pub witness_reward: u64,
    pub witness_collateral: u64,
    pub miner_commit_reveal_fee: u64,
}

impl Default for RadonSla {
    fn default() -> Self {
        Self {
            num_witnesses: 9,
            min_consensus_percentage: 66,
            witness_reward: 1_000_000_000,       // 1.0 WIT
            witness_collateral: 15_000_000_000,  // 15.0 WIT
            miner_commit_reveal_fee: 100_000_000, // 0.1 WIT
        }
    }
}

impl RadonSla {
    fn matches(&self, record: &SlaRecord) -> bool {
        normalize_uint(record.num_witnesses) == Some(self.num_witnesses)
            && normalize_uint(record.min_consensus_percentage) == Some(self.min_consensus_percentage)
            && normalize_uint(record.witness_reward) == Some(self.witness_reward)
            && normalize_uint(record.witness_collateral) == Some(self.witness_collateral)
            && normalize_uint(record.miner_commit_reveal_fee) == Some(self.miner_commit_reveal_fee)
    }
}

/// Converts a registry `uint256` into a plain integer. Values beyond `u64`
/// cannot equal any configured value and yield `None`.
pub fn normalize_uint(value: U256) -> Option<u64> {
    if value > U256::from(u64::MAX) {
        None
    } else {
        Some(value.as_u64())
    }
}

/// The three descriptor kinds known to the bytecode registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Retrieval,
    Reducer,
    Sla,
}

impl DescriptorKind {
    /// Name of the event the registry emits when a descriptor of this kind is
    /// first registered. Also the key used in the request hash cache.
    pub fn event_name(&self) -> &'static str {
        match self {
            DescriptorKind::Retrieval => "NewRadonRetrievalHash",
            DescriptorKind::Reducer => "NewRadonReducerHash",
            DescriptorKind::Sla => "NewSlaHash",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DescriptorKind::Retrieval => "radon retrieval",
            DescriptorKind::Reducer => "radon reducer",
            DescriptorKind::Sla => "radon SLA",
        };
        f.write_str(name)
    }
}

/// A descriptor to verify or register, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Retrieval(RadonRetrieval),
    Reducer(RadonReducer),
    Sla(RadonSla),
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Retrieval(_) => DescriptorKind::Retrieval,
            Descriptor::Reducer(_) => DescriptorKind::Reducer,
            Descriptor::Sla(_) => DescriptorKind::Sla,
        }
    }

    /// Field-by-field comparison against a registry record.
    ///
    /// Collections (headers, filters) compare in order. Integer fields the
    /// registry returns as `uint256` are normalized before comparison. A record
    /// of a different kind never matches.
    pub fn matches(&self, record: &DescriptorRecord) -> bool {
        match (self, record) {
            (Descriptor::Retrieval(retrieval), DescriptorRecord::Retrieval(stored)) => {
                retrieval.method.as_u8() == stored.method
                    && retrieval.url() == stored.url
                    && retrieval.body == stored.body
                    && retrieval.headers == stored.headers
                    && retrieval.script == stored.script
            }
            (Descriptor::Reducer(reducer), DescriptorRecord::Reducer(stored)) => reducer == stored,
            (Descriptor::Sla(sla), DescriptorRecord::Sla(stored)) => sla.matches(stored),
            _ => false,
        }
    }
}

/// Retrieval as stored by the registry: the request components have been
/// folded into a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRecord {
    pub method: u8,
    pub url: String,
    pub body: String,
    pub headers: Vec<[String; 2]>,
    pub script: Bytes,
}

/// SLA as stored by the registry, with `uint256` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaRecord {
    pub num_witnesses: U256,
    pub min_consensus_percentage: U256,
    pub witness_reward: U256,
    pub witness_collateral: U256,
    pub miner_commit_reveal_fee: U256,
}

/// Result of a registry lookup by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorRecord {
    Retrieval(RetrievalRecord),
    Reducer(RadonReducer),
    Sla(SlaRecord),
}

impl From<&RadonSla> for SlaRecord {
    fn from(sla: &RadonSla) -> Self {
        Self {
            num_witnesses: U256::from(sla.num_witnesses),
            min_consensus_percentage: U256::from(sla.min_consensus_percentage),
            witness_reward: U256::from(sla.witness_reward),
            witness_collateral: U256::from(sla.witness_collateral),
            miner_commit_reveal_fee: U256::from(sla.miner_commit_reveal_fee),
        }
    }
}

impl From<&RadonRetrieval> for RetrievalRecord {
    fn from(retrieval: &RadonRetrieval) -> Self {
        Self {
            method: retrieval.method.as_u8(),
            url: retrieval.url(),
            body: retrieval.body.clone(),
            headers: retrieval.headers.clone(),
            script: retrieval.script.clone(),
        }
    }
}
