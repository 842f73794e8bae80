//! In-memory registry and factory used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256};
use ethers::utils::keccak256;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use witnet_radon_sdk::radon::{
    Descriptor, DescriptorKind, DescriptorRecord, RadonReducer, RadonRetrieval, RadonSla,
    RetrievalMethod, RetrievalRecord, SlaRecord,
};
use witnet_radon_sdk::registry::{RadonRegistry, RegistryError, TemplateFactory, TemplateSpec};
use witnet_radon_sdk::settings::RadonSettings;

pub fn retrieval() -> RadonRetrieval {
    RadonRetrieval {
        method: RetrievalMethod::HttpGet,
        schema: String::new(),
        authority: "https://api.github.com".to_string(),
        path: "repos/witnet/witnet-solidity-bridge/pulls".to_string(),
        query: "state=all".to_string(),
        body: String::new(),
        headers: vec![],
        script: Bytes::from(vec![0x82, 0x18, 0x77, 0x18, 0x69]),
    }
}

pub fn radon_settings() -> RadonSettings {
    RadonSettings {
        retrieval: retrieval(),
        reducer: RadonReducer::default(),
        sla: RadonSla::default(),
    }
}

/// Record the registry would store for `descriptor`.
pub fn record_of(descriptor: &Descriptor) -> DescriptorRecord {
    match descriptor {
        Descriptor::Retrieval(retrieval) => DescriptorRecord::Retrieval(RetrievalRecord::from(retrieval)),
        Descriptor::Reducer(reducer) => DescriptorRecord::Reducer(reducer.clone()),
        Descriptor::Sla(sla) => DescriptorRecord::Sla(SlaRecord::from(sla)),
    }
}

pub fn hash_of(descriptor: &Descriptor) -> H256 {
    H256::from(keccak256(format!("{:?}", descriptor)))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryCalls {
    pub hash_of: usize,
    pub lookup: usize,
    pub register: usize,
}

impl RegistryCalls {
    pub fn total(&self) -> usize {
        self.hash_of + self.lookup + self.register
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<H256, DescriptorRecord>,
    calls: RegistryCalls,
    calls_by_kind: HashMap<DescriptorKind, RegistryCalls>,
}

/// Registry keyed by a hash of the descriptor's debug representation.
#[derive(Debug)]
pub struct MockRegistry {
    state: Mutex<RegistryState>,
    /// Whether registrations emit the hash-bearing event
    emit_events: bool,
    /// Kinds whose hash derivation fails
    failing: HashSet<DescriptorKind>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            emit_events: true,
            failing: HashSet::new(),
        }
    }
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_events() -> Self {
        Self {
            emit_events: false,
            ..Self::default()
        }
    }

    pub fn failing_on(kind: DescriptorKind) -> Self {
        Self {
            failing: HashSet::from([kind]),
            ..Self::default()
        }
    }

    /// Stores `record` under `hash` as if it had been registered earlier.
    pub fn seed(&self, hash: H256, record: DescriptorRecord) {
        self.state.lock().unwrap().entries.insert(hash, record);
    }

    pub fn calls(&self) -> RegistryCalls {
        self.state.lock().unwrap().calls
    }

    pub fn calls_for(&self, kind: DescriptorKind) -> RegistryCalls {
        self.state
            .lock()
            .unwrap()
            .calls_by_kind
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    fn count(&self, kind: DescriptorKind, bump: impl Fn(&mut RegistryCalls)) {
        let mut state = self.state.lock().unwrap();
        bump(&mut state.calls);
        bump(state.calls_by_kind.entry(kind).or_default());
    }
}

#[async_trait]
impl RadonRegistry for MockRegistry {
    async fn hash_of(&self, descriptor: &Descriptor) -> Result<H256, RegistryError> {
        self.count(descriptor.kind(), |calls| calls.hash_of += 1);
        if self.failing.contains(&descriptor.kind()) {
            return Err(RegistryError::Call("execution reverted".to_string()));
        }
        Ok(hash_of(descriptor))
    }

    async fn lookup(
        &self,
        kind: DescriptorKind,
        hash: H256,
    ) -> Result<Option<DescriptorRecord>, RegistryError> {
        self.count(kind, |calls| calls.lookup += 1);
        Ok(self.state.lock().unwrap().entries.get(&hash).cloned())
    }

    async fn register(&self, descriptor: &Descriptor) -> Result<Option<H256>, RegistryError> {
        self.count(descriptor.kind(), |calls| calls.register += 1);
        let hash = hash_of(descriptor);
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(hash, record_of(descriptor));
        Ok(self.emit_events.then_some(hash))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FactoryCalls {
    pub template_address: usize,
    pub code_exists: usize,
    pub build_template: usize,
}

#[derive(Debug, Default)]
struct FactoryState {
    deployed: HashSet<Address>,
    calls: FactoryCalls,
}

/// Factory deploying templates at an address derived from the spec.
#[derive(Debug)]
pub struct MockFactory {
    state: Mutex<FactoryState>,
    emit_events: bool,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self {
            state: Mutex::new(FactoryState::default()),
            emit_events: true,
        }
    }
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_events() -> Self {
        Self {
            emit_events: false,
            ..Self::default()
        }
    }

    pub fn address_for(spec: &TemplateSpec) -> Address {
        Address::from_slice(&keccak256(format!("{:?}", spec))[12..])
    }

    pub fn deploy(&self, address: Address) {
        self.state.lock().unwrap().deployed.insert(address);
    }

    pub fn calls(&self) -> FactoryCalls {
        self.state.lock().unwrap().calls
    }
}

#[async_trait]
impl TemplateFactory for MockFactory {
    async fn template_address(&self, spec: &TemplateSpec) -> Result<Address, RegistryError> {
        self.state.lock().unwrap().calls.template_address += 1;
        Ok(Self::address_for(spec))
    }

    async fn code_exists(&self, address: Address) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.code_exists += 1;
        Ok(state.deployed.contains(&address))
    }

    async fn build_template(&self, spec: &TemplateSpec) -> Result<Option<Address>, RegistryError> {
        let address = Self::address_for(spec);
        let mut state = self.state.lock().unwrap();
        state.calls.build_template += 1;
        state.deployed.insert(address);
        Ok(self.emit_events.then_some(address))
    }
}
