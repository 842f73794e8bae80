//! # Configurator
//!
//! Idempotent "verify-or-create" flow that makes sure the configured Radon
//! descriptors are registered on the Witnet bytecode registry and that a request
//! template combining them has been built by the request factory.
//!
//! ## Flow
//!
//! 1. Retrieval, reducer and SLA descriptors, in that order, through
//!    [`ensure_registered`]. Each result is written into the cache entry of the
//!    current chain before the next step starts.
//! 2. The request template through [`ensure_template`], using the hashes the
//!    previous steps left in the cache.
//!
//! No step aborts the run. Every step yields a [`StepOutcome`] and the run yields
//! a [`RunSummary`], so callers can tell a complete run from a degraded one.

use ethers::types::{Address, H256};
use log::{error, info, warn};
use std::fmt;

use crate::cache::RequestHashCache;
use crate::radon::{Descriptor, DescriptorKind};
use crate::registry::{RadonRegistry, TemplateFactory, TemplateSpec};
use crate::settings::RadonSettings;

/// Result of one verify-or-create step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    /// Taken from the cache, nothing was queried
    Cached(T),
    /// Already present on chain, no transaction issued
    Verified(T),
    /// Created by a transaction issued during this run
    Registered(T),
    /// The step ran but produced no value (e.g. the expected event was missing)
    Missing { reason: String },
    /// The step could not complete
    Failed { reason: String },
}

impl<T> StepOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            StepOutcome::Cached(value)
            | StepOutcome::Verified(value)
            | StepOutcome::Registered(value) => Some(value),
            StepOutcome::Missing { .. } | StepOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.value().is_some()
    }

    /// Whether the step issued a state-changing transaction that got mined.
    pub fn transacted(&self) -> bool {
        matches!(self, StepOutcome::Registered(_) | StepOutcome::Missing { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Cached(_) => "cached",
            StepOutcome::Verified(_) => "verified",
            StepOutcome::Registered(_) => "registered",
            StepOutcome::Missing { .. } => "missing",
            StepOutcome::Failed { .. } => "failed",
        }
    }
}

impl<T: fmt::Debug> fmt::Display for StepOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Cached(value)
            | StepOutcome::Verified(value)
            | StepOutcome::Registered(value) => write!(f, "{} {:?}", self.label(), value),
            StepOutcome::Missing { reason } | StepOutcome::Failed { reason } => {
                write!(f, "{} ({})", self.label(), reason)
            }
        }
    }
}

/// Outcome of a full `configure` run on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub chain_id: u64,
    pub retrieval: StepOutcome<H256>,
    pub reducer: StepOutcome<H256>,
    pub sla: StepOutcome<H256>,
    pub request_template: StepOutcome<Address>,
}

impl RunSummary {
    /// True when every cache field ended up with a value.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Cache fields left without a value, by their JSON key.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (kind, outcome) in self.descriptor_outcomes() {
            if !outcome.is_success() {
                missing.push(kind.event_name());
            }
        }
        if !self.request_template.is_success() {
            missing.push("WitnetRequestTemplate");
        }
        missing
    }

    /// Number of state-changing transactions mined during the run.
    pub fn transactions(&self) -> usize {
        self.descriptor_outcomes()
            .iter()
            .filter(|(_, outcome)| outcome.transacted())
            .count()
            + usize::from(self.request_template.transacted())
    }

    pub fn descriptor_outcomes(&self) -> [(DescriptorKind, &StepOutcome<H256>); 3] {
        [
            (DescriptorKind::Retrieval, &self.retrieval),
            (DescriptorKind::Reducer, &self.reducer),
            (DescriptorKind::Sla, &self.sla),
        ]
    }
}

/// Makes sure `descriptor` is registered and returns its hash.
///
/// A `cached` hash is reused without any registry call. Otherwise the hash is
/// derived by the registry, the stored entry is compared field by field and a
/// registration transaction is only issued when the entry is unknown or differs.
pub async fn ensure_registered<R>(
    registry: &R,
    descriptor: &Descriptor,
    cached: Option<H256>,
) -> StepOutcome<H256>
where
    R: RadonRegistry + ?Sized,
{
    let kind = descriptor.kind();
    if let Some(hash) = cached {
        info!("Using cached {} hash {:?}", kind, hash);
        return StepOutcome::Cached(hash);
    }

    info!("Verifying {}", kind);
    let hash = match registry.hash_of(descriptor).await {
        Ok(hash) => hash,
        Err(e) => {
            error!("Could not derive {} hash: {}", kind, e);
            return StepOutcome::Failed {
                reason: format!("hash derivation failed: {}", e),
            };
        }
    };

    let stored = match registry.lookup(kind, hash).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Lookup of {} {:?} failed: {}", kind, hash, e);
            None
        }
    };

    match stored {
        Some(record) if descriptor.matches(&record) => {
            info!("Found registered {} {:?}", kind, hash);
            return StepOutcome::Verified(hash);
        }
        Some(record) => {
            warn!("Registered {} {:?} does not match the configured one: {:?}", kind, hash, record);
        }
        None => info!("Unknown {} {:?}", kind, hash),
    }

    info!("Registering {}", kind);
    match registry.register(descriptor).await {
        Ok(Some(registered)) => {
            info!("{} {:?}", kind.event_name(), registered);
            StepOutcome::Registered(registered)
        }
        Ok(None) => {
            error!("Could not verify the {}: no {} event", kind, kind.event_name());
            StepOutcome::Missing {
                reason: format!("no {} event in the registration receipt", kind.event_name()),
            }
        }
        Err(e) => {
            error!("Registration of {} failed: {}", kind, e);
            StepOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Makes sure a request template exists for `spec` and returns its address.
///
/// The address the factory would deploy to is derived first; if a contract is
/// already there it is reused. Otherwise the template is built with a
/// transaction and the address is taken from the build event.
pub async fn ensure_template<F>(factory: &F, spec: &TemplateSpec) -> StepOutcome<Address>
where
    F: TemplateFactory + ?Sized,
{
    match factory.template_address(spec).await {
        Ok(address) => match factory.code_exists(address).await {
            Ok(true) => {
                info!("Found existing request template {:?}", address);
                return StepOutcome::Verified(address);
            }
            Ok(false) => info!("No request template deployed at {:?}", address),
            Err(e) => warn!("Could not fetch code at {:?}: {}", address, e),
        },
        Err(e) => warn!("Error looking up request template: {}", e),
    }

    info!("Building request template");
    match factory.build_template(spec).await {
        Ok(Some(address)) => {
            info!("Request template built at {:?}", address);
            StepOutcome::Registered(address)
        }
        Ok(None) => {
            error!("Could not find the WitnetRequestTemplateBuilt event");
            StepOutcome::Missing {
                reason: "no WitnetRequestTemplateBuilt event in the build receipt".to_string(),
            }
        }
        Err(e) => {
            error!("Building the request template failed: {}", e);
            StepOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Runs the full configuration flow for one chain.
#[derive(Debug)]
pub struct Configurator<R, F> {
    registry: R,
    factory: F,
    chain_id: u64,
}

impl<R, F> Configurator<R, F>
where
    R: RadonRegistry,
    F: TemplateFactory,
{
    pub fn new(registry: R, factory: F, chain_id: u64) -> Self {
        Self {
            registry,
            factory,
            chain_id,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Verifies or registers every descriptor, then the request template,
    /// recording each result in `cache`. Fields of failed steps are cleared.
    pub async fn run(&self, cache: &mut RequestHashCache, radon: &RadonSettings) -> RunSummary {
        let retrieval = self
            .ensure_cached(cache, Descriptor::Retrieval(radon.retrieval.clone()))
            .await;
        let reducer = self
            .ensure_cached(cache, Descriptor::Reducer(radon.reducer.clone()))
            .await;
        let sla = self.ensure_cached(cache, Descriptor::Sla(radon.sla)).await;

        let entry = cache.entry_mut(self.chain_id);
        let request_template = match (entry.retrieval, entry.reducer) {
            // Aggregation and tally both use the configured reducer
            (Some(retrieval), Some(reducer)) => {
                let spec = TemplateSpec::new(vec![retrieval], reducer, reducer);
                ensure_template(&self.factory, &spec).await
            }
            _ => {
                error!("Cannot build a request template without retrieval and reducer hashes");
                StepOutcome::Failed {
                    reason: "retrieval or reducer hash unavailable".to_string(),
                }
            }
        };
        cache.entry_mut(self.chain_id).request_template = request_template.value().copied();

        RunSummary {
            chain_id: self.chain_id,
            retrieval,
            reducer,
            sla,
            request_template,
        }
    }

    async fn ensure_cached(
        &self,
        cache: &mut RequestHashCache,
        descriptor: Descriptor,
    ) -> StepOutcome<H256> {
        let kind = descriptor.kind();
        let cached = cache.entry_mut(self.chain_id).hash(kind);
        let outcome = ensure_registered(&self.registry, &descriptor, cached).await;
        cache
            .entry_mut(self.chain_id)
            .set_hash(kind, outcome.value().copied());
        outcome
    }
}
