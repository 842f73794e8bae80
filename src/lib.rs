//! # Witnet Radon SDK
//!
//! Configuration tooling for an already-deployed Witnet oracle bridge on an EVM
//! chain. It verifies or registers the Radon descriptors a data request is built
//! from, builds the matching request template and keeps the resulting hashes in a
//! JSON cache keyed by chain id.
//!
//! ## Overview
//!
//! - **Descriptors**: typed retrieval, reducer and SLA descriptors with a single
//!   structural comparison against registry records
//! - **Registry seams**: async traits over `IWitnetBytecodes` and
//!   `IWitnetRequestFactory`, implemented on top of ethers-rs bindings
//! - **Configurator**: idempotent verify-or-create steps reporting a per-step
//!   outcome instead of aborting
//! - **Cache**: the `witnet-requesthashes.json` memoization table
//!
//! ## Tasks
//!
//! The `witnet` binary exposes two tasks: `accounts` prints the configured signer
//! addresses and `configure` runs the full flow for the configured network.

// Core Types
/// Radon descriptor model
pub mod radon;
/// Traits over the Witnet registry and request factory
pub mod registry;

// Contracts & Adapters
/// Witnet contract ABIs
pub mod contracts;
/// ethers-backed registry and factory implementations
pub mod adapters;

// Configuration Flow
/// Verify-or-create steps and run summary
pub mod configurator;
/// Request hash cache persistence
pub mod cache;
/// Witnet and project address books
pub mod addresses;
/// Task entry points
pub mod tasks;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use cache::RequestHashCache;
pub use configurator::{Configurator, RunSummary, StepOutcome};
pub use radon::{Descriptor, DescriptorKind};
pub use registry::{RadonRegistry, TemplateFactory};
pub use settings::Settings;
