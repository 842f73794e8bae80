// Contracts Module - Witnet ABIs consumed by the configuration tasks

pub mod i_witnet_bytecodes;
pub mod i_witnet_request_factory;

// Public exports
pub use i_witnet_bytecodes::{
    IWitnetBytecodes, NewRadonReducerHashFilter, NewRadonRetrievalHashFilter, NewSlaHashFilter,
};
pub use i_witnet_request_factory::{IWitnetRequestFactory, WitnetRequestTemplateBuiltFilter};
