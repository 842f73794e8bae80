// Witnet Adapters Module
// ethers-backed implementations of the registry and factory traits

pub mod witnet_bytecodes;
pub mod witnet_request_factory;

pub use witnet_bytecodes::WitnetBytecodes;
pub use witnet_request_factory::WitnetRequestFactory;

// Re-export the traits
pub use crate::registry::{RadonRegistry, TemplateFactory};

use ethers::abi::Detokenize;
use ethers::prelude::{ContractCall, Middleware, TransactionReceipt};

use crate::registry::RegistryError;

/// Transaction parameters applied to every state-changing call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Explicit gas limit; estimated by the node when `None`
    pub gas_limit: Option<u64>,
    /// Send pre-EIP-1559 transactions
    pub legacy: bool,
}

impl TxOptions {
    pub fn apply<M, D>(&self, call: ContractCall<M, D>) -> ContractCall<M, D>
    where
        M: Middleware,
        D: Detokenize,
    {
        let call = if self.legacy { call.legacy() } else { call };
        match self.gas_limit {
            Some(gas) => call.gas(gas),
            None => call,
        }
    }

    /// Sends `call` as a transaction and waits until it is mined.
    pub async fn submit<M, D>(&self, call: ContractCall<M, D>) -> Result<TransactionReceipt, RegistryError>
    where
        M: Middleware + 'static,
        D: Detokenize + Send + Sync,
    {
        let call = self.apply(call);
        let pending = call
            .send()
            .await
            .map_err(|e| RegistryError::Transaction(e.to_string()))?;
        let tx_hash = *pending;
        log::info!("Transaction {:?} sent, waiting to be mined", tx_hash);

        pending
            .await
            .map_err(|e| RegistryError::Transaction(e.to_string()))?
            .ok_or(RegistryError::Dropped(tx_hash))
    }
}
