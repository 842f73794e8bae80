use async_trait::async_trait;
use ethers::prelude::*;
use log::{debug, info};
use std::sync::Arc;

use crate::adapters::{witnet_bytecodes::emitted_by, TxOptions};
use crate::contracts::{IWitnetRequestFactory, WitnetRequestTemplateBuiltFilter};
use crate::registry::{RegistryError, TemplateFactory, TemplateSpec};

/// [`TemplateFactory`] backed by a deployed `WitnetRequestFactory` contract.
#[derive(Debug, Clone)]
pub struct WitnetRequestFactory<M> {
    contract: IWitnetRequestFactory<M>,
    client: Arc<M>,
    tx_options: TxOptions,
}

impl<M: Middleware + 'static> WitnetRequestFactory<M> {
    pub fn new(address: Address, client: Arc<M>, tx_options: TxOptions) -> Self {
        Self {
            contract: IWitnetRequestFactory::new(address, Arc::clone(&client)),
            client,
            tx_options,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    fn build_call(&self, spec: &TemplateSpec) -> ContractCall<M, Address> {
        self.contract.build_request_template(
            spec.retrievals.iter().map(|hash| hash.0).collect(),
            spec.aggregator.0,
            spec.tally.0,
            spec.result_max_size,
        )
    }
}

#[async_trait]
impl<M: Middleware + 'static> TemplateFactory for WitnetRequestFactory<M> {
    async fn template_address(&self, spec: &TemplateSpec) -> Result<Address, RegistryError> {
        let address = self
            .build_call(spec)
            .call()
            .await
            .map_err(|e| RegistryError::Call(e.to_string()))?;
        debug!("Request template address derived by factory: {:?}", address);
        Ok(address)
    }

    async fn code_exists(&self, address: Address) -> Result<bool, RegistryError> {
        let code = self
            .client
            .get_code(address, None)
            .await
            .map_err(|e| RegistryError::Provider(e.to_string()))?;
        Ok(!code.0.is_empty())
    }

    async fn build_template(&self, spec: &TemplateSpec) -> Result<Option<Address>, RegistryError> {
        let receipt = self.tx_options.submit(self.build_call(spec)).await?;
        info!(
            "Request template build mined in block {:?} (tx {:?})",
            receipt.block_number, receipt.transaction_hash
        );

        let event = emitted_by::<M, WitnetRequestTemplateBuiltFilter>(&self.contract, &receipt).await;
        Ok(event.map(|built| built.template))
    }
}
