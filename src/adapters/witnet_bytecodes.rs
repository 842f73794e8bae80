use async_trait::async_trait;
use ethers::prelude::*;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::adapters::TxOptions;
use crate::contracts::{
    i_witnet_bytecodes, IWitnetBytecodes, NewRadonReducerHashFilter, NewRadonRetrievalHashFilter,
    NewSlaHashFilter,
};
use crate::radon::{
    Descriptor, DescriptorKind, DescriptorRecord, RadonFilter, RadonReducer, RadonSla,
    RetrievalRecord, SlaRecord,
};
use crate::registry::{RadonRegistry, RegistryError};

/// [`RadonRegistry`] backed by a deployed `WitnetBytecodes` contract.
#[derive(Debug, Clone)]
pub struct WitnetBytecodes<M> {
    contract: IWitnetBytecodes<M>,
    tx_options: TxOptions,
}

impl<M: Middleware + 'static> WitnetBytecodes<M> {
    pub fn new(address: Address, client: Arc<M>, tx_options: TxOptions) -> Self {
        Self {
            contract: IWitnetBytecodes::new(address, client),
            tx_options,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }
}

fn abi_reducer(reducer: &RadonReducer) -> i_witnet_bytecodes::RadonReducer {
    i_witnet_bytecodes::RadonReducer {
        opcode: reducer.opcode,
        filters: reducer
            .filters
            .iter()
            .map(|filter| i_witnet_bytecodes::RadonFilter {
                opcode: filter.opcode,
                args: filter.args.clone(),
            })
            .collect(),
        script: reducer.script.clone(),
    }
}

fn abi_sla(sla: &RadonSla) -> i_witnet_bytecodes::RadonSLA {
    i_witnet_bytecodes::RadonSLA {
        num_witnesses: U256::from(sla.num_witnesses),
        min_consensus_percentage: U256::from(sla.min_consensus_percentage),
        witness_reward: U256::from(sla.witness_reward),
        witness_collateral: U256::from(sla.witness_collateral),
        miner_commit_reveal_fee: U256::from(sla.miner_commit_reveal_fee),
    }
}

#[async_trait]
impl<M: Middleware + 'static> RadonRegistry for WitnetBytecodes<M> {
    async fn hash_of(&self, descriptor: &Descriptor) -> Result<H256, RegistryError> {
        let hash = match descriptor {
            Descriptor::Retrieval(retrieval) => {
                self.contract
                    .verify_radon_retrieval(
                        retrieval.method.as_u8(),
                        retrieval.schema.clone(),
                        retrieval.authority.clone(),
                        retrieval.path.clone(),
                        retrieval.query.clone(),
                        retrieval.body.clone(),
                        retrieval.headers.clone(),
                        retrieval.script.clone(),
                    )
                    .call()
                    .await
            }
            Descriptor::Reducer(reducer) => {
                self.contract
                    .verify_radon_reducer(abi_reducer(reducer))
                    .call()
                    .await
            }
            Descriptor::Sla(sla) => self.contract.verify_radon_sla(abi_sla(sla)).call().await,
        }
        .map_err(|e| RegistryError::Call(e.to_string()))?;

        debug!("{} hash derived by registry: {:?}", descriptor.kind(), H256::from(hash));
        Ok(H256::from(hash))
    }

    async fn lookup(
        &self,
        kind: DescriptorKind,
        hash: H256,
    ) -> Result<Option<DescriptorRecord>, RegistryError> {
        let result = match kind {
            DescriptorKind::Retrieval => self
                .contract
                .lookup_radon_retrieval(hash.0)
                .call()
                .await
                .map(|stored| {
                    DescriptorRecord::Retrieval(RetrievalRecord {
                        method: stored.method,
                        url: stored.url,
                        body: stored.body,
                        headers: stored.headers,
                        script: stored.script,
                    })
                }),
            DescriptorKind::Reducer => self
                .contract
                .lookup_radon_reducer(hash.0)
                .call()
                .await
                .map(|stored| {
                    DescriptorRecord::Reducer(RadonReducer {
                        opcode: stored.opcode,
                        filters: stored
                            .filters
                            .into_iter()
                            .map(|filter| RadonFilter {
                                opcode: filter.opcode,
                                args: filter.args,
                            })
                            .collect(),
                        script: stored.script,
                    })
                }),
            DescriptorKind::Sla => self
                .contract
                .lookup_radon_sla(hash.0)
                .call()
                .await
                .map(|stored| {
                    DescriptorRecord::Sla(SlaRecord {
                        num_witnesses: stored.num_witnesses,
                        min_consensus_percentage: stored.min_consensus_percentage,
                        witness_reward: stored.witness_reward,
                        witness_collateral: stored.witness_collateral,
                        miner_commit_reveal_fee: stored.miner_commit_reveal_fee,
                    })
                }),
        };

        match result {
            Ok(record) => Ok(Some(record)),
            // The registry reverts on unknown hashes
            Err(e) if e.is_revert() => Ok(None),
            Err(e) => Err(RegistryError::Call(e.to_string())),
        }
    }

    async fn register(&self, descriptor: &Descriptor) -> Result<Option<H256>, RegistryError> {
        let kind = descriptor.kind();
        let receipt = match descriptor {
            Descriptor::Retrieval(retrieval) => {
                let call = self.contract.verify_radon_retrieval(
                    retrieval.method.as_u8(),
                    retrieval.schema.clone(),
                    retrieval.authority.clone(),
                    retrieval.path.clone(),
                    retrieval.query.clone(),
                    retrieval.body.clone(),
                    retrieval.headers.clone(),
                    retrieval.script.clone(),
                );
                self.tx_options.submit(call).await?
            }
            Descriptor::Reducer(reducer) => {
                let call = self.contract.verify_radon_reducer(abi_reducer(reducer));
                self.tx_options.submit(call).await?
            }
            Descriptor::Sla(sla) => {
                let call = self.contract.verify_radon_sla(abi_sla(sla));
                self.tx_options.submit(call).await?
            }
        };
        info!(
            "{} registration mined in block {:?} (tx {:?})",
            kind, receipt.block_number, receipt.transaction_hash
        );

        let hash = match kind {
            DescriptorKind::Retrieval => {
                emitted_by::<M, NewRadonRetrievalHashFilter>(&self.contract, &receipt)
                    .await
                    .map(|event| event.hash)
            }
            DescriptorKind::Reducer => {
                emitted_by::<M, NewRadonReducerHashFilter>(&self.contract, &receipt)
                    .await
                    .map(|event| event.hash)
            }
            DescriptorKind::Sla => emitted_by::<M, NewSlaHashFilter>(&self.contract, &receipt)
                .await
                .map(|event| event.hash),
        };
        Ok(hash.map(H256::from))
    }
}

/// First `E` event in the receipt's block that was emitted by the receipt's
/// transaction.
///
/// The transaction is already mined here, so a failed log query is reported
/// like an absent event.
pub(crate) async fn emitted_by<M, E>(contract: &Contract<M>, receipt: &TransactionReceipt) -> Option<E>
where
    M: Middleware + 'static,
    E: EthEvent + Send + Sync,
{
    let Some(block) = receipt.block_number else {
        warn!("Receipt of {:?} has no block number", receipt.transaction_hash);
        return None;
    };
    let events = match contract
        .event::<E>()
        .from_block(block)
        .to_block(block)
        .query_with_meta()
        .await
    {
        Ok(events) => events,
        Err(e) => {
            warn!("Could not query {} events in block {}: {}", E::name(), block, e);
            return None;
        }
    };

    debug!("{} {} event(s) in block {}", events.len(), E::name(), block);
    events
        .into_iter()
        .find(|(_, meta)| meta.transaction_hash == receipt.transaction_hash)
        .map(|(event, _)| event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::providers::{JsonRpcError, MockProvider, MockResponse};

    type Mocked = Provider<MockProvider>;

    const REGISTRY: Address = H160([0xb0; 20]);

    fn registry() -> (WitnetBytecodes<Mocked>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let registry = WitnetBytecodes::new(REGISTRY, Arc::new(provider), TxOptions::default());
        (registry, mock)
    }

    fn receipt(tx: H256, block: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx,
            block_number: Some(U64::from(block)),
            ..Default::default()
        }
    }

    fn sla_hash_log(hash: H256, tx: H256, block: u64, index: u64) -> Log {
        Log {
            address: REGISTRY,
            topics: vec![NewSlaHashFilter::signature()],
            data: encode(&[Token::FixedBytes(hash.as_bytes().to_vec())]).into(),
            block_hash: Some(H256::repeat_byte(0xbb)),
            block_number: Some(U64::from(block)),
            transaction_hash: Some(tx),
            transaction_index: Some(U64::from(index)),
            log_index: Some(U256::from(index)),
            ..Default::default()
        }
    }

    fn uint(value: u64) -> Token {
        Token::Uint(U256::from(value))
    }

    #[tokio::test]
    async fn test_event_of_other_transaction_is_ignored() {
        let (registry, mock) = registry();
        let ours = H256::repeat_byte(0x01);
        let theirs = H256::repeat_byte(0x02);
        mock.push::<Vec<Log>, _>(vec![
            sla_hash_log(H256::repeat_byte(0xaa), theirs, 7, 0),
            sla_hash_log(H256::repeat_byte(0xcc), ours, 7, 1),
        ])
        .unwrap();

        let event = emitted_by::<Mocked, NewSlaHashFilter>(&registry.contract, &receipt(ours, 7)).await;
        assert_eq!(event.map(|e| H256::from(e.hash)), Some(H256::repeat_byte(0xcc)));
    }

    #[tokio::test]
    async fn test_block_without_our_event() {
        let (registry, mock) = registry();
        mock.push::<Vec<Log>, _>(vec![sla_hash_log(H256::repeat_byte(0xaa), H256::repeat_byte(0x02), 7, 0)])
            .unwrap();

        let event =
            emitted_by::<Mocked, NewSlaHashFilter>(&registry.contract, &receipt(H256::repeat_byte(0x01), 7)).await;
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_failed_log_query_reads_as_no_event() {
        // No response queued: eth_getLogs fails
        let (registry, _mock) = registry();
        let event =
            emitted_by::<Mocked, NewSlaHashFilter>(&registry.contract, &receipt(H256::repeat_byte(0x01), 7)).await;
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_receipt_without_block_reads_as_no_event() {
        let (registry, _mock) = registry();
        let mut pending = receipt(H256::repeat_byte(0x01), 7);
        pending.block_number = None;
        assert!(emitted_by::<Mocked, NewSlaHashFilter>(&registry.contract, &pending).await.is_none());
    }

    #[tokio::test]
    async fn test_hash_of_returns_registry_hash() {
        let (registry, mock) = registry();
        let hash = H256::repeat_byte(0x5a);
        mock.push::<Bytes, _>(Bytes::from(encode(&[Token::FixedBytes(hash.as_bytes().to_vec())])))
            .unwrap();

        let derived = registry.hash_of(&Descriptor::Sla(RadonSla::default())).await.unwrap();
        assert_eq!(derived, hash);
        assert_eq!(registry.address(), REGISTRY);
    }

    #[tokio::test]
    async fn test_lookup_decodes_sla_record() {
        let (registry, mock) = registry();
        let stored = encode(&[Token::Tuple(vec![
            uint(9),
            uint(66),
            uint(1_000_000_000),
            uint(15_000_000_000),
            uint(100_000_000),
        ])]);
        mock.push::<Bytes, _>(Bytes::from(stored)).unwrap();

        let record = registry
            .lookup(DescriptorKind::Sla, H256::repeat_byte(0x5a))
            .await
            .unwrap()
            .unwrap();
        assert!(Descriptor::Sla(RadonSla::default()).matches(&record));
    }

    #[tokio::test]
    async fn test_reverting_lookup_is_unknown() {
        let (registry, mock) = registry();
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some(serde_json::Value::String("0x".to_string())),
        }));

        let record = registry.lookup(DescriptorKind::Sla, H256::repeat_byte(0x5a)).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_failing_lookup_is_an_error() {
        // No response queued: the provider itself fails
        let (registry, _mock) = registry();
        let result = registry.lookup(DescriptorKind::Reducer, H256::repeat_byte(0x5a)).await;
        assert!(matches!(result, Err(RegistryError::Call(_))));
    }
}
