//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! The write path: encode, route, register, distribute, verify, aggregate, certify.

use futures::FutureExt;
use log::*;
use tokio_util::sync::CancellationToken;
use walrus_common_types::{
    BlobId,
    BlobPersistenceType,
    Committee,
    ObjectId,
    SignedStorageConfirmation,
    SliverPair,
};
use walrus_storage_node_client::types::{BlobMetadataWithId, ENCODING_TYPE_RED_STUFF};

use crate::{
    chain::{
        contracts,
        types::{BlobObject, SystemState},
        CallArg,
        ChainReader,
        ProgrammableTransaction,
    },
    client::WalrusClient,
    codec::{BlobCodec, EncodedBlob},
    communication::NodeClientFactory,
    dispatch::{Acceptance, DispatchOptions, DispatchOutcome, DispatchTask, QuorumDispatcher, Required},
    error::WalrusClientError,
};

const LOG_TARGET: &str = "walrus::client::write";

#[derive(Debug, Clone)]
pub struct WriteBlobOptions {
    /// How many epochs ahead the blob stays stored.
    pub epochs: u32,
    pub deletable: bool,
    /// WAL coin to pay from; the gas coin owner's default when `None`.
    pub payment_coin: Option<ObjectId>,
}

impl Default for WriteBlobOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            deletable: false,
            payment_coin: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlobWriteReceipt {
    pub blob_id: BlobId,
    pub blob_object: BlobObject,
}

impl<C, F, Cd> WalrusClient<C, F, Cd>
where
    C: ChainReader,
    F: NodeClientFactory,
    Cd: BlobCodec,
{
    /// Stores a blob: encodes it, registers it on chain, distributes slivers to the active
    /// committee, gathers a quorum of verified confirmations and certifies on chain.
    pub async fn write_blob(&self, bytes: &[u8], options: WriteBlobOptions) -> Result<BlobWriteReceipt, WalrusClientError> {
        self.write_blob_with_cancellation(bytes, options, CancellationToken::new())
            .await
    }

    pub async fn write_blob_with_cancellation(
        &self,
        bytes: &[u8],
        options: WriteBlobOptions,
        cancel: CancellationToken,
    ) -> Result<BlobWriteReceipt, WalrusClientError> {
        let committee = self.committees().active_committee().await?;
        let system = self.committees().system_state().await?;
        let n_shards = committee.n_shards();

        let EncodedBlob {
            blob_id,
            root_hash,
            metadata,
            sliver_pairs,
        } = self.codec().encode_blob(n_shards, bytes)?;
        info!(
            target: LOG_TARGET,
            "Writing blob {} ({} bytes) to {} nodes for {} epoch(s)",
            blob_id,
            bytes.len(),
            committee.len(),
            options.epochs
        );

        // Route every sliver pair to the member owning its shard.
        let mut pairs_by_member: Vec<Vec<SliverPair>> = vec![Vec::new(); committee.len()];
        for pair in sliver_pairs {
            let shard = pair.index().to_shard_index(n_shards, &blob_id);
            let member_index = committee.member_index_for_shard(shard);
            pairs_by_member[usize::from(member_index)].push(pair);
        }

        // Registration must land before any node sees a sliver; nodes refuse unregistered ids.
        let blob_object = self
            .register_blob_on_chain(&system, &blob_id, root_hash, bytes.len() as u64, &options)
            .await?;
        if blob_object.blob_id != blob_id {
            return Err(WalrusClientError::UnexpectedChainResponse {
                details: format!(
                    "registered object {} carries blob id {} instead of {}",
                    blob_object.id, blob_object.blob_id, blob_id
                ),
            });
        }

        let persistence = if options.deletable {
            BlobPersistenceType::Deletable {
                object_id: blob_object.id,
            }
        } else {
            BlobPersistenceType::Permanent
        };
        let metadata = BlobMetadataWithId { blob_id, metadata };

        let confirmations = self
            .distribute(&committee, &metadata, &pairs_by_member, &persistence, &cancel)
            .await?;

        // Certification starts only once a quorum of verified confirmation weight is in.
        let aggregate = self.codec().combine_signatures(&confirmations)?;
        let bitmap = committee.signer_bitmap(&aggregate.signer_indices);
        let mut tx = ProgrammableTransaction::new();
        contracts::certify_blob(
            &self.config().package_config,
            CallArg::Object(blob_object.id),
            &aggregate.signature,
            bitmap,
            &aggregate.message,
        )(&mut tx);
        self.chain().execute_transaction(tx).await?;
        info!(
            target: LOG_TARGET,
            "Certified blob {} with {} signers",
            blob_id,
            aggregate.signer_indices.len()
        );

        let blob_object = self.fetch_blob_object(blob_object.id).await?;
        Ok(BlobWriteReceipt { blob_id, blob_object })
    }

    /// Builds and executes the registration transaction: split the storage payment, reserve
    /// space, split the write payment, register the blob. Returns the created blob object.
    async fn register_blob_on_chain(
        &self,
        system: &SystemState,
        blob_id: &BlobId,
        root_hash: [u8; 32],
        size: u64,
        options: &WriteBlobOptions,
    ) -> Result<BlobObject, WalrusClientError> {
        let package_config = &self.config().package_config;
        let encoded_size = self.codec().encoded_blob_length(system.n_shards, size);
        let cost = contracts::storage_cost(system, encoded_size, options.epochs);
        let payment_source = options.payment_coin.map(CallArg::Object).unwrap_or(CallArg::Gas);

        let mut tx = ProgrammableTransaction::new();
        let storage_payment = tx.split_coin(payment_source.clone(), cost.storage_cost);
        let storage = contracts::reserve_space(package_config, encoded_size, options.epochs, storage_payment.into())(
            &mut tx,
        );
        let write_payment = tx.split_coin(payment_source, cost.write_cost);
        contracts::register_blob(
            package_config,
            storage.into(),
            blob_id,
            root_hash,
            size,
            ENCODING_TYPE_RED_STUFF,
            options.deletable,
            write_payment.into(),
        )(&mut tx);
        // Both payment coins were split to the exact price and are drained by the calls above;
        // burn the emptied coin objects.
        contracts::destroy_zero(package_config, storage_payment.into())(&mut tx);
        contracts::destroy_zero(package_config, write_payment.into())(&mut tx);

        let effects = self.chain().execute_transaction(tx).await?;
        let created = effects
            .created_object_of_type("::blob::Blob")
            .ok_or_else(|| WalrusClientError::UnexpectedChainResponse {
                details: "registration did not create a Blob object".to_string(),
            })?;
        debug!(target: LOG_TARGET, "Registered blob {} as object {}", blob_id, created.object_id);
        self.fetch_blob_object(created.object_id).await
    }

    /// Concurrently stores metadata and slivers on every member and gathers verified
    /// confirmations until their weight reaches quorum.
    async fn distribute(
        &self,
        committee: &Committee,
        metadata: &BlobMetadataWithId,
        pairs_by_member: &[Vec<SliverPair>],
        persistence: &BlobPersistenceType,
        cancel: &CancellationToken,
    ) -> Result<Vec<(u16, SignedStorageConfirmation)>, WalrusClientError> {
        let comms = self.node_communications(committee);
        let codec = self.codec();
        let sliver_store_limit = self.config().max_concurrent_sliver_stores;

        let tasks = comms
            .iter()
            .filter(|comm| !pairs_by_member[usize::from(comm.node_index)].is_empty())
            .map(|comm| {
                let node_index = comm.node_index;
                DispatchTask {
                    node_index,
                    weight: comm.weight(),
                    future: async move {
                        let confirmation = comm
                            .store_metadata_and_pairs(
                                codec,
                                metadata,
                                &pairs_by_member[usize::from(node_index)],
                                persistence,
                                sliver_store_limit,
                            )
                            .await?;
                        Ok((node_index, confirmation))
                    }
                    .boxed(),
                }
            })
            .collect::<Vec<_>>();
        let n_tasks = tasks.len();
        let required_weight = committee.min_quorum_weight();

        // All nodes at once, draining stragglers: the certificate carries every confirmation
        // received, not just the first quorum of them.
        let dispatcher = QuorumDispatcher::new(committee.n_shards(), DispatchOptions {
            drain: true,
            ..DispatchOptions::all_fanout(n_tasks)
        });
        match dispatcher
            .run(tasks, Required::Weight(required_weight), cancel, |_| Acceptance::Keep)
            .await
        {
            DispatchOutcome::Complete(confirmations) => {
                info!(
                    target: LOG_TARGET,
                    "Gathered {} confirmations for blob {}",
                    confirmations.len(),
                    metadata.blob_id
                );
                Ok(confirmations)
            },
            DispatchOutcome::Aborted => Err(WalrusClientError::UserAborted),
            DispatchOutcome::Insufficient(partial) => {
                let confirmed_weight = partial
                    .iter()
                    .map(|(node_index, _)| committee.weight_of(*node_index))
                    .sum();
                Err(WalrusClientError::NotEnoughBlobConfirmations {
                    blob_id: metadata.blob_id,
                    confirmed_weight,
                    required_weight,
                })
            },
            DispatchOutcome::NotCertified | DispatchOutcome::Blocked => {
                Err(WalrusClientError::NotEnoughBlobConfirmations {
                    blob_id: metadata.blob_id,
                    confirmed_weight: 0,
                    required_weight,
                })
            },
        }
    }
}
