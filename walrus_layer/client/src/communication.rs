//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Per-node operations bound to a committee member. [`NodeClient`]/[`NodeClientFactory`] form the
//! seam between the dispatch engine and the HTTP transport, so tests can substitute programmable
//! nodes.

use async_trait::async_trait;
use futures::{future::Either, stream::FuturesUnordered, StreamExt};
use log::*;
use reqwest::Url;
use walrus_common_types::{
    messages::confirmation_message_bytes,
    BlobId,
    BlobPersistenceType,
    BlobStatus,
    CommitteeMember,
    Epoch,
    ShardIndex,
    SignedStorageConfirmation,
    Sliver,
    SliverPair,
    SliverPairIndex,
    SliverType,
};
use walrus_storage_node_client::{
    types::BlobMetadataWithId,
    StorageNodeClient,
    StorageNodeClientError,
    StorageNodeClientOptions,
};

use crate::codec::BlobCodec;

const LOG_TARGET: &str = "walrus::client::communication";

/// The per-node operations consumed by the read and write paths.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_metadata(&self, blob_id: &BlobId) -> Result<BlobMetadataWithId, StorageNodeClientError>;

    async fn store_metadata(&self, metadata: &BlobMetadataWithId) -> Result<(), StorageNodeClientError>;

    async fn get_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
    ) -> Result<Sliver, StorageNodeClientError>;

    async fn store_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
        sliver: &Sliver,
    ) -> Result<(), StorageNodeClientError>;

    async fn get_blob_status(&self, blob_id: &BlobId) -> Result<BlobStatus, StorageNodeClientError>;

    async fn get_confirmation(
        &self,
        blob_id: &BlobId,
        persistence: &BlobPersistenceType,
    ) -> Result<SignedStorageConfirmation, StorageNodeClientError>;
}

#[async_trait]
impl NodeClient for StorageNodeClient {
    async fn get_metadata(&self, blob_id: &BlobId) -> Result<BlobMetadataWithId, StorageNodeClientError> {
        StorageNodeClient::get_metadata(self, blob_id).await
    }

    async fn store_metadata(&self, metadata: &BlobMetadataWithId) -> Result<(), StorageNodeClientError> {
        StorageNodeClient::store_metadata(self, metadata).await
    }

    async fn get_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
    ) -> Result<Sliver, StorageNodeClientError> {
        StorageNodeClient::get_sliver(self, blob_id, pair_index, sliver_type).await
    }

    async fn store_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
        sliver: &Sliver,
    ) -> Result<(), StorageNodeClientError> {
        StorageNodeClient::store_sliver(self, blob_id, pair_index, sliver_type, sliver).await
    }

    async fn get_blob_status(&self, blob_id: &BlobId) -> Result<BlobStatus, StorageNodeClientError> {
        StorageNodeClient::get_blob_status(self, blob_id).await
    }

    async fn get_confirmation(
        &self,
        blob_id: &BlobId,
        persistence: &BlobPersistenceType,
    ) -> Result<SignedStorageConfirmation, StorageNodeClientError> {
        StorageNodeClient::get_confirmation(self, blob_id, persistence).await
    }
}

/// Creates a [`NodeClient`] for each committee member.
pub trait NodeClientFactory: Send + Sync + 'static {
    type Client: NodeClient;

    fn create_client(&self, member: &CommitteeMember) -> Result<Self::Client, StorageNodeClientError>;
}

/// Factory producing [`StorageNodeClient`]s over one shared connection pool.
pub struct HttpNodeClientFactory {
    client: reqwest::Client,
}

impl HttpNodeClientFactory {
    pub fn new(options: &StorageNodeClientOptions) -> Result<Self, StorageNodeClientError> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl NodeClientFactory for HttpNodeClientFactory {
    type Client = StorageNodeClient;

    fn create_client(&self, member: &CommitteeMember) -> Result<Self::Client, StorageNodeClientError> {
        let url = Url::parse(&format!("https://{}", member.network_address))?;
        Ok(StorageNodeClient::with_client(self.client.clone(), url))
    }
}

/// One committee member paired with a client, exposing the weighted operations the dispatcher
/// fans out.
pub struct NodeCommunication<'a, C> {
    pub node_index: u16,
    pub epoch: Epoch,
    pub member: &'a CommitteeMember,
    pub client: C,
}

impl<'a, C: NodeClient> NodeCommunication<'a, C> {
    pub fn new(node_index: u16, epoch: Epoch, member: &'a CommitteeMember, client: C) -> Self {
        Self {
            node_index,
            epoch,
            member,
            client,
        }
    }

    /// The shard weight this node contributes to whole-blob operations.
    pub fn weight(&self) -> usize {
        self.member.weight()
    }

    /// Fetches metadata and verifies that the served record commits to the requested blob id.
    pub async fn retrieve_verified_metadata<Cd: BlobCodec>(
        &self,
        codec: &Cd,
        blob_id: &BlobId,
    ) -> Result<BlobMetadataWithId, StorageNodeClientError> {
        let metadata = self.client.get_metadata(blob_id).await?;
        if metadata.blob_id != *blob_id {
            return Err(StorageNodeClientError::InvalidResponse {
                message: format!("metadata is for blob {} instead of {}", metadata.blob_id, blob_id),
            });
        }
        let derived = codec
            .metadata_blob_id(&metadata.metadata)
            .map_err(|e| StorageNodeClientError::InvalidResponse { message: e.to_string() })?;
        if derived != *blob_id {
            return Err(StorageNodeClientError::InvalidResponse {
                message: format!("metadata re-derives to blob id {derived}"),
            });
        }
        Ok(metadata)
    }

    /// Fetches the primary sliver of `shard`, keyed by the shard for reconstruction.
    pub async fn retrieve_sliver(
        &self,
        blob_id: &BlobId,
        shard: ShardIndex,
        n_shards: u16,
    ) -> Result<(ShardIndex, Sliver), StorageNodeClientError> {
        let pair_index = shard.to_pair_index(n_shards, blob_id);
        let sliver = self.client.get_sliver(blob_id, pair_index, SliverType::Primary).await?;
        Ok((shard, sliver))
    }

    pub async fn blob_status(&self, blob_id: &BlobId) -> Result<(usize, BlobStatus), StorageNodeClientError> {
        let status = self.client.get_blob_status(blob_id).await?;
        Ok((self.weight(), status))
    }

    /// Stores the metadata, then all of the node's sliver pairs concurrently, then fetches the
    /// node's confirmation and verifies it against the canonical message and the member's key.
    pub async fn store_metadata_and_pairs<Cd: BlobCodec>(
        &self,
        codec: &Cd,
        metadata: &BlobMetadataWithId,
        pairs: &[SliverPair],
        persistence: &BlobPersistenceType,
        max_concurrent_sliver_stores: usize,
    ) -> Result<SignedStorageConfirmation, StorageNodeClientError> {
        self.client.store_metadata(metadata).await?;

        let blob_id = metadata.blob_id;
        let mut stores = pairs
            .iter()
            .flat_map(|pair| {
                [
                    Either::Left(self.client.store_sliver(&blob_id, pair.index(), SliverType::Primary, &pair.primary)),
                    Either::Right(self.client.store_sliver(
                        &blob_id,
                        pair.index(),
                        SliverType::Secondary,
                        &pair.secondary,
                    )),
                ]
            })
            .collect::<Vec<_>>()
            .into_iter();
        let mut in_flight = stores
            .by_ref()
            .take(max_concurrent_sliver_stores.max(1))
            .collect::<FuturesUnordered<_>>();
        while let Some(result) = in_flight.next().await {
            result?;
            if let Some(next) = stores.next() {
                in_flight.push(next);
            }
        }
        trace!(
            target: LOG_TARGET,
            "Stored {} sliver pairs on node {}",
            pairs.len(),
            self.node_index
        );

        let confirmation = self.client.get_confirmation(&blob_id, persistence).await?;
        let expected = confirmation_message_bytes(self.epoch, &blob_id, persistence);
        if confirmation.serialized_message != expected {
            warn!(
                target: LOG_TARGET,
                "Node {} returned a confirmation over an unexpected message", self.node_index
            );
            return Err(StorageNodeClientError::InvalidResponse {
                message: "confirmation message does not match the canonical encoding".to_string(),
            });
        }
        if !codec.verify_confirmation(&self.member.public_key, &confirmation.serialized_message, &confirmation.signature)
        {
            warn!(
                target: LOG_TARGET,
                "Node {} returned a confirmation with an invalid signature", self.node_index
            );
            return Err(StorageNodeClientError::InvalidResponse {
                message: "confirmation signature does not verify".to_string(),
            });
        }
        Ok(confirmation)
    }
}
