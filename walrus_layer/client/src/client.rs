//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{collections::BTreeMap, sync::Arc};

use log::*;
use walrus_common_types::{Committee, Epoch, ObjectId};

use crate::{
    chain::{
        contracts,
        types::{BlobObject, SystemState},
        CallArg,
        ChainClientError,
        ChainReader,
        ObjectLoader,
        ProgrammableTransaction,
    },
    codec::BlobCodec,
    committee::CommitteeService,
    communication::{NodeClientFactory, NodeCommunication},
    config::WalrusClientConfig,
    error::WalrusClientError,
};

const LOG_TARGET: &str = "walrus::client";

/// The Walrus client core.
///
/// Owns the memoized committee views and the batching object loader; all per-operation state
/// (dispatch counters, cancellation) is private to each call, so concurrent operations on one
/// client are independent.
pub struct WalrusClient<C, F, Cd> {
    config: WalrusClientConfig,
    codec: Arc<Cd>,
    factory: F,
    loader: ObjectLoader<C>,
    committees: CommitteeService<C>,
}

impl<C, F, Cd> WalrusClient<C, F, Cd>
where
    C: ChainReader,
    F: NodeClientFactory,
    Cd: BlobCodec,
{
    pub fn new(config: WalrusClientConfig, chain: Arc<C>, factory: F, codec: Arc<Cd>) -> Self {
        let loader = ObjectLoader::new(chain);
        let committees = CommitteeService::new(loader.clone(), config.package_config.clone());
        Self {
            config,
            codec,
            factory,
            loader,
            committees,
        }
    }

    pub fn config(&self) -> &WalrusClientConfig {
        &self.config
    }

    pub fn codec(&self) -> &Cd {
        &self.codec
    }

    pub fn committees(&self) -> &CommitteeService<C> {
        &self.committees
    }

    pub(crate) fn chain(&self) -> &Arc<C> {
        self.loader.reader()
    }

    /// Drops every cached view of the chain; the next operation re-reads it.
    pub async fn reset(&self) {
        debug!(target: LOG_TARGET, "Resetting committee and object caches");
        self.committees.reset().await;
    }

    pub async fn system_state(&self) -> Result<SystemState, WalrusClientError> {
        Ok(self.committees.system_state().await?)
    }

    /// Deterministic storage pricing for a blob of `size` bytes stored for `epochs` epochs.
    pub async fn storage_cost(&self, size: u64, epochs: u32) -> Result<contracts::StorageCost, WalrusClientError> {
        let system = self.committees.system_state().await?;
        let encoded_size = self.codec.encoded_blob_length(system.n_shards, size);
        Ok(contracts::storage_cost(&system, encoded_size, epochs))
    }

    /// Burns a deletable blob object, releasing its storage resource.
    pub async fn delete_blob(&self, blob_object_id: ObjectId) -> Result<(), WalrusClientError> {
        let mut tx = ProgrammableTransaction::new();
        contracts::delete_blob(&self.config.package_config, blob_object_id)(&mut tx);
        self.chain().execute_transaction(tx).await?;
        info!(target: LOG_TARGET, "Deleted blob object {}", blob_object_id);
        Ok(())
    }

    /// Extends a blob's storage until `new_end_epoch`. No transaction is submitted when the
    /// extension is not positive.
    pub async fn extend_blob(
        &self,
        blob_object_id: ObjectId,
        new_end_epoch: Epoch,
        payment_coin: Option<ObjectId>,
    ) -> Result<(), WalrusClientError> {
        let blob_object = self.fetch_blob_object(blob_object_id).await?;
        let payment = payment_coin.map(CallArg::Object).unwrap_or(CallArg::Gas);
        let mut tx = ProgrammableTransaction::new();
        let appended = contracts::extend_blob(
            &self.config.package_config,
            blob_object_id,
            blob_object.storage.end_epoch,
            new_end_epoch,
            payment,
        )(&mut tx);
        if appended.is_none() {
            debug!(
                target: LOG_TARGET,
                "Blob object {} already stored until epoch {}; nothing to extend",
                blob_object_id,
                blob_object.storage.end_epoch
            );
            return Ok(());
        }
        self.chain().execute_transaction(tx).await?;
        Ok(())
    }

    /// Reads the attribute dynamic field of a blob object; `None` when no attributes were ever
    /// written.
    pub async fn read_blob_attributes(
        &self,
        blob_object_id: ObjectId,
    ) -> Result<Option<BTreeMap<String, String>>, WalrusClientError> {
        Ok(self.chain().read_dynamic_field(blob_object_id, b"metadata").await?)
    }

    /// Upserts and removes attribute pairs on a blob object, creating the attribute field on
    /// first use.
    pub async fn write_blob_attributes(
        &self,
        blob_object_id: ObjectId,
        pairs: Vec<(String, String)>,
        remove_keys: Vec<String>,
    ) -> Result<(), WalrusClientError> {
        let existing = self.chain().read_dynamic_field(blob_object_id, b"metadata").await?;
        let mut tx = ProgrammableTransaction::new();
        contracts::write_blob_attributes(
            &self.config.package_config,
            blob_object_id,
            existing.is_none(),
            pairs,
            remove_keys,
        )(&mut tx);
        if tx.is_empty() {
            return Ok(());
        }
        self.chain().execute_transaction(tx).await?;
        Ok(())
    }

    /// Fresh (uncached) read of a blob object; blob objects mutate within a single write flow, so
    /// they bypass the loader cache.
    pub(crate) async fn fetch_blob_object(&self, object_id: ObjectId) -> Result<BlobObject, WalrusClientError> {
        let mut objects = self.chain().multi_get_objects(&[object_id]).await?;
        let data = objects
            .pop()
            .flatten()
            .ok_or(ChainClientError::ObjectNotFound { object_id })?;
        Ok(data.deserialize_as()?)
    }

    /// One communication handle per committee member we can build a client for. Members without a
    /// usable client simply contribute no tasks; their weight counts as unreachable.
    pub(crate) fn node_communications<'a>(&self, committee: &'a Committee) -> Vec<NodeCommunication<'a, F::Client>> {
        committee
            .members()
            .iter()
            .enumerate()
            .filter_map(|(index, member)| match self.factory.create_client(member) {
                Ok(client) => Some(NodeCommunication::new(index as u16, committee.epoch(), member, client)),
                Err(err) => {
                    warn!(
                        target: LOG_TARGET,
                        "Skipping node {}: cannot create a client: {}", member.node_id, err
                    );
                    None
                },
            })
            .collect()
    }
}
