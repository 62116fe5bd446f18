//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! The read path: verified status, committee selection, metadata, slivers, decode, verify.

use std::collections::{HashMap, VecDeque};

use futures::FutureExt;
use log::*;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use walrus_common_types::{is_validity_weight, BlobId, BlobStatus, Committee, ShardIndex, Sliver};
use walrus_storage_node_client::types::BlobMetadataWithId;

use crate::{
    chain::ChainReader,
    client::WalrusClient,
    codec::BlobCodec,
    communication::NodeClientFactory,
    dispatch::{
        weighted_shuffle,
        Acceptance,
        DispatchOptions,
        DispatchOutcome,
        DispatchTask,
        QuorumDispatcher,
        Required,
    },
    error::WalrusClientError,
};

const LOG_TARGET: &str = "walrus::client::read";

impl<C, F, Cd> WalrusClient<C, F, Cd>
where
    C: ChainReader,
    F: NodeClientFactory,
    Cd: BlobCodec,
{
    /// Reads and reconstructs a blob, verifying that the decoded bytes re-hash to its id.
    ///
    /// A stale committee view (certified ahead of the client's epoch) resets the caches and
    /// retries exactly once; every other failure is terminal.
    pub async fn read_blob(&self, blob_id: &BlobId) -> Result<Vec<u8>, WalrusClientError> {
        self.read_blob_with_cancellation(blob_id, CancellationToken::new()).await
    }

    pub async fn read_blob_with_cancellation(
        &self,
        blob_id: &BlobId,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, WalrusClientError> {
        match self.read_blob_once(blob_id, &cancel).await {
            Err(err) if err.is_retryable() => {
                info!(
                    target: LOG_TARGET,
                    "Stale view while reading {} ({}); resetting caches and retrying once", blob_id, err
                );
                self.reset().await;
                self.read_blob_once(blob_id, &cancel).await
            },
            other => other,
        }
    }

    async fn read_blob_once(&self, blob_id: &BlobId, cancel: &CancellationToken) -> Result<Vec<u8>, WalrusClientError> {
        let status = self.verified_blob_status(blob_id, cancel).await?;
        let committee = self.committees().read_committee(&status).await?;
        let n_shards = committee.n_shards();

        let metadata = self.retrieve_metadata(&committee, blob_id, cancel).await?;
        let slivers = self.retrieve_slivers(&committee, blob_id, cancel).await?;

        let bytes = self
            .codec()
            .decode_primary_slivers(blob_id, n_shards, metadata.metadata.unencoded_length, &slivers)?;
        let rehashed = self.codec().compute_metadata(n_shards, &bytes)?;
        if rehashed.blob_id != *blob_id {
            return Err(WalrusClientError::InconsistentBlob {
                blob_id: *blob_id,
                computed: rehashed.blob_id,
            });
        }
        debug!(
            target: LOG_TARGET,
            "Read blob {} ({} bytes) from the epoch {} committee",
            blob_id,
            bytes.len(),
            committee.epoch()
        );
        Ok(bytes)
    }

    /// The blob status a validity weight of shards agrees on, preferring later lifecycle states.
    pub async fn get_verified_blob_status(&self, blob_id: &BlobId) -> Result<BlobStatus, WalrusClientError> {
        self.verified_blob_status(blob_id, &CancellationToken::new()).await
    }

    pub(crate) async fn verified_blob_status(
        &self,
        blob_id: &BlobId,
        cancel: &CancellationToken,
    ) -> Result<BlobStatus, WalrusClientError> {
        let committee = self.committees().active_committee().await?;
        let n_shards = committee.n_shards();
        let comms = self.node_communications(&committee);

        let tasks = comms
            .iter()
            .map(|comm| DispatchTask {
                node_index: comm.node_index,
                weight: comm.weight(),
                future: comm.blob_status(blob_id).boxed(),
            })
            .collect::<Vec<_>>();
        let n_tasks = tasks.len();
        let min_validity = usize::from(n_shards) / 3 + 1;

        let mut weight_by_status = HashMap::<BlobStatus, usize>::new();
        // The weight floor only scopes the exhaustion check: disagreeing statuses must not be
        // able to complete the dispatch by their sum, so the run drains until a single status
        // reaches validity (accept returns Done) or every node has answered.
        let dispatcher = QuorumDispatcher::new(n_shards, DispatchOptions {
            drain: true,
            ..DispatchOptions::all_fanout(n_tasks)
        });
        let outcome = dispatcher
            .run(tasks, Required::Weight(min_validity), cancel, |(weight, status)| {
                let agreeing = weight_by_status.entry(*status).or_insert(0);
                *agreeing += *weight;
                if is_validity_weight(*agreeing, n_shards) {
                    Acceptance::Done
                } else {
                    Acceptance::Keep
                }
            })
            .await;

        match outcome {
            DispatchOutcome::Complete(_) | DispatchOutcome::Insufficient(_) => {
                let verified = weight_by_status
                    .iter()
                    .filter(|(_, weight)| is_validity_weight(**weight, n_shards))
                    .max_by_key(|(status, weight)| (status.lifecycle_rank(), **weight))
                    .map(|(status, _)| *status);
                match verified {
                    Some(status) => {
                        debug!(target: LOG_TARGET, "Verified status of blob {}: {:?}", blob_id, status);
                        Ok(status)
                    },
                    None if weight_by_status.is_empty() => {
                        Err(WalrusClientError::NoBlobStatusReceived { blob_id: *blob_id })
                    },
                    None => Err(WalrusClientError::NoVerifiedBlobStatusReceived { blob_id: *blob_id }),
                }
            },
            DispatchOutcome::NotCertified => Err(WalrusClientError::BlobNotCertified { blob_id: *blob_id }),
            DispatchOutcome::Blocked => Err(WalrusClientError::BlobBlocked { blob_id: *blob_id }),
            DispatchOutcome::Aborted => Err(WalrusClientError::UserAborted),
        }
    }

    /// First-success metadata retrieval: probe one node in random order, fan the rest out on
    /// failure.
    async fn retrieve_metadata(
        &self,
        committee: &Committee,
        blob_id: &BlobId,
        cancel: &CancellationToken,
    ) -> Result<BlobMetadataWithId, WalrusClientError> {
        let mut comms = self.node_communications(committee);
        comms.shuffle(&mut rand::thread_rng());
        let codec = self.codec();

        let tasks = comms
            .iter()
            .map(|comm| DispatchTask {
                node_index: comm.node_index,
                weight: comm.weight(),
                future: comm.retrieve_verified_metadata(codec, blob_id).boxed(),
            })
            .collect::<Vec<_>>();
        let dispatcher = QuorumDispatcher::new(committee.n_shards(), DispatchOptions {
            concurrency: self.config().max_concurrent_node_requests,
            conserve_requests: false,
            probe_first: true,
            drain: false,
        });

        match dispatcher
            .run(tasks, Required::Count(1), cancel, |_| Acceptance::Done)
            .await
        {
            DispatchOutcome::Complete(results) => results
                .into_iter()
                .next()
                .ok_or(WalrusClientError::NoBlobMetadataReceived { blob_id: *blob_id }),
            DispatchOutcome::NotCertified => Err(WalrusClientError::BlobNotCertified { blob_id: *blob_id }),
            DispatchOutcome::Blocked => Err(WalrusClientError::BlobBlocked { blob_id: *blob_id }),
            DispatchOutcome::Aborted => Err(WalrusClientError::UserAborted),
            DispatchOutcome::Insufficient(_) => Err(WalrusClientError::NoBlobMetadataReceived { blob_id: *blob_id }),
        }
    }

    /// Column-wise sliver retrieval: nodes are weighted-shuffled and their shards interleaved so
    /// every round of requests draws from distinct nodes first; stops at the source-symbol count.
    async fn retrieve_slivers(
        &self,
        committee: &Committee,
        blob_id: &BlobId,
        cancel: &CancellationToken,
    ) -> Result<Vec<(ShardIndex, Sliver)>, WalrusClientError> {
        let n_shards = committee.n_shards();
        let required = usize::from(self.codec().n_primary_source_symbols(n_shards));
        let comms = self.node_communications(committee);

        let ordered = weighted_shuffle(
            &mut rand::thread_rng(),
            comms.iter().map(|comm| (comm.weight(), comm)).collect(),
        );
        let mut shard_queues = ordered
            .iter()
            .map(|comm| comm.member.shard_indices.iter().copied().collect::<VecDeque<_>>())
            .collect::<Vec<_>>();

        let mut tasks = Vec::with_capacity(usize::from(n_shards));
        loop {
            let mut any_left = false;
            for (comm, queue) in ordered.iter().zip(shard_queues.iter_mut()) {
                if let Some(shard) = queue.pop_front() {
                    any_left = true;
                    tasks.push(DispatchTask {
                        node_index: comm.node_index,
                        weight: 1,
                        future: comm.retrieve_sliver(blob_id, shard, n_shards).boxed(),
                    });
                }
            }
            if !any_left {
                break;
            }
        }

        let dispatcher = QuorumDispatcher::new(n_shards, DispatchOptions {
            concurrency: self.config().max_concurrent_node_requests,
            conserve_requests: true,
            probe_first: false,
            drain: false,
        });
        match dispatcher
            .run(tasks, Required::Count(required), cancel, |_| Acceptance::Keep)
            .await
        {
            DispatchOutcome::Complete(slivers) => {
                debug!(
                    target: LOG_TARGET,
                    "Collected {} primary slivers for blob {}",
                    slivers.len(),
                    blob_id
                );
                Ok(slivers)
            },
            DispatchOutcome::NotCertified => Err(WalrusClientError::BlobNotCertified { blob_id: *blob_id }),
            DispatchOutcome::Blocked => Err(WalrusClientError::BlobBlocked { blob_id: *blob_id }),
            DispatchOutcome::Aborted => Err(WalrusClientError::UserAborted),
            DispatchOutcome::Insufficient(partial) => Err(WalrusClientError::NotEnoughSliversReceived {
                blob_id: *blob_id,
                received: partial.len(),
                required,
            }),
        }
    }
}
