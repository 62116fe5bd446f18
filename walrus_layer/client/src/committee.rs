//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use log::*;
use tokio::sync::{OnceCell, RwLock};
use walrus_common_types::{BlobStatus, Committee, CommitteeMember, Epoch};

use crate::{
    chain::{
        types::{CommitteeEntry, EpochState, StakingPool, StakingState, SystemState},
        ChainClientError,
        ChainReader,
        ObjectLoader,
    },
    config::WalrusPackageConfig,
    error::WalrusClientError,
};

const LOG_TARGET: &str = "walrus::client::committee";

type CommitteeCell = RwLock<Arc<OnceCell<Arc<Committee>>>>;

/// Materializes indexed committees from on-chain staking state and memoizes them per epoch view.
///
/// Concurrent callers of an unmaterialized committee share one in-flight materialization; the
/// cell is swapped out wholesale by [`CommitteeService::reset`], so no lock is held across an
/// await on the read path.
pub struct CommitteeService<C> {
    loader: ObjectLoader<C>,
    package_config: WalrusPackageConfig,
    active: CommitteeCell,
    previous: RwLock<Arc<OnceCell<Option<Arc<Committee>>>>>,
}

impl<C: ChainReader> CommitteeService<C> {
    pub fn new(loader: ObjectLoader<C>, package_config: WalrusPackageConfig) -> Self {
        Self {
            loader,
            package_config,
            active: RwLock::new(Arc::new(OnceCell::new())),
            previous: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    pub async fn system_state(&self) -> Result<SystemState, ChainClientError> {
        self.loader.load_existing(self.package_config.system_object_id).await
    }

    pub async fn staking_state(&self) -> Result<StakingState, ChainClientError> {
        self.loader.load_existing(self.package_config.staking_object_id).await
    }

    /// The committee of the current epoch.
    pub async fn active_committee(&self) -> Result<Arc<Committee>, WalrusClientError> {
        let cell = self.active.read().await.clone();
        cell.get_or_try_init(|| async {
            let staking = self.staking_state().await?;
            let committee = self.materialize(staking.epoch, &staking.committee).await?;
            Ok::<_, WalrusClientError>(Arc::new(committee))
        })
        .await
        .cloned()
    }

    /// The committee of the previous epoch, if the chain still exposes one.
    pub async fn previous_committee(&self) -> Result<Option<Arc<Committee>>, WalrusClientError> {
        let cell = self.previous.read().await.clone();
        cell.get_or_try_init(|| async {
            let staking = self.staking_state().await?;
            match &staking.previous_committee {
                Some(entries) => {
                    let epoch = staking.epoch.saturating_sub(Epoch(1));
                    let committee = self.materialize(epoch, entries).await?;
                    Ok::<_, WalrusClientError>(Some(Arc::new(committee)))
                },
                None => Ok(None),
            }
        })
        .await
        .cloned()
    }

    /// Selects the committee to read a blob from.
    ///
    /// During `EpochChangeSync` shards are still migrating, so a blob certified before the
    /// current epoch is authoritatively held by the previous committee. A blob certified ahead of
    /// the client's view means the view is stale; the caller resets and retries.
    pub async fn read_committee(&self, status: &BlobStatus) -> Result<Arc<Committee>, WalrusClientError> {
        let Some(certified_epoch) = status.initial_certified_epoch() else {
            return self.active_committee().await;
        };
        let staking = self.staking_state().await?;
        if certified_epoch > staking.epoch {
            return Err(WalrusClientError::BehindCurrentEpoch {
                certified_epoch,
                client_epoch: staking.epoch,
            });
        }
        if staking.epoch_state == EpochState::EpochChangeSync && certified_epoch < staking.epoch {
            debug!(
                target: LOG_TARGET,
                "Epoch change in progress; reading blob certified at epoch {} from the previous committee",
                certified_epoch
            );
            if let Some(previous) = self.previous_committee().await? {
                return Ok(previous);
            }
        }
        self.active_committee().await
    }

    /// Drops the memoized committees and the underlying object cache.
    pub async fn reset(&self) {
        *self.active.write().await = Arc::new(OnceCell::new());
        *self.previous.write().await = Arc::new(OnceCell::new());
        self.loader.reset();
    }

    async fn materialize(&self, epoch: Epoch, entries: &[CommitteeEntry]) -> Result<Committee, WalrusClientError> {
        let system = self.system_state().await?;
        // All pool loads are issued in one tick and coalesce into a single batched read.
        let pools = futures::future::try_join_all(
            entries
                .iter()
                .map(|entry| self.loader.load_existing::<StakingPool>(entry.pool_id)),
        )
        .await?;
        let members = entries
            .iter()
            .zip(pools)
            .map(|(entry, pool)| CommitteeMember {
                node_id: pool.node_id,
                public_key: pool.public_key,
                network_address: pool.network_address,
                shard_indices: entry.shard_indices.clone(),
            })
            .collect::<Vec<_>>();
        let committee = Committee::new(epoch, system.n_shards, members)?;
        info!(
            target: LOG_TARGET,
            "Materialized committee for epoch {} with {} members over {} shards",
            epoch,
            committee.len(),
            committee.n_shards()
        );
        Ok(committee)
    }
}
