//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};
use walrus_common_types::{BlobId, BlsPublicKey, Epoch, ObjectId, ShardIndex};

/// The phase of the epoch state machine. Only `EpochChangeSync` (shards still migrating between
/// committees) alters read routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EpochState {
    Normal,
    EpochChangeSync,
    EpochChangeDone,
}

/// The Walrus system object: global parameters and prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub epoch: Epoch,
    pub n_shards: u16,
    /// Price in WAL per storage unit per epoch.
    pub storage_price_per_unit_size: u64,
    /// One-off write price in WAL per storage unit.
    pub write_price_per_unit_size: u64,
}

/// One committee seat: the staking pool backing the node and the shards assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeEntry {
    pub pool_id: ObjectId,
    pub shard_indices: Vec<ShardIndex>,
}

/// The Walrus staking object: epoch phase and the current and previous shard assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingState {
    pub epoch: Epoch,
    pub epoch_state: EpochState,
    pub committee: Vec<CommitteeEntry>,
    pub previous_committee: Option<Vec<CommitteeEntry>>,
}

/// The node identity carried by a staking pool object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingPool {
    pub node_id: ObjectId,
    pub name: String,
    pub network_address: String,
    pub public_key: BlsPublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResource {
    pub id: ObjectId,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
    pub storage_size: u64,
}

/// The on-chain `Blob` object created by registration and completed by certification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    pub id: ObjectId,
    pub blob_id: BlobId,
    pub registered_epoch: Epoch,
    pub certified_epoch: Option<Epoch>,
    pub deletable: bool,
    pub size: u64,
    pub storage: StorageResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedObject {
    pub object_id: ObjectId,
    pub object_type: String,
}

/// The effects the chain reports for a successfully executed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub created: Vec<CreatedObject>,
}

impl TransactionEffects {
    /// The first created object whose Move type ends with `type_suffix` (e.g. `::blob::Blob`).
    pub fn created_object_of_type(&self, type_suffix: &str) -> Option<&CreatedObject> {
        self.created.iter().find(|object| object.object_type.ends_with(type_suffix))
    }
}
