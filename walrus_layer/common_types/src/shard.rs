//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::BlobId;

/// An index in `[0, n_shards)` identifying one logical bucket of the committee's shard
/// assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardIndex(pub u16);

/// The index of a sliver pair within an encoded blob.
///
/// The pair at index `p` is stored on the shard obtained by rotating `p` by the blob id; see
/// [`SliverPairIndex::to_shard_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliverPairIndex(pub u16);

impl ShardIndex {
    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Inverse of [`SliverPairIndex::to_shard_index`] for the same `(blob_id, n_shards)`.
    pub fn to_pair_index(self, n_shards: u16, blob_id: &BlobId) -> SliverPairIndex {
        let rotation = u32::from(blob_id.rotation(n_shards));
        let shifted = (u32::from(self.0) + u32::from(n_shards) - rotation) % u32::from(n_shards);
        SliverPairIndex(shifted as u16)
    }

    pub fn range(n_shards: u16) -> impl Iterator<Item = ShardIndex> {
        (0..n_shards).map(ShardIndex)
    }
}

impl SliverPairIndex {
    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn to_shard_index(self, n_shards: u16, blob_id: &BlobId) -> ShardIndex {
        let rotation = u32::from(blob_id.rotation(n_shards));
        let shifted = (u32::from(self.0) + rotation) % u32::from(n_shards);
        ShardIndex(shifted as u16)
    }
}

impl From<u16> for ShardIndex {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl From<u16> for SliverPairIndex {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl Display for ShardIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SliverPairIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
