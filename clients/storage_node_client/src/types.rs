//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use walrus_common_types::{BlobId, SignedStorageConfirmation};

pub const ENCODING_TYPE_RED_STUFF: u8 = 1;

/// The per-pair sliver digests committed to by the blob id.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliverPairDigests {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub primary_hash: [u8; 32],
    #[serde_as(as = "serde_with::hex::Hex")]
    pub secondary_hash: [u8; 32],
}

/// Blob metadata as stored on and served by storage nodes. One digest pair per shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub encoding_type: u8,
    pub unencoded_length: u64,
    pub pair_digests: Vec<SliverPairDigests>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadataWithId {
    pub blob_id: BlobId,
    pub metadata: BlobMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetConfirmationResponse {
    pub signed: SignedStorageConfirmation,
}
