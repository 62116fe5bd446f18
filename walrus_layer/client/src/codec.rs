//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Seam to the native erasure-coding, metadata-hashing and BLS primitives. The client core never
//! touches symbol or curve arithmetic itself.

use walrus_common_types::{BlobId, BlsPublicKey, BlsSignature, ShardIndex, SignedStorageConfirmation, Sliver, SliverPair};
use walrus_storage_node_client::types::{BlobMetadata, BlobMetadataWithId};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Encoding failed: {details}")]
    EncodingFailed { details: String },
    #[error("Decoding failed: {details}")]
    DecodingFailed { details: String },
    #[error("Signature aggregation failed: {details}")]
    SignatureAggregation { details: String },
}

/// The full encoding of a blob: one sliver pair per shard plus the metadata committing to them.
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub blob_id: BlobId,
    pub root_hash: [u8; 32],
    pub metadata: BlobMetadata,
    pub sliver_pairs: Vec<SliverPair>,
}

/// The output of aggregating a quorum of storage confirmations.
#[derive(Debug, Clone)]
pub struct AggregateConfirmation {
    pub signature: BlsSignature,
    pub signer_indices: Vec<u16>,
    pub message: Vec<u8>,
}

pub trait BlobCodec: Send + Sync + 'static {
    /// The number of source symbols of the primary encoding; reconstruction needs this many
    /// distinct primary slivers.
    fn n_primary_source_symbols(&self, n_shards: u16) -> u16;

    /// The on-disk size of the fully encoded blob, used for storage pricing.
    fn encoded_blob_length(&self, n_shards: u16, unencoded_length: u64) -> u64;

    fn encode_blob(&self, n_shards: u16, bytes: &[u8]) -> Result<EncodedBlob, CodecError>;

    /// Reconstructs the blob bytes from at least `n_primary_source_symbols` distinct primary
    /// slivers, keyed by the shard they were read from.
    fn decode_primary_slivers(
        &self,
        blob_id: &BlobId,
        n_shards: u16,
        unencoded_length: u64,
        slivers: &[(ShardIndex, Sliver)],
    ) -> Result<Vec<u8>, CodecError>;

    /// Re-encodes `bytes` far enough to derive the metadata and blob id they commit to.
    fn compute_metadata(&self, n_shards: u16, bytes: &[u8]) -> Result<BlobMetadataWithId, CodecError>;

    /// Derives the blob id a metadata record commits to, for verifying served metadata.
    fn metadata_blob_id(&self, metadata: &BlobMetadata) -> Result<BlobId, CodecError>;

    /// BLS12-381 min-pk verification of a node's confirmation signature.
    fn verify_confirmation(&self, public_key: &BlsPublicKey, message: &[u8], signature: &BlsSignature) -> bool;

    /// Aggregates verified confirmations (keyed by committee member index) into one signature
    /// over their common message.
    fn combine_signatures(
        &self,
        confirmations: &[(u16, SignedStorageConfirmation)],
    ) -> Result<AggregateConfirmation, CodecError>;
}
