//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use walrus_common_types::{BlobId, Epoch, InvalidCommittee};

use crate::{chain::ChainClientError, codec::CodecError};

/// The closed error set surfaced by client operations.
///
/// Node-transport errors are classified inside the quorum dispatcher and never escape directly;
/// only the aggregate classifications below do.
#[derive(Debug, thiserror::Error)]
pub enum WalrusClientError {
    #[error("Client view is stale: blob certified at epoch {certified_epoch} but the client sees {client_epoch}")]
    BehindCurrentEpoch {
        certified_epoch: Epoch,
        client_epoch: Epoch,
    },
    #[error("A quorum of the committee does not hold blob {blob_id}")]
    BlobNotCertified { blob_id: BlobId },
    #[error("A quorum of the committee refuses to serve blob {blob_id}")]
    BlobBlocked { blob_id: BlobId },
    #[error("Decoded blob re-hashes to {computed} instead of {blob_id}")]
    InconsistentBlob { blob_id: BlobId, computed: BlobId },
    #[error("Received {received} of the {required} slivers required to reconstruct blob {blob_id}")]
    NotEnoughSliversReceived {
        blob_id: BlobId,
        received: usize,
        required: usize,
    },
    #[error("No node returned metadata for blob {blob_id}")]
    NoBlobMetadataReceived { blob_id: BlobId },
    #[error("No node returned a status for blob {blob_id}")]
    NoBlobStatusReceived { blob_id: BlobId },
    #[error("No status for blob {blob_id} is backed by a validity weight of shards")]
    NoVerifiedBlobStatusReceived { blob_id: BlobId },
    #[error(
        "Gathered {confirmed_weight} of the {required_weight} confirmation weight required to certify blob {blob_id}"
    )]
    NotEnoughBlobConfirmations {
        blob_id: BlobId,
        confirmed_weight: usize,
        required_weight: usize,
    },
    #[error("Operation aborted by the caller")]
    UserAborted,
    #[error("Chain client error: {0}")]
    ChainClient(#[from] ChainClientError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Invalid committee on chain: {0}")]
    InvalidCommittee(#[from] InvalidCommittee),
    #[error("Invalid client configuration: {details}")]
    InvalidConfiguration { details: String },
    #[error("Unexpected chain response: {details}")]
    UnexpectedChainResponse { details: String },
}

impl WalrusClientError {
    /// A retryable error indicates a stale committee view; the read path resets the caches and
    /// retries exactly once.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalrusClientError::BehindCurrentEpoch { .. })
    }
}
