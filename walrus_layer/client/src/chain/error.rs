//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use walrus_common_types::ObjectId;

/// Errors from the chain transport. `Clone` so the coalescing object loader can hand one failure
/// to every waiter of a batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainClientError {
    #[error("Chain RPC error: {details}")]
    Rpc { details: String },
    #[error("Object {object_id} not found on chain")]
    ObjectNotFound { object_id: ObjectId },
    #[error("Object {object_id} has unexpected contents: {details}")]
    InvalidObject { object_id: ObjectId, details: String },
    #[error("Transaction execution failed: {details}")]
    ExecutionFailed { details: String },
}
