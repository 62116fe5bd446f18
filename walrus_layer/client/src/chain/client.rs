//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use walrus_common_types::ObjectId;

use super::{error::ChainClientError, transaction::ProgrammableTransaction, types::TransactionEffects};

/// An on-chain object as returned by the RPC layer: its id plus the JSON rendering of its Move
/// contents. Typed views deserialize from `contents`.
#[derive(Debug, Clone)]
pub struct ChainObjectData {
    pub object_id: ObjectId,
    pub contents: serde_json::Value,
}

impl ChainObjectData {
    pub fn deserialize_as<T: DeserializeOwned>(&self) -> Result<T, ChainClientError> {
        serde_json::from_value(self.contents.clone()).map_err(|e| ChainClientError::InvalidObject {
            object_id: self.object_id,
            details: e.to_string(),
        })
    }
}

/// The chain collaborator seam: object reads, dynamic-field reads and transaction execution.
/// Object reads should normally go through [`super::ObjectLoader`], which batches and caches
/// calls to [`ChainReader::multi_get_objects`].
#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    /// Fetches the current version of each object; `None` for objects that do not exist.
    async fn multi_get_objects(&self, ids: &[ObjectId]) -> Result<Vec<Option<ChainObjectData>>, ChainClientError>;

    /// Reads the dynamic field of `parent` named by the raw `name` bytes, if present.
    async fn read_dynamic_field(
        &self,
        parent: ObjectId,
        name: &[u8],
    ) -> Result<Option<BTreeMap<String, String>>, ChainClientError>;

    /// Signs and executes the transaction, waiting for its effects.
    async fn execute_transaction(
        &self,
        transaction: ProgrammableTransaction,
    ) -> Result<TransactionEffects, ChainClientError>;
}
