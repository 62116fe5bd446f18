//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use log::*;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use walrus_common_types::ObjectId;

use super::{
    client::{ChainObjectData, ChainReader},
    error::ChainClientError,
};

const LOG_TARGET: &str = "walrus::client::chain::object_loader";

type LoadResult = Result<Option<ChainObjectData>, ChainClientError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Deduplicating, coalescing loader over chain object reads.
///
/// Loads enqueued within the same scheduler tick are flushed as a single
/// [`ChainReader::multi_get_objects`] call; concurrent loads of the same id share one in-flight
/// request, and resolved objects stay cached until [`ObjectLoader::reset`].
pub struct ObjectLoader<C> {
    reader: Arc<C>,
    inner: Arc<Mutex<LoaderInner>>,
}

struct LoaderInner {
    cache: HashMap<ObjectId, SharedLoad>,
    batch: Vec<(ObjectId, oneshot::Sender<LoadResult>)>,
}

impl<C> Clone for ObjectLoader<C> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<C: ChainReader> ObjectLoader<C> {
    pub fn new(reader: Arc<C>) -> Self {
        Self {
            reader,
            inner: Arc::new(Mutex::new(LoaderInner {
                cache: HashMap::new(),
                batch: Vec::new(),
            })),
        }
    }

    pub fn reader(&self) -> &Arc<C> {
        &self.reader
    }

    pub async fn load(&self, object_id: ObjectId) -> LoadResult {
        self.enqueue(object_id).await
    }

    /// Loads an object that must exist and deserializes its contents.
    pub async fn load_existing<T: DeserializeOwned>(&self, object_id: ObjectId) -> Result<T, ChainClientError> {
        let data = self
            .load(object_id)
            .await?
            .ok_or(ChainClientError::ObjectNotFound { object_id })?;
        data.deserialize_as()
    }

    /// Drops all cached and pending entries. Waiters of an in-flight batch still receive their
    /// results.
    pub fn reset(&self) {
        self.inner.lock().unwrap().cache.clear();
    }

    fn enqueue(&self, object_id: ObjectId) -> SharedLoad {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.cache.get(&object_id) {
            return existing.clone();
        }

        let (result_tx, result_rx) = oneshot::channel();
        let starts_batch = inner.batch.is_empty();
        inner.batch.push((object_id, result_tx));
        let load: SharedLoad = result_rx
            .map(|received| match received {
                Ok(result) => result,
                Err(_) => Err(ChainClientError::Rpc {
                    details: "object loader batch was dropped".to_string(),
                }),
            })
            .boxed()
            .shared();
        inner.cache.insert(object_id, load.clone());

        if starts_batch {
            // One flush task per batch; it runs after the current tick so that loads issued in
            // the meantime coalesce into the same RPC.
            let reader = self.reader.clone();
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                Self::flush(reader, inner).await;
            });
        }
        load
    }

    async fn flush(reader: Arc<C>, inner: Arc<Mutex<LoaderInner>>) {
        let batch = std::mem::take(&mut inner.lock().unwrap().batch);
        if batch.is_empty() {
            return;
        }
        let ids = batch.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        debug!(target: LOG_TARGET, "Fetching {} object(s) in one batch", ids.len());
        match reader.multi_get_objects(&ids).await {
            Ok(objects) if objects.len() == batch.len() => {
                for ((_, result_tx), object) in batch.into_iter().zip(objects) {
                    let _ignore = result_tx.send(Ok(object));
                }
            },
            Ok(objects) => {
                warn!(
                    target: LOG_TARGET,
                    "Chain returned {} objects for a batch of {}",
                    objects.len(),
                    batch.len()
                );
                for (_, result_tx) in batch {
                    let _ignore = result_tx.send(Err(ChainClientError::Rpc {
                        details: "object batch result count mismatch".to_string(),
                    }));
                }
            },
            Err(err) => {
                for (_, result_tx) in batch {
                    let _ignore = result_tx.send(Err(err.clone()));
                }
            },
        }
    }
}
