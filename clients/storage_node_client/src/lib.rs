//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

mod error;
pub use error::StorageNodeClientError;
pub mod types;

use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use walrus_common_types::{BlobId, BlobPersistenceType, BlobStatus, SignedStorageConfirmation, Sliver, SliverPairIndex, SliverType};

use crate::types::{BlobMetadataWithId, GetConfirmationResponse};

/// Transport parameters applied to every request of a client. Deadlines are enforced here; the
/// dispatcher adds no timer of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageNodeClientOptions {
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for StorageNodeClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Stateless per-call HTTP client for a single storage node.
#[derive(Debug, Clone)]
pub struct StorageNodeClient {
    client: reqwest::Client,
    base_url: Url,
}

impl StorageNodeClient {
    /// Creates a client for the node reachable at `network_address` (`host:port`).
    pub fn connect(network_address: &str, options: &StorageNodeClientOptions) -> Result<Self, StorageNodeClientError> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self::with_client(client, Url::parse(&format!("https://{network_address}"))?))
    }

    /// Creates a client over an existing connection pool, so that one pool is shared across the
    /// clients of all committee members.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_metadata(&self, blob_id: &BlobId) -> Result<BlobMetadataWithId, StorageNodeClientError> {
        let url = self.endpoint(&format!("v1/metadata/{blob_id}"))?;
        let resp = check_response(self.client.get(url).send().await?).await?;
        json_body(resp).await
    }

    pub async fn store_metadata(&self, metadata: &BlobMetadataWithId) -> Result<(), StorageNodeClientError> {
        let url = self.endpoint(&format!("v1/metadata/{}", metadata.blob_id))?;
        check_response(self.client.put(url).json(metadata).send().await?).await?;
        Ok(())
    }

    pub async fn get_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
    ) -> Result<Sliver, StorageNodeClientError> {
        let url = self.endpoint(&format!("v1/slivers/{blob_id}/{pair_index}/{sliver_type}"))?;
        let resp = check_response(self.client.get(url).send().await?).await?;
        let bytes = resp.bytes().await?;
        Ok(Sliver::new(bytes.to_vec()))
    }

    pub async fn store_sliver(
        &self,
        blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
        sliver: &Sliver,
    ) -> Result<(), StorageNodeClientError> {
        let url = self.endpoint(&format!("v1/slivers/{blob_id}/{pair_index}/{sliver_type}"))?;
        check_response(self.client.put(url).body(sliver.data.clone()).send().await?).await?;
        Ok(())
    }

    pub async fn get_blob_status(&self, blob_id: &BlobId) -> Result<BlobStatus, StorageNodeClientError> {
        let url = self.endpoint(&format!("v1/status/{blob_id}"))?;
        let resp = check_response(self.client.get(url).send().await?).await?;
        json_body(resp).await
    }

    /// Requests the node's signed confirmation that it stored the blob. For deletable blobs the
    /// confirmation is bound to the owning object.
    pub async fn get_confirmation(
        &self,
        blob_id: &BlobId,
        persistence: &BlobPersistenceType,
    ) -> Result<SignedStorageConfirmation, StorageNodeClientError> {
        let mut url = self.endpoint(&format!("v1/confirmations/{blob_id}"))?;
        if let BlobPersistenceType::Deletable { object_id } = persistence {
            url.query_pairs_mut().append_pair("objectId", &object_id.to_string());
        }
        let resp = check_response(self.client.get(url).send().await?).await?;
        let confirmation: GetConfirmationResponse = json_body(resp).await?;
        Ok(confirmation.signed)
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageNodeClientError> {
        Ok(self.base_url.join(path)?)
    }
}

async fn check_response(resp: Response) -> Result<Response, StorageNodeClientError> {
    match resp.status() {
        status if status.is_success() => Ok(resp),
        StatusCode::NOT_FOUND => Err(StorageNodeClientError::NotFound),
        StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => Err(StorageNodeClientError::LegallyUnavailable),
        status => {
            let details = resp.text().await.unwrap_or_default();
            Err(StorageNodeClientError::UnexpectedStatus { status, details })
        },
    }
}

async fn json_body<T: for<'de> Deserialize<'de>>(resp: Response) -> Result<T, StorageNodeClientError> {
    resp.json().await.map_err(|e| StorageNodeClientError::InvalidResponse {
        message: e.to_string(),
    })
}
