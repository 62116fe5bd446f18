//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use reqwest::StatusCode;

/// The transport error taxonomy consumed by the quorum dispatcher. No other node error semantics
/// leak upward.
#[derive(Debug, thiserror::Error)]
pub enum StorageNodeClientError {
    #[error("Node replied that it does not have the requested object")]
    NotFound,
    #[error("Node refuses to serve the requested object")]
    LegallyUnavailable,
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Node returned unexpected status {status}: {details}")]
    UnexpectedStatus { status: StatusCode, details: String },
    #[error("Node sent invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("Invalid node URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl StorageNodeClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageNodeClientError::NotFound)
    }

    pub fn is_legally_unavailable(&self) -> bool {
        matches!(self, StorageNodeClientError::LegallyUnavailable)
    }
}
