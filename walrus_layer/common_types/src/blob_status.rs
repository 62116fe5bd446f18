//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

use crate::Epoch;

/// The lifecycle state of a blob as reported by a storage node.
///
/// Later lifecycle states outrank earlier ones when nodes disagree; see
/// [`BlobStatus::lifecycle_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlobStatus {
    Nonexistent,
    #[serde(rename_all = "camelCase")]
    Deletable {
        initial_certified_epoch: Option<Epoch>,
    },
    #[serde(rename_all = "camelCase")]
    Permanent {
        initial_certified_epoch: Option<Epoch>,
        end_epoch: Epoch,
    },
    Invalid,
}

impl BlobStatus {
    pub fn lifecycle_rank(&self) -> u8 {
        match self {
            BlobStatus::Nonexistent => 0,
            BlobStatus::Deletable { .. } => 1,
            BlobStatus::Permanent { .. } => 2,
            BlobStatus::Invalid => 3,
        }
    }

    pub fn initial_certified_epoch(&self) -> Option<Epoch> {
        match self {
            BlobStatus::Deletable {
                initial_certified_epoch,
            } |
            BlobStatus::Permanent {
                initial_certified_epoch,
                ..
            } => *initial_certified_epoch,
            BlobStatus::Nonexistent | BlobStatus::Invalid => None,
        }
    }

    pub fn is_certified(&self) -> bool {
        self.initial_certified_epoch().is_some()
    }
}
