//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{crypto::BlsSignature, BlobId, Epoch, ObjectId};

/// Intent byte of the blob certification message.
pub const BLOB_CERT_MSG: u8 = 1;

const PERMANENT_TAG: u8 = 0;
const DELETABLE_TAG: u8 = 1;

/// Whether a blob is stored permanently or tied to a deletable on-chain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlobPersistenceType {
    Permanent,
    #[serde(rename_all = "camelCase")]
    Deletable { object_id: ObjectId },
}

impl BlobPersistenceType {
    fn tag(&self) -> u8 {
        match self {
            BlobPersistenceType::Permanent => PERMANENT_TAG,
            BlobPersistenceType::Deletable { .. } => DELETABLE_TAG,
        }
    }
}

/// The canonical message a storage node signs to confirm it stored a blob.
///
/// Layout is byte-exact, the verifier reproduces and compares:
/// `[intent u8][epoch u32 LE][blob_id 32B][tag u8][object_id 32B, deletable only]`.
pub fn confirmation_message_bytes(epoch: Epoch, blob_id: &BlobId, persistence: &BlobPersistenceType) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + 4 + BlobId::LENGTH + 1 + ObjectId::LENGTH);
    bytes.push(BLOB_CERT_MSG);
    bytes.extend_from_slice(&epoch.to_le_bytes());
    bytes.extend_from_slice(blob_id.as_bytes());
    bytes.push(persistence.tag());
    if let BlobPersistenceType::Deletable { object_id } = persistence {
        bytes.extend_from_slice(object_id.as_bytes());
    }
    bytes
}

/// A storage node's signature over the canonical confirmation message.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedStorageConfirmation {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub serialized_message: Vec<u8>,
    pub signature: BlsSignature,
}
