//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

mod blob_id;
pub use blob_id::{BlobId, BlobIdParseError};

mod blob_status;
pub use blob_status::BlobStatus;

pub mod committee;
pub use committee::{is_quorum_weight, is_validity_weight, Committee, CommitteeMember, InvalidCommittee};

pub mod crypto;
pub use crypto::{BlsPublicKey, BlsSignature};

mod epoch;
pub use epoch::Epoch;

pub mod messages;
pub use messages::{BlobPersistenceType, SignedStorageConfirmation};

mod object_id;
pub use object_id::{ObjectId, ObjectIdParseError};

mod shard;
pub use shard::{ShardIndex, SliverPairIndex};

mod sliver;
pub use sliver::{Sliver, SliverPair, SliverType};
