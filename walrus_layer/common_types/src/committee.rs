//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::Serialize;

use crate::{crypto::BlsPublicKey, Epoch, ObjectId, ShardIndex};

/// Weighted quorum threshold: more than two thirds of the total shard weight.
pub fn is_quorum_weight(weight: usize, n_shards: u16) -> bool {
    3 * weight > 2 * usize::from(n_shards)
}

/// Weighted validity threshold: more than one third of the total shard weight, guaranteeing at
/// least one honest contributor.
pub fn is_validity_weight(weight: usize, n_shards: u16) -> bool {
    3 * weight > usize::from(n_shards)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitteeMember {
    pub node_id: ObjectId,
    pub public_key: BlsPublicKey,
    pub network_address: String,
    /// The shards assigned to this member for the committee's epoch, in assignment order.
    pub shard_indices: Vec<ShardIndex>,
}

impl CommitteeMember {
    /// The member's voting weight.
    pub fn weight(&self) -> usize {
        self.shard_indices.len()
    }
}

/// The storage node committee of one epoch, with the shard assignment indexed both ways.
///
/// Committees are immutable once materialized; an epoch change produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Committee {
    epoch: Epoch,
    n_shards: u16,
    members: Vec<CommitteeMember>,
    // member index per shard; always fully populated after `new` succeeds
    by_shard: Vec<u16>,
}

impl Committee {
    /// Builds the committee, validating that the members' shards partition `[0, n_shards)`.
    pub fn new(epoch: Epoch, n_shards: u16, members: Vec<CommitteeMember>) -> Result<Self, InvalidCommittee> {
        const UNASSIGNED: u16 = u16::MAX;
        let mut by_shard = vec![UNASSIGNED; usize::from(n_shards)];
        for (index, member) in members.iter().enumerate() {
            if member.shard_indices.is_empty() {
                return Err(InvalidCommittee::MemberWithoutShards { index });
            }
            for &shard in &member.shard_indices {
                if shard.as_usize() >= usize::from(n_shards) {
                    return Err(InvalidCommittee::ShardOutOfRange { shard, n_shards });
                }
                let slot = &mut by_shard[shard.as_usize()];
                if *slot != UNASSIGNED {
                    return Err(InvalidCommittee::DuplicateShard { shard });
                }
                *slot = index as u16;
            }
        }
        let n_unassigned = by_shard.iter().filter(|slot| **slot == UNASSIGNED).count();
        if n_unassigned > 0 {
            return Err(InvalidCommittee::UnassignedShards { n_unassigned, n_shards });
        }
        Ok(Self {
            epoch,
            n_shards,
            members,
            by_shard,
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn n_shards(&self) -> u16 {
        self.n_shards
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[CommitteeMember] {
        &self.members
    }

    pub fn member(&self, index: u16) -> Option<&CommitteeMember> {
        self.members.get(usize::from(index))
    }

    pub fn member_index_for_shard(&self, shard: ShardIndex) -> u16 {
        self.by_shard[shard.as_usize()]
    }

    pub fn member_for_shard(&self, shard: ShardIndex) -> &CommitteeMember {
        &self.members[usize::from(self.member_index_for_shard(shard))]
    }

    pub fn weight_of(&self, member_index: u16) -> usize {
        self.members
            .get(usize::from(member_index))
            .map(CommitteeMember::weight)
            .unwrap_or(0)
    }

    pub fn is_quorum(&self, weight: usize) -> bool {
        is_quorum_weight(weight, self.n_shards)
    }

    pub fn is_validity(&self, weight: usize) -> bool {
        is_validity_weight(weight, self.n_shards)
    }

    /// The smallest weight that satisfies [`Committee::is_quorum`].
    pub fn min_quorum_weight(&self) -> usize {
        2 * usize::from(self.n_shards) / 3 + 1
    }

    /// Encodes the signer set of an aggregated signature as a bitmap of `⌈members/8⌉` bytes.
    /// Bit `i` (little-endian within each byte) is set iff member `i` signed.
    pub fn signer_bitmap(&self, signer_indices: &[u16]) -> Vec<u8> {
        let mut bitmap = vec![0u8; (self.members.len() + 7) / 8];
        for &index in signer_indices {
            if usize::from(index) < self.members.len() {
                bitmap[usize::from(index) / 8] |= 1 << (index % 8);
            }
        }
        bitmap
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidCommittee {
    #[error("Shard {shard} is out of range for {n_shards} shards")]
    ShardOutOfRange { shard: ShardIndex, n_shards: u16 },
    #[error("Shard {shard} is assigned to more than one member")]
    DuplicateShard { shard: ShardIndex },
    #[error("{n_unassigned} of {n_shards} shards are unassigned")]
    UnassignedShards { n_unassigned: usize, n_shards: u16 },
    #[error("Member {index} has no shards assigned")]
    MemberWithoutShards { index: usize },
}
