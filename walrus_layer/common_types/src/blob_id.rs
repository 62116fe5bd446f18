//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{fmt, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Content-derived identifier of a blob: the Merkle root over the encoded sliver hashes for a
/// fixed number of shards.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlobId(#[serde_as(as = "serde_with::hex::Hex")] [u8; BlobId::LENGTH]);

impl BlobId {
    pub const LENGTH: usize = 32;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_array(self) -> [u8; Self::LENGTH] {
        self.0
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, BlobIdParseError> {
        let bytes = hex::decode(hex_str)?;
        Self::try_from(bytes.as_slice())
    }

    /// The rotation applied to the sliver pair index to obtain the shard index: the blob id
    /// interpreted as a big-endian integer, reduced modulo `n_shards`.
    ///
    /// Rotating by the blob id spreads consecutive pair indices of different blobs over different
    /// shards.
    pub fn rotation(&self, n_shards: u16) -> u16 {
        if n_shards == 0 {
            return 0;
        }
        let n = u32::from(n_shards);
        let mut acc = 0u32;
        for byte in self.0 {
            acc = ((acc << 8) | u32::from(byte)) % n;
        }
        acc as u16
    }
}

impl TryFrom<&[u8]> for BlobId {
    type Error = BlobIdParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array = <[u8; Self::LENGTH]>::try_from(bytes).map_err(|_| BlobIdParseError::InvalidLength {
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl FromStr for BlobId {
    type Err = BlobIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobIdParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid byte length {actual}, expected {}", BlobId::LENGTH)]
    InvalidLength { actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let id = BlobId::new([7u8; 32]);
        let parsed = BlobId::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rotation_is_always_less_than_n_shards() {
        let mut bytes = [0u8; 32];
        for i in 0..32 {
            bytes[i] = (i as u8).wrapping_mul(37);
        }
        let id = BlobId::new(bytes);
        for n_shards in [1u16, 2, 3, 10, 100, 101, 1000, u16::MAX] {
            assert!(id.rotation(n_shards) < n_shards);
        }
    }

    #[test]
    fn rotation_matches_big_endian_residue_for_small_values() {
        let mut bytes = [0u8; 32];
        bytes[30] = 0x01;
        bytes[31] = 0x02;
        // Value is 258.
        let id = BlobId::new(bytes);
        assert_eq!(id.rotation(100), 58);
        assert_eq!(id.rotation(1000), 258);
    }
}
