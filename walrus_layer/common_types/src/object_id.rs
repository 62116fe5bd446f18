//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{fmt, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Identifier of an on-chain object.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(#[serde_as(as = "serde_with::hex::Hex")] [u8; ObjectId::LENGTH]);

impl ObjectId {
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

    pub fn from_hex(hex_str: &str) -> Result<Self, ObjectIdParseError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = ObjectIdParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array = <[u8; Self::LENGTH]>::try_from(bytes).map_err(|_| ObjectIdParseError::InvalidLength {
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectIdParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid byte length {actual}, expected {}", ObjectId::LENGTH)]
    InvalidLength { actual: usize },
}
