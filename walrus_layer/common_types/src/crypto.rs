//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{fmt, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub const BLS_PUBLIC_KEY_LENGTH: usize = 48;
pub const BLS_SIGNATURE_LENGTH: usize = 96;

/// A BLS12-381 min-pk public key, kept as raw bytes. The curve arithmetic lives behind the codec
/// seam.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsPublicKey(#[serde_as(as = "serde_with::hex::Hex")] [u8; BLS_PUBLIC_KEY_LENGTH]);

impl BlsPublicKey {
    pub const fn new(bytes: [u8; BLS_PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A BLS12-381 min-pk signature (possibly aggregated), kept as raw bytes.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsSignature(#[serde_as(as = "serde_with::hex::Hex")] [u8; BLS_SIGNATURE_LENGTH]);

impl BlsSignature {
    pub const fn new(bytes: [u8; BLS_SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BlsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
