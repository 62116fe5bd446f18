//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use newtype_ops::newtype_ops;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Epoch(pub u32);

impl Epoch {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn saturating_sub(&self, other: Epoch) -> Epoch {
        Epoch(self.0.saturating_sub(other.0))
    }

    pub fn checked_sub(&self, other: Epoch) -> Option<Epoch> {
        self.0.checked_sub(other.0).map(Epoch)
    }
}

impl From<u32> for Epoch {
    fn from(e: u32) -> Self {
        Self(e)
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

newtype_ops! { [Epoch] {add sub} {:=} Self Self }
newtype_ops! { [Epoch] {add sub} {:=} &Self &Self }
newtype_ops! { [Epoch] {add sub} {:=} Self &Self }
