//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::SliverPairIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliverType {
    Primary,
    Secondary,
}

impl Display for SliverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliverType::Primary => write!(f, "primary"),
            SliverType::Secondary => write!(f, "secondary"),
        }
    }
}

/// One erasure-coded chunk of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sliver {
    pub data: Vec<u8>,
}

impl Sliver {
    pub fn new<T: Into<Vec<u8>>>(data: T) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Sliver {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// The primary and secondary sliver produced for one pair index of an encoded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliverPair {
    pub pair_index: SliverPairIndex,
    pub primary: Sliver,
    pub secondary: Sliver,
}

impl SliverPair {
    pub fn index(&self) -> SliverPairIndex {
        self.pair_index
    }
}
