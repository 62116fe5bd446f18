//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Client core for the Walrus decentralized blob store.
//!
//! A blob is erasure-coded into per-shard slivers and spread over a Byzantine-fault-tolerant
//! committee of storage nodes, with registration and certification recorded on chain. This crate
//! implements the client side of that protocol: committee materialization and epoch-aware
//! routing, the shard-weighted quorum dispatch engine, and the read and write paths composed on
//! top of it. The erasure codec, the BLS primitives, and the chain transport are collaborator
//! seams ([`codec::BlobCodec`], [`chain::ChainReader`]).

pub mod chain;
mod client;
pub use client::WalrusClient;
pub mod codec;
mod committee;
pub use committee::CommitteeService;
pub mod communication;
mod config;
pub use config::{Network, WalrusClientConfig, WalrusPackageConfig};
pub mod dispatch;
mod error;
pub use error::WalrusClientError;
mod read;
mod write;
pub use write::{BlobWriteReceipt, WriteBlobOptions};
