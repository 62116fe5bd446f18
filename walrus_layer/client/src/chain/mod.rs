//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! The chain collaborator: typed views over on-chain objects, a coalescing object loader, and
//! the Move-call surface the client emits.

mod client;
pub use client::{ChainObjectData, ChainReader};

pub mod contracts;

mod error;
pub use error::ChainClientError;

mod object_loader;
pub use object_loader::ObjectLoader;

pub mod transaction;
pub use transaction::{CallArg, Command, CommandResult, MoveCall, ProgrammableTransaction};

pub mod types;
