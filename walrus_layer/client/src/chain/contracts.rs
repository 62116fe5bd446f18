//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! The Move-call surface the client emits, as builder thunks: each function returns a closure
//! that appends its calls to a mutable transaction, so callers compose registration, payment and
//! certification flows freely.

use walrus_common_types::{BlobId, BlsSignature, Epoch, ObjectId};

use super::{
    transaction::{CallArg, CommandResult, MoveCall, ProgrammableTransaction},
    types::SystemState,
};
use crate::config::WalrusPackageConfig;

const MODULE_SYSTEM: &str = "system";
const MODULE_BLOB: &str = "blob";
const MODULE_METADATA: &str = "metadata";
const MODULE_COIN: &str = "coin";

/// Bytes priced as one storage unit.
pub const BYTES_PER_UNIT_SIZE: u64 = 1024 * 1024;

/// The `0x2` Sui framework package.
pub const SUI_FRAMEWORK_PACKAGE: ObjectId = ObjectId::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2,
]);

fn wal_coin_type(package_config: &WalrusPackageConfig) -> String {
    format!("{}::wal::WAL", package_config.wal_package_id)
}

/// `system::reserve_space`: buys a storage resource covering `encoded_size` bytes for
/// `epochs_ahead` epochs, paid from `payment`. Returns the storage resource.
pub fn reserve_space(
    package_config: &WalrusPackageConfig,
    encoded_size: u64,
    epochs_ahead: u32,
    payment: CallArg,
) -> impl FnOnce(&mut ProgrammableTransaction) -> CommandResult {
    let package = package_config.latest_package();
    let system_object = package_config.system_object_id;
    move |tx| {
        tx.move_call(MoveCall {
            package,
            module: MODULE_SYSTEM.to_string(),
            function: "reserve_space".to_string(),
            type_arguments: vec![],
            arguments: vec![
                CallArg::Object(system_object),
                CallArg::pure_u64(encoded_size),
                CallArg::pure_u32(epochs_ahead),
                payment,
            ],
        })
    }
}

/// `system::register_blob`: registers `blob_id` against a storage resource. Returns the created
/// `Blob` object.
#[allow(clippy::too_many_arguments)]
pub fn register_blob(
    package_config: &WalrusPackageConfig,
    storage: CallArg,
    blob_id: &BlobId,
    root_hash: [u8; 32],
    size: u64,
    encoding_type: u8,
    deletable: bool,
    write_payment: CallArg,
) -> impl FnOnce(&mut ProgrammableTransaction) -> CommandResult {
    let package = package_config.latest_package();
    let system_object = package_config.system_object_id;
    let blob_id_bytes = blob_id.into_array();
    move |tx| {
        tx.move_call(MoveCall {
            package,
            module: MODULE_SYSTEM.to_string(),
            function: "register_blob".to_string(),
            type_arguments: vec![],
            arguments: vec![
                CallArg::Object(system_object),
                storage,
                CallArg::Pure(blob_id_bytes.to_vec()),
                CallArg::Pure(root_hash.to_vec()),
                CallArg::pure_u64(size),
                CallArg::pure_u8(encoding_type),
                CallArg::pure_bool(deletable),
                write_payment,
            ],
        })
    }
}

/// `system::certify_blob`: submits the aggregated confirmation signature with its signer bitmap.
pub fn certify_blob(
    package_config: &WalrusPackageConfig,
    blob: CallArg,
    signature: &BlsSignature,
    signer_bitmap: Vec<u8>,
    message: &[u8],
) -> impl FnOnce(&mut ProgrammableTransaction) -> CommandResult {
    let package = package_config.latest_package();
    let system_object = package_config.system_object_id;
    let signature = CallArg::pure_bytes(signature.as_bytes());
    let bitmap = CallArg::pure_bytes(&signer_bitmap);
    let message = CallArg::pure_bytes(message);
    move |tx| {
        tx.move_call(MoveCall {
            package,
            module: MODULE_SYSTEM.to_string(),
            function: "certify_blob".to_string(),
            type_arguments: vec![],
            arguments: vec![CallArg::Object(system_object), blob, signature, bitmap, message],
        })
    }
}

/// `system::extend_blob`: extends the blob's storage to `new_end_epoch`. A no-op thunk when the
/// resulting epoch delta is not positive.
pub fn extend_blob(
    package_config: &WalrusPackageConfig,
    blob: ObjectId,
    current_end_epoch: Epoch,
    new_end_epoch: Epoch,
    payment: CallArg,
) -> impl FnOnce(&mut ProgrammableTransaction) -> Option<CommandResult> {
    let package = package_config.latest_package();
    let system_object = package_config.system_object_id;
    let extension = new_end_epoch.checked_sub(current_end_epoch).filter(|delta| delta.as_u32() > 0);
    move |tx| {
        let extension = extension?;
        Some(tx.move_call(MoveCall {
            package,
            module: MODULE_SYSTEM.to_string(),
            function: "extend_blob".to_string(),
            type_arguments: vec![],
            arguments: vec![
                CallArg::Object(system_object),
                CallArg::Object(blob),
                CallArg::pure_u32(extension.as_u32()),
                payment,
            ],
        }))
    }
}

/// `system::delete_blob`: burns a deletable blob object, returning its storage resource.
pub fn delete_blob(
    package_config: &WalrusPackageConfig,
    blob: ObjectId,
) -> impl FnOnce(&mut ProgrammableTransaction) -> CommandResult {
    let package = package_config.latest_package();
    let system_object = package_config.system_object_id;
    move |tx| {
        tx.move_call(MoveCall {
            package,
            module: MODULE_SYSTEM.to_string(),
            function: "delete_blob".to_string(),
            type_arguments: vec![],
            arguments: vec![CallArg::Object(system_object), CallArg::Object(blob)],
        })
    }
}

/// Attaches or updates the attribute dynamic field of a blob object: optionally creates the
/// `Metadata` value, then upserts and removes the requested pairs.
pub fn write_blob_attributes(
    package_config: &WalrusPackageConfig,
    blob: ObjectId,
    create_metadata: bool,
    pairs: Vec<(String, String)>,
    remove_keys: Vec<String>,
) -> impl FnOnce(&mut ProgrammableTransaction) {
    let package = package_config.latest_package();
    move |tx| {
        if create_metadata {
            let metadata = tx.move_call(MoveCall {
                package,
                module: MODULE_METADATA.to_string(),
                function: "new".to_string(),
                type_arguments: vec![],
                arguments: vec![],
            });
            tx.move_call(MoveCall {
                package,
                module: MODULE_BLOB.to_string(),
                function: "add_metadata".to_string(),
                type_arguments: vec![],
                arguments: vec![CallArg::Object(blob), metadata.into()],
            });
        }
        for (key, value) in pairs {
            tx.move_call(MoveCall {
                package,
                module: MODULE_BLOB.to_string(),
                function: "insert_or_update_metadata_pair".to_string(),
                type_arguments: vec![],
                arguments: vec![
                    CallArg::Object(blob),
                    CallArg::pure_string(&key),
                    CallArg::pure_string(&value),
                ],
            });
        }
        for key in remove_keys {
            tx.move_call(MoveCall {
                package,
                module: MODULE_BLOB.to_string(),
                function: "remove_metadata_pair".to_string(),
                type_arguments: vec![],
                arguments: vec![CallArg::Object(blob), CallArg::pure_string(&key)],
            });
        }
    }
}

/// `0x2::coin::destroy_zero` for the WAL coin type, consuming an exhausted payment coin.
pub fn destroy_zero(
    package_config: &WalrusPackageConfig,
    coin: CallArg,
) -> impl FnOnce(&mut ProgrammableTransaction) -> CommandResult {
    let coin_type = wal_coin_type(package_config);
    move |tx| {
        tx.move_call(MoveCall {
            package: SUI_FRAMEWORK_PACKAGE,
            module: MODULE_COIN.to_string(),
            function: "destroy_zero".to_string(),
            type_arguments: vec![coin_type],
            arguments: vec![coin],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCost {
    pub storage_cost: u64,
    pub write_cost: u64,
    pub total_cost: u64,
}

pub fn storage_units(encoded_size: u64) -> u64 {
    encoded_size.div_ceil(BYTES_PER_UNIT_SIZE)
}

/// Deterministic price of storing `encoded_size` bytes for `epochs` epochs at the system state's
/// current prices.
pub fn storage_cost(system: &SystemState, encoded_size: u64, epochs: u32) -> StorageCost {
    let units = storage_units(encoded_size);
    let storage_cost = units * system.storage_price_per_unit_size * u64::from(epochs);
    let write_cost = units * system.write_price_per_unit_size;
    StorageCost {
        storage_cost,
        write_cost,
        total_cost: storage_cost + write_cost,
    }
}
