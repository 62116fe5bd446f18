//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};
use walrus_common_types::ObjectId;
use walrus_storage_node_client::StorageNodeClientOptions;

const DEFAULT_MAX_CONCURRENT_NODE_REQUESTS: usize = 10;
const DEFAULT_MAX_CONCURRENT_SLIVER_STORES: usize = 8;

/// Object ids of the deployed Walrus packages and shared objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalrusPackageConfig {
    pub package_id: ObjectId,
    /// The id of the newest package version, when the package has been upgraded in place.
    #[serde(default)]
    pub latest_package_id: Option<ObjectId>,
    pub wal_package_id: ObjectId,
    pub system_object_id: ObjectId,
    pub staking_object_id: ObjectId,
}

impl WalrusPackageConfig {
    pub fn latest_package(&self) -> ObjectId {
        self.latest_package_id.unwrap_or(self.package_id)
    }
}

/// Well-known deployments with pinned package ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
}

impl Network {
    pub fn package_config(&self) -> WalrusPackageConfig {
        match self {
            Network::Testnet => WalrusPackageConfig {
                package_id: object_id("795ddbc26b8cfff2551f45e198b87fc19473f2df50f995376b924ac80e56f88b"),
                latest_package_id: None,
                wal_package_id: object_id("8190b041122eb492bf63cb464476bd68c6b7e570a4079645a8b28732b6197a82"),
                system_object_id: object_id("98ebc47370603fe81d9e15491b2f1443d619d1dab720d586e429ed233e1255c1"),
                staking_object_id: object_id("20266a17b4f1a216727f3eef5772f8d486a9e3b5e319af80a5b75809c035561d"),
            },
        }
    }
}

fn object_id(hex_str: &str) -> ObjectId {
    ObjectId::from_hex(hex_str).expect("hard-coded object id is valid")
}

/// Client construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalrusClientConfig {
    pub package_config: WalrusPackageConfig,
    /// Chain RPC endpoint, for callers that construct the chain transport from configuration.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub storage_node_options: StorageNodeClientOptions,
    /// Maximum in-flight requests across the committee during one dispatch.
    #[serde(default = "default_max_concurrent_node_requests")]
    pub max_concurrent_node_requests: usize,
    /// Maximum in-flight sliver uploads to a single node during a write.
    #[serde(default = "default_max_concurrent_sliver_stores")]
    pub max_concurrent_sliver_stores: usize,
}

fn default_max_concurrent_node_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_NODE_REQUESTS
}

fn default_max_concurrent_sliver_stores() -> usize {
    DEFAULT_MAX_CONCURRENT_SLIVER_STORES
}

impl WalrusClientConfig {
    pub fn new(package_config: WalrusPackageConfig) -> Self {
        Self {
            package_config,
            rpc_url: None,
            storage_node_options: StorageNodeClientOptions::default(),
            max_concurrent_node_requests: DEFAULT_MAX_CONCURRENT_NODE_REQUESTS,
            max_concurrent_sliver_stores: DEFAULT_MAX_CONCURRENT_SLIVER_STORES,
        }
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(network.package_config())
    }
}
