//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Programmable mock collaborators for driving the client core end to end: an in-memory chain, a
//! committee of scriptable storage nodes, and a codec whose slivers carry the whole payload so
//! any `k` distinct shards reconstruct.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use async_trait::async_trait;
use blake2::{Blake2s256, Digest};
use walrus_client::{
    chain::{
        types::{
            BlobObject,
            CommitteeEntry,
            CreatedObject,
            EpochState,
            StakingPool,
            StakingState,
            StorageResource,
            SystemState,
            TransactionEffects,
        },
        CallArg,
        ChainClientError,
        ChainObjectData,
        ChainReader,
        Command,
        ProgrammableTransaction,
    },
    codec::{AggregateConfirmation, BlobCodec, CodecError, EncodedBlob},
    communication::{NodeClient, NodeClientFactory},
    WalrusClientConfig,
    WalrusPackageConfig,
};
use walrus_common_types::{
    messages::confirmation_message_bytes,
    BlobId,
    BlobPersistenceType,
    BlobStatus,
    BlsPublicKey,
    BlsSignature,
    Epoch,
    ObjectId,
    ShardIndex,
    SignedStorageConfirmation,
    Sliver,
    SliverPair,
    SliverPairIndex,
    SliverType,
};
use walrus_storage_node_client::{
    types::{BlobMetadata, BlobMetadataWithId, SliverPairDigests, ENCODING_TYPE_RED_STUFF},
    StorageNodeClientError,
};

pub fn oid(tag: u8) -> ObjectId {
    ObjectId::new([tag; 32])
}

pub const SYSTEM_OBJECT: u8 = 0xee;
pub const STAKING_OBJECT: u8 = 0xdd;

pub fn package_config() -> WalrusPackageConfig {
    WalrusPackageConfig {
        package_id: oid(0x0a),
        latest_package_id: None,
        wal_package_id: oid(0x0b),
        system_object_id: oid(SYSTEM_OBJECT),
        staking_object_id: oid(STAKING_OBJECT),
    }
}

// --------------------------------- codec ---------------------------------

pub fn hash_blob(bytes: &[u8]) -> BlobId {
    let digest: [u8; 32] = Blake2s256::digest(bytes).into();
    BlobId::new(digest)
}

/// Deterministic stand-in for the node's BLS signature: a keyed digest expanded to the signature
/// width.
pub fn mock_sign(public_key: &BlsPublicKey, message: &[u8]) -> BlsSignature {
    let mut hasher = Blake2s256::new();
    hasher.update(public_key.as_bytes());
    hasher.update(message);
    let digest: [u8; 32] = hasher.finalize().into();
    let mut signature = [0u8; 96];
    for (i, byte) in signature.iter_mut().enumerate() {
        *byte = digest[i % 32];
    }
    BlsSignature::new(signature)
}

/// Test codec: every primary sliver carries the full payload, so reconstruction succeeds from
/// any `k` distinct shards; the blob id is a plain digest of the payload.
pub struct MockCodec;

impl MockCodec {
    fn metadata_for(&self, n_shards: u16, bytes: &[u8]) -> BlobMetadata {
        let blob_id = hash_blob(bytes);
        BlobMetadata {
            encoding_type: ENCODING_TYPE_RED_STUFF,
            unencoded_length: bytes.len() as u64,
            pair_digests: vec![
                SliverPairDigests {
                    primary_hash: blob_id.into_array(),
                    secondary_hash: [0u8; 32],
                };
                usize::from(n_shards)
            ],
        }
    }
}

impl BlobCodec for MockCodec {
    fn n_primary_source_symbols(&self, n_shards: u16) -> u16 {
        n_shards - 2 * ((n_shards - 1) / 3)
    }

    fn encoded_blob_length(&self, n_shards: u16, unencoded_length: u64) -> u64 {
        let symbols = unencoded_length.div_ceil(u64::from(self.n_primary_source_symbols(n_shards)).max(1));
        symbols.max(1) * u64::from(n_shards) * 2
    }

    fn encode_blob(&self, n_shards: u16, bytes: &[u8]) -> Result<EncodedBlob, CodecError> {
        if n_shards == 0 {
            return Err(CodecError::EncodingFailed {
                details: "cannot encode for zero shards".to_string(),
            });
        }
        let blob_id = hash_blob(bytes);
        let sliver_pairs = (0..n_shards)
            .map(|pair| SliverPair {
                pair_index: SliverPairIndex(pair),
                primary: Sliver::new(bytes.to_vec()),
                secondary: Sliver::new(Vec::new()),
            })
            .collect();
        Ok(EncodedBlob {
            blob_id,
            root_hash: blob_id.into_array(),
            metadata: self.metadata_for(n_shards, bytes),
            sliver_pairs,
        })
    }

    fn decode_primary_slivers(
        &self,
        _blob_id: &BlobId,
        n_shards: u16,
        unencoded_length: u64,
        slivers: &[(ShardIndex, Sliver)],
    ) -> Result<Vec<u8>, CodecError> {
        let required = usize::from(self.n_primary_source_symbols(n_shards));
        if slivers.len() < required {
            return Err(CodecError::DecodingFailed {
                details: format!("{} slivers received, {} required", slivers.len(), required),
            });
        }
        let mut bytes = slivers[0].1.data.clone();
        bytes.truncate(unencoded_length as usize);
        Ok(bytes)
    }

    fn compute_metadata(&self, n_shards: u16, bytes: &[u8]) -> Result<BlobMetadataWithId, CodecError> {
        Ok(BlobMetadataWithId {
            blob_id: hash_blob(bytes),
            metadata: self.metadata_for(n_shards, bytes),
        })
    }

    fn metadata_blob_id(&self, metadata: &BlobMetadata) -> Result<BlobId, CodecError> {
        metadata
            .pair_digests
            .first()
            .map(|digests| BlobId::new(digests.primary_hash))
            .ok_or_else(|| CodecError::DecodingFailed {
                details: "metadata has no pair digests".to_string(),
            })
    }

    fn verify_confirmation(&self, public_key: &BlsPublicKey, message: &[u8], signature: &BlsSignature) -> bool {
        *signature == mock_sign(public_key, message)
    }

    fn combine_signatures(
        &self,
        confirmations: &[(u16, SignedStorageConfirmation)],
    ) -> Result<AggregateConfirmation, CodecError> {
        let (_, first) = confirmations.first().ok_or_else(|| CodecError::SignatureAggregation {
            details: "no confirmations to aggregate".to_string(),
        })?;
        if confirmations
            .iter()
            .any(|(_, confirmation)| confirmation.serialized_message != first.serialized_message)
        {
            return Err(CodecError::SignatureAggregation {
                details: "confirmations disagree on the message".to_string(),
            });
        }
        let mut signer_indices = confirmations.iter().map(|(index, _)| *index).collect::<Vec<_>>();
        signer_indices.sort_unstable();

        let mut hasher = Blake2s256::new();
        for (index, confirmation) in confirmations {
            hasher.update(index.to_le_bytes());
            hasher.update(confirmation.signature.as_bytes());
        }
        let digest: [u8; 32] = hasher.finalize().into();
        let mut aggregate = [0u8; 96];
        for (i, byte) in aggregate.iter_mut().enumerate() {
            *byte = digest[i % 32];
        }
        Ok(AggregateConfirmation {
            signature: BlsSignature::new(aggregate),
            signer_indices,
            message: first.serialized_message.clone(),
        })
    }
}

// --------------------------------- chain ---------------------------------

/// In-memory chain: a map of object id to a queue of JSON states (the last state repeats), plus
/// a transaction interpreter for the register/certify/delete calls the client emits.
pub struct MockChain {
    epoch: Epoch,
    staking_object_id: ObjectId,
    objects: Mutex<HashMap<ObjectId, VecDeque<serde_json::Value>>>,
    dynamic_fields: Mutex<HashMap<ObjectId, BTreeMap<String, String>>>,
    pub transactions: Mutex<Vec<ProgrammableTransaction>>,
    pub certify_bitmaps: Mutex<Vec<Vec<u8>>>,
    pub staking_fetches: AtomicUsize,
    created_counter: AtomicUsize,
}

impl MockChain {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            staking_object_id: oid(STAKING_OBJECT),
            objects: Mutex::new(HashMap::new()),
            dynamic_fields: Mutex::new(HashMap::new()),
            transactions: Mutex::new(Vec::new()),
            certify_bitmaps: Mutex::new(Vec::new()),
            staking_fetches: AtomicUsize::new(0),
            created_counter: AtomicUsize::new(0),
        }
    }

    pub fn set_object(&self, object_id: ObjectId, value: serde_json::Value) {
        self.objects
            .lock()
            .unwrap()
            .insert(object_id, VecDeque::from(vec![value]));
    }

    /// Queues an additional state for an object; each fetch pops one until the last remains.
    pub fn queue_object(&self, object_id: ObjectId, value: serde_json::Value) {
        self.objects
            .lock()
            .unwrap()
            .entry(object_id)
            .or_default()
            .push_back(value);
    }

    pub fn set_dynamic_field(&self, parent: ObjectId, fields: BTreeMap<String, String>) {
        self.dynamic_fields.lock().unwrap().insert(parent, fields);
    }

    pub fn blob_object(&self, object_id: ObjectId) -> Option<BlobObject> {
        let objects = self.objects.lock().unwrap();
        let value = objects.get(&object_id)?.front()?.clone();
        serde_json::from_value(value).ok()
    }

    fn fetch(&self, object_id: ObjectId) -> Option<serde_json::Value> {
        if object_id == self.staking_object_id {
            self.staking_fetches.fetch_add(1, Ordering::SeqCst);
        }
        let mut objects = self.objects.lock().unwrap();
        let queue = objects.get_mut(&object_id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn apply_move_call(
        &self,
        tx: &ProgrammableTransaction,
        call_index: usize,
        effects: &mut TransactionEffects,
    ) -> Result<(), ChainClientError> {
        let Command::MoveCall(call) = &tx.commands()[call_index] else {
            return Ok(());
        };
        match call.function.as_str() {
            "register_blob" => {
                let blob_id = pure_bytes32(&call.arguments[2])?;
                let size = pure_u64(&call.arguments[4])?;
                let deletable = pure_bool(&call.arguments[6])?;
                let epochs = tx
                    .commands()
                    .iter()
                    .find_map(|command| match command {
                        Command::MoveCall(c) if c.function == "reserve_space" => pure_u32(&c.arguments[2]).ok(),
                        _ => None,
                    })
                    .unwrap_or(1);

                let serial = self.created_counter.fetch_add(1, Ordering::SeqCst) as u8;
                let mut object_bytes = [0xb0u8; 32];
                object_bytes[31] = serial;
                let mut storage_bytes = [0xc0u8; 32];
                storage_bytes[31] = serial;

                let blob_object = BlobObject {
                    id: ObjectId::new(object_bytes),
                    blob_id: BlobId::new(blob_id),
                    registered_epoch: self.epoch,
                    certified_epoch: None,
                    deletable,
                    size,
                    storage: StorageResource {
                        id: ObjectId::new(storage_bytes),
                        start_epoch: self.epoch,
                        end_epoch: self.epoch + Epoch(epochs),
                        storage_size: size,
                    },
                };
                self.set_object(
                    blob_object.id,
                    serde_json::to_value(&blob_object).map_err(|e| ChainClientError::ExecutionFailed {
                        details: e.to_string(),
                    })?,
                );
                effects.created.push(CreatedObject {
                    object_id: blob_object.id,
                    object_type: "0x0a::blob::Blob".to_string(),
                });
            },
            "certify_blob" => {
                let CallArg::Object(object_id) = &call.arguments[1] else {
                    return Err(ChainClientError::ExecutionFailed {
                        details: "certify_blob expects a blob object".to_string(),
                    });
                };
                let object_id = *object_id;
                let bitmap = pure_vec(&call.arguments[3])?;
                self.certify_bitmaps.lock().unwrap().push(bitmap);

                let mut blob_object = self.blob_object(object_id).ok_or(ChainClientError::ObjectNotFound {
                    object_id,
                })?;
                blob_object.certified_epoch = Some(self.epoch);
                self.set_object(
                    object_id,
                    serde_json::to_value(&blob_object).map_err(|e| ChainClientError::ExecutionFailed {
                        details: e.to_string(),
                    })?,
                );
            },
            "delete_blob" => {
                if let CallArg::Object(object_id) = &call.arguments[1] {
                    self.objects.lock().unwrap().remove(object_id);
                }
            },
            _ => {},
        }
        Ok(())
    }
}

fn pure(arg: &CallArg) -> Result<&[u8], ChainClientError> {
    match arg {
        CallArg::Pure(bytes) => Ok(bytes),
        other => Err(ChainClientError::ExecutionFailed {
            details: format!("expected a pure argument, got {other:?}"),
        }),
    }
}

fn pure_bytes32(arg: &CallArg) -> Result<[u8; 32], ChainClientError> {
    pure(arg)?
        .try_into()
        .map_err(|_| ChainClientError::ExecutionFailed {
            details: "expected 32 pure bytes".to_string(),
        })
}

fn pure_u64(arg: &CallArg) -> Result<u64, ChainClientError> {
    Ok(u64::from_le_bytes(pure(arg)?.try_into().map_err(|_| {
        ChainClientError::ExecutionFailed {
            details: "expected a u64 argument".to_string(),
        }
    })?))
}

fn pure_u32(arg: &CallArg) -> Result<u32, ChainClientError> {
    Ok(u32::from_le_bytes(pure(arg)?.try_into().map_err(|_| {
        ChainClientError::ExecutionFailed {
            details: "expected a u32 argument".to_string(),
        }
    })?))
}

fn pure_bool(arg: &CallArg) -> Result<bool, ChainClientError> {
    Ok(pure(arg)?.first().copied().unwrap_or(0) != 0)
}

/// Strips the one-byte ULEB length prefix of a short `vector<u8>` argument.
fn pure_vec(arg: &CallArg) -> Result<Vec<u8>, ChainClientError> {
    let bytes = pure(arg)?;
    match bytes.split_first() {
        Some((len, rest)) if usize::from(*len) == rest.len() => Ok(rest.to_vec()),
        _ => Err(ChainClientError::ExecutionFailed {
            details: "malformed vector argument".to_string(),
        }),
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn multi_get_objects(&self, ids: &[ObjectId]) -> Result<Vec<Option<ChainObjectData>>, ChainClientError> {
        Ok(ids
            .iter()
            .map(|id| {
                self.fetch(*id).map(|contents| ChainObjectData {
                    object_id: *id,
                    contents,
                })
            })
            .collect())
    }

    async fn read_dynamic_field(
        &self,
        parent: ObjectId,
        name: &[u8],
    ) -> Result<Option<BTreeMap<String, String>>, ChainClientError> {
        if name != b"metadata" {
            return Ok(None);
        }
        Ok(self.dynamic_fields.lock().unwrap().get(&parent).cloned())
    }

    async fn execute_transaction(
        &self,
        transaction: ProgrammableTransaction,
    ) -> Result<TransactionEffects, ChainClientError> {
        let mut effects = TransactionEffects::default();
        for index in 0..transaction.commands().len() {
            self.apply_move_call(&transaction, index, &mut effects)?;
        }
        self.transactions.lock().unwrap().push(transaction);
        Ok(effects)
    }
}

// --------------------------------- nodes ---------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Respond {
    Ok,
    NotFound,
    Blocked,
    Fail,
}

impl Respond {
    fn check(self) -> Result<(), StorageNodeClientError> {
        match self {
            Respond::Ok => Ok(()),
            Respond::NotFound => Err(StorageNodeClientError::NotFound),
            Respond::Blocked => Err(StorageNodeClientError::LegallyUnavailable),
            Respond::Fail => Err(StorageNodeClientError::UnexpectedStatus {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                details: "mock failure".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusBehavior {
    Fixed(BlobStatus),
    FromStore,
    NotFound,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct NodeBehavior {
    pub metadata: Respond,
    pub slivers: Respond,
    pub status: StatusBehavior,
    pub store: Respond,
    pub confirmation: Respond,
    pub corrupt_confirmation_signature: bool,
}

impl Default for NodeBehavior {
    fn default() -> Self {
        Self {
            metadata: Respond::Ok,
            slivers: Respond::Ok,
            status: StatusBehavior::FromStore,
            store: Respond::Ok,
            confirmation: Respond::Ok,
            corrupt_confirmation_signature: false,
        }
    }
}

/// Blob content a node serves for read scenarios without a prior store.
#[derive(Debug, Clone)]
pub struct ServedBlob {
    pub metadata: BlobMetadataWithId,
    pub sliver_bytes: Vec<u8>,
}

pub struct MockNode {
    pub public_key: BlsPublicKey,
    pub epoch: Epoch,
    pub behavior: Mutex<NodeBehavior>,
    pub served: Mutex<Option<ServedBlob>>,
    pub stored_metadata: Mutex<Option<BlobMetadataWithId>>,
    pub stored_slivers: Mutex<Vec<(SliverPairIndex, SliverType, Sliver)>>,
    pub metadata_requests: AtomicUsize,
    pub sliver_requests: AtomicUsize,
    pub status_requests: AtomicUsize,
}

impl MockNode {
    pub fn new(public_key: BlsPublicKey, epoch: Epoch) -> Arc<Self> {
        Arc::new(Self {
            public_key,
            epoch,
            behavior: Mutex::new(NodeBehavior::default()),
            served: Mutex::new(None),
            stored_metadata: Mutex::new(None),
            stored_slivers: Mutex::new(Vec::new()),
            metadata_requests: AtomicUsize::new(0),
            sliver_requests: AtomicUsize::new(0),
            status_requests: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior<F: FnOnce(&mut NodeBehavior)>(&self, update: F) {
        update(&mut self.behavior.lock().unwrap());
    }

    pub fn serve(&self, blob: ServedBlob) {
        *self.served.lock().unwrap() = Some(blob);
    }

    fn behavior(&self) -> NodeBehavior {
        self.behavior.lock().unwrap().clone()
    }
}

pub struct MockNodeClient(pub Arc<MockNode>);

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn get_metadata(&self, blob_id: &BlobId) -> Result<BlobMetadataWithId, StorageNodeClientError> {
        let node = &self.0;
        node.metadata_requests.fetch_add(1, Ordering::SeqCst);
        node.behavior().metadata.check()?;
        let served = node.served.lock().unwrap().clone();
        let stored = node.stored_metadata.lock().unwrap().clone();
        match served.map(|blob| blob.metadata).or(stored) {
            Some(metadata) if metadata.blob_id == *blob_id => Ok(metadata),
            _ => Err(StorageNodeClientError::NotFound),
        }
    }

    async fn store_metadata(&self, metadata: &BlobMetadataWithId) -> Result<(), StorageNodeClientError> {
        self.0.behavior().store.check()?;
        *self.0.stored_metadata.lock().unwrap() = Some(metadata.clone());
        Ok(())
    }

    async fn get_sliver(
        &self,
        _blob_id: &BlobId,
        _pair_index: SliverPairIndex,
        _sliver_type: SliverType,
    ) -> Result<Sliver, StorageNodeClientError> {
        let node = &self.0;
        node.sliver_requests.fetch_add(1, Ordering::SeqCst);
        node.behavior().slivers.check()?;
        if let Some(blob) = node.served.lock().unwrap().clone() {
            return Ok(Sliver::new(blob.sliver_bytes));
        }
        let stored = node.stored_slivers.lock().unwrap();
        stored
            .iter()
            .find(|(_, sliver_type, _)| *sliver_type == SliverType::Primary)
            .map(|(_, _, sliver)| sliver.clone())
            .ok_or(StorageNodeClientError::NotFound)
    }

    async fn store_sliver(
        &self,
        _blob_id: &BlobId,
        pair_index: SliverPairIndex,
        sliver_type: SliverType,
        sliver: &Sliver,
    ) -> Result<(), StorageNodeClientError> {
        self.0.behavior().store.check()?;
        self.0
            .stored_slivers
            .lock()
            .unwrap()
            .push((pair_index, sliver_type, sliver.clone()));
        Ok(())
    }

    async fn get_blob_status(&self, _blob_id: &BlobId) -> Result<BlobStatus, StorageNodeClientError> {
        let node = &self.0;
        node.status_requests.fetch_add(1, Ordering::SeqCst);
        match node.behavior().status {
            StatusBehavior::Fixed(status) => Ok(status),
            StatusBehavior::NotFound => Err(StorageNodeClientError::NotFound),
            StatusBehavior::Blocked => Err(StorageNodeClientError::LegallyUnavailable),
            StatusBehavior::FromStore => {
                if node.stored_metadata.lock().unwrap().is_some() {
                    Ok(BlobStatus::Permanent {
                        initial_certified_epoch: Some(node.epoch),
                        end_epoch: node.epoch + Epoch(10),
                    })
                } else {
                    Ok(BlobStatus::Nonexistent)
                }
            },
        }
    }

    async fn get_confirmation(
        &self,
        blob_id: &BlobId,
        persistence: &BlobPersistenceType,
    ) -> Result<SignedStorageConfirmation, StorageNodeClientError> {
        let node = &self.0;
        let behavior = node.behavior();
        behavior.confirmation.check()?;
        let serialized_message = confirmation_message_bytes(node.epoch, blob_id, persistence);
        let mut signature = mock_sign(&node.public_key, &serialized_message);
        if behavior.corrupt_confirmation_signature {
            let mut bytes = [0u8; 96];
            bytes.copy_from_slice(signature.as_bytes());
            bytes[0] ^= 0xff;
            signature = BlsSignature::new(bytes);
        }
        Ok(SignedStorageConfirmation {
            serialized_message,
            signature,
        })
    }
}

#[derive(Clone, Default)]
pub struct MockNodeFactory {
    nodes: Arc<Mutex<HashMap<String, Arc<MockNode>>>>,
}

impl MockNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, network_address: String, node: Arc<MockNode>) {
        self.nodes.lock().unwrap().insert(network_address, node);
    }
}

impl NodeClientFactory for MockNodeFactory {
    type Client = MockNodeClient;

    fn create_client(
        &self,
        member: &walrus_common_types::CommitteeMember,
    ) -> Result<Self::Client, StorageNodeClientError> {
        self.nodes
            .lock()
            .unwrap()
            .get(&member.network_address)
            .cloned()
            .map(MockNodeClient)
            .ok_or_else(|| StorageNodeClientError::InvalidResponse {
                message: format!("no mock node at {}", member.network_address),
            })
    }
}

// --------------------------------- cluster ---------------------------------

/// A committee's worth of on-chain objects and mock nodes, registered with a chain and factory.
pub fn build_committee(
    chain: &MockChain,
    factory: &MockNodeFactory,
    tag: u8,
    n_nodes: u16,
    shards_per_node: u16,
    node_epoch: Epoch,
) -> (Vec<CommitteeEntry>, Vec<Arc<MockNode>>) {
    let mut entries = Vec::new();
    let mut nodes = Vec::new();
    for i in 0..n_nodes {
        let mut pool_bytes = [0u8; 32];
        pool_bytes[0] = tag;
        pool_bytes[1] = 0x50;
        pool_bytes[31] = i as u8;
        let mut node_bytes = pool_bytes;
        node_bytes[1] = 0x60;
        let mut key_bytes = [0u8; 48];
        key_bytes[0] = tag;
        key_bytes[47] = i as u8;

        let pool_id = ObjectId::new(pool_bytes);
        let network_address = format!("{tag:02x}-node-{i}.test:9185");
        let public_key = BlsPublicKey::new(key_bytes);

        let pool = StakingPool {
            node_id: ObjectId::new(node_bytes),
            name: format!("mock-node-{tag:02x}-{i}"),
            network_address: network_address.clone(),
            public_key,
        };
        chain.set_object(pool_id, serde_json::to_value(&pool).unwrap());

        let node = MockNode::new(public_key, node_epoch);
        factory.insert(network_address, node.clone());
        nodes.push(node);

        entries.push(CommitteeEntry {
            pool_id,
            shard_indices: (i * shards_per_node..(i + 1) * shards_per_node).map(ShardIndex).collect(),
        });
    }
    (entries, nodes)
}

pub fn system_state_value(epoch: Epoch, n_shards: u16) -> serde_json::Value {
    serde_json::to_value(SystemState {
        epoch,
        n_shards,
        storage_price_per_unit_size: 50,
        write_price_per_unit_size: 20,
    })
    .unwrap()
}

pub fn staking_state_value(
    epoch: Epoch,
    epoch_state: EpochState,
    committee: Vec<CommitteeEntry>,
    previous_committee: Option<Vec<CommitteeEntry>>,
) -> serde_json::Value {
    serde_json::to_value(StakingState {
        epoch,
        epoch_state,
        committee,
        previous_committee,
    })
    .unwrap()
}

pub struct TestCluster {
    pub chain: Arc<MockChain>,
    pub factory: MockNodeFactory,
    pub codec: Arc<MockCodec>,
    pub nodes: Vec<Arc<MockNode>>,
    pub epoch: Epoch,
    pub n_shards: u16,
}

impl TestCluster {
    /// A committee of `n_nodes` equal nodes at epoch 5 in the `Normal` phase.
    pub fn new(n_nodes: u16, shards_per_node: u16) -> Self {
        let epoch = Epoch(5);
        let n_shards = n_nodes * shards_per_node;
        let chain = Arc::new(MockChain::new(epoch));
        let factory = MockNodeFactory::new();
        let (entries, nodes) = build_committee(&chain, &factory, 0xa1, n_nodes, shards_per_node, epoch);

        chain.set_object(oid(SYSTEM_OBJECT), system_state_value(epoch, n_shards));
        chain.set_object(
            oid(STAKING_OBJECT),
            staking_state_value(epoch, EpochState::Normal, entries, None),
        );

        Self {
            chain,
            factory,
            codec: Arc::new(MockCodec),
            nodes,
            epoch,
            n_shards,
        }
    }

    pub fn client(&self) -> walrus_client::WalrusClient<MockChain, MockNodeFactory, MockCodec> {
        walrus_client::WalrusClient::new(
            WalrusClientConfig::new(package_config()),
            self.chain.clone(),
            self.factory.clone(),
            self.codec.clone(),
        )
    }

    /// Serves `bytes` (with a certified status) from every node and returns the blob id.
    pub fn serve_blob(&self, bytes: &[u8]) -> BlobId {
        let metadata = self.codec.compute_metadata(self.n_shards, bytes).unwrap();
        let status = BlobStatus::Permanent {
            initial_certified_epoch: Some(self.epoch),
            end_epoch: self.epoch + Epoch(10),
        };
        for node in &self.nodes {
            node.serve(ServedBlob {
                metadata: metadata.clone(),
                sliver_bytes: bytes.to_vec(),
            });
            node.set_behavior(|behavior| behavior.status = StatusBehavior::Fixed(status));
        }
        metadata.blob_id
    }

    pub fn total_sliver_requests(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.sliver_requests.load(Ordering::SeqCst))
            .sum()
    }

    pub fn total_metadata_requests(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.metadata_requests.load(Ordering::SeqCst))
            .sum()
    }
}
