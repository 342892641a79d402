//! Messages exchanged with clients, datanodes and administrators. They are
//! plain serde types so whichever transport fronts the namenode can carry them.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub path: String,
    /// falls back to the configured default when absent
    pub replication: Option<usize>,
    /// falls back to the configured default when absent
    pub block_size: Option<u64>,
    /// `ip:port` of datanode transfer endpoints, highest priority first
    pub favored_nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedBlock {
    pub block_id: String,
    pub start_offset: u64,
    pub num_bytes: u64,
    pub locations: Vec<SocketAddr>,
}

impl LocatedBlock {
    /// `(host, port)` pairs of the replica holders.
    pub fn hosts(&self) -> Vec<(String, u16)> {
        self.locations
            .iter()
            .map(|location| (location.ip().to_string(), location.port()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    pub path: String,
    pub block: LocatedBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlockRequest {
    pub path: String,
    /// empty means re-use the hint given at create
    pub favored_nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteFileRequest {
    pub path: String,
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBlockLocationsRequest {
    pub path: String,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBlockLocationsResponse {
    pub path: String,
    pub blocks: Vec<LocatedBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub xfer_addrs: String,
    pub storage_remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub connected: bool,
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartBeatRequest {
    pub xfer_addrs: String,
    pub storage_remaining: u64,
    pub load: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartBeatResponse {
    pub connection_alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReportRequest {
    pub xfer_addrs: String,
    pub available_blocks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReportResponse {
    pub blocks_to_be_deleted: Vec<String>,
}

/// Work item for the transfer pipeline: copy `block_id` from `source` to every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationCommand {
    pub block_id: String,
    pub source: SocketAddr,
    pub targets: Vec<SocketAddr>,
}
