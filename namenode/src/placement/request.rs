use std::{collections::HashSet, net::SocketAddr};

use crate::namenode_state::datanode_details::DatanodeDetail;

/// One block's worth of placement input, built per allocation and dropped afterwards.
#[derive(Debug, Clone, Default)]
pub struct BlockPlacementRequest {
    pub replication: usize,
    /// client priority order, first entry is filled first
    pub favored_nodes: Vec<SocketAddr>,
    /// datanodes that must not receive this block, e.g. current holders when re-replicating
    pub excluded: HashSet<SocketAddr>,
    pub block_size: u64,
}

impl BlockPlacementRequest {
    pub fn new(replication: usize) -> Self {
        Self {
            replication,
            ..Default::default()
        }
    }
    pub fn with_favored_nodes(mut self, favored_nodes: Vec<SocketAddr>) -> Self {
        self.favored_nodes = favored_nodes;
        self
    }
    pub fn with_excluded(mut self, excluded: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.excluded.extend(excluded);
        self
    }
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }
}

/// Datanodes chosen for a new block, favored ones first.
#[derive(Debug, Clone)]
pub struct PlacementResult {
    targets: Vec<DatanodeDetail>,
}

impl PlacementResult {
    pub(crate) fn new(targets: Vec<DatanodeDetail>) -> Self {
        Self { targets }
    }
    pub fn targets(&self) -> &[DatanodeDetail] {
        &self.targets
    }
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.targets.iter().map(|target| target.xfer_addrs).collect()
    }
    pub fn len(&self) -> usize {
        self.targets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
    pub fn contains(&self, xfer_addrs: &SocketAddr) -> bool {
        self.targets
            .iter()
            .any(|target| &target.xfer_addrs == xfer_addrs)
    }
}
