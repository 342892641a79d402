use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatanodeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdminState {
    Normal,
    Decommissioned,
}

/// Everything the namenode knows about one datanode, keyed by its transfer address.
#[derive(Debug, Clone)]
pub struct DatanodeDetail {
    pub name: String,
    pub xfer_addrs: SocketAddr,
    pub storage_remaining: u64,
    /// number of in flight block transfers reported with the last heartbeat
    pub load: u32,
    pub hearbeat_instant: Instant,
    pub state: DatanodeState,
    pub admin_state: AdminState,
}

impl DatanodeDetail {
    pub fn new(name: String, xfer_addrs: SocketAddr, storage_remaining: u64) -> Self {
        Self {
            name,
            xfer_addrs,
            storage_remaining,
            load: 0,
            hearbeat_instant: Instant::now(),
            state: DatanodeState::Alive,
            admin_state: AdminState::Normal,
        }
    }
    pub fn mark_heartbeat(&mut self, storage_remaining: u64, load: u32) {
        self.storage_remaining = storage_remaining;
        self.load = load;
        self.hearbeat_instant = Instant::now();
        self.state = DatanodeState::Alive;
    }
    pub fn is_alive(&self) -> bool {
        self.state == DatanodeState::Alive
    }
    pub fn is_decommissioned(&self) -> bool {
        self.admin_state == AdminState::Decommissioned
    }
    pub fn is_heartbeat_expired(&self, expiry: Duration) -> bool {
        self.hearbeat_instant.elapsed() >= expiry
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatanodeReport {
    pub name: String,
    pub xfer_addrs: SocketAddr,
    pub state: DatanodeState,
    pub admin_state: AdminState,
    pub storage_remaining: u64,
    pub load: u32,
    pub last_heartbeat_secs: u64,
}

impl From<&DatanodeDetail> for DatanodeReport {
    fn from(value: &DatanodeDetail) -> Self {
        Self {
            name: value.name.clone(),
            xfer_addrs: value.xfer_addrs,
            state: value.state,
            admin_state: value.admin_state,
            storage_remaining: value.storage_remaining,
            load: value.load,
            last_heartbeat_secs: value.hearbeat_instant.elapsed().as_secs(),
        }
    }
}
