use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use parking_lot::RwLock;
use utilities::logger::{info, warn};

use crate::namenode_state::datanode_details::{AdminState, DatanodeDetail, DatanodeState};

/// Shared view of every datanode that ever registered.
///
/// Readers always get a cloned snapshot of a node taken under the read lock, so
/// a placement decision never sees half of an administrative update. Cloning
/// the registry clones the handle, not the map.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<SocketAddr, DatanodeDetail>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the address was not known before.
    pub fn register(&self, xfer_addrs: SocketAddr, name: &str, storage_remaining: u64) -> bool {
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&xfer_addrs) {
            Some(datanode) => {
                // admin state survives a restart of the datanode
                datanode.name = name.to_owned();
                datanode.mark_heartbeat(storage_remaining, 0);
                info!(%xfer_addrs, "Datanode re-registered");
                false
            }
            None => {
                nodes.insert(
                    xfer_addrs,
                    DatanodeDetail::new(name.to_owned(), xfer_addrs, storage_remaining),
                );
                info!(%xfer_addrs, %name, "Datanode registered");
                true
            }
        }
    }

    pub fn lookup(&self, xfer_addrs: &SocketAddr) -> Option<DatanodeDetail> {
        self.nodes.read().get(xfer_addrs).cloned()
    }

    pub fn list_all(&self) -> Vec<DatanodeDetail> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn heartbeat(&self, xfer_addrs: &SocketAddr, storage_remaining: u64, load: u32) -> bool {
        match self.nodes.write().get_mut(xfer_addrs) {
            Some(datanode) => {
                if !datanode.is_alive() {
                    info!(%xfer_addrs, "Datanode is alive again");
                }
                datanode.mark_heartbeat(storage_remaining, load);
                true
            }
            None => false,
        }
    }

    pub fn mark_decommissioned(&self, xfer_addrs: &SocketAddr) -> bool {
        self.set_admin_state(xfer_addrs, AdminState::Decommissioned)
    }

    pub fn clear_decommissioned(&self, xfer_addrs: &SocketAddr) -> bool {
        self.set_admin_state(xfer_addrs, AdminState::Normal)
    }

    fn set_admin_state(&self, xfer_addrs: &SocketAddr, admin_state: AdminState) -> bool {
        match self.nodes.write().get_mut(xfer_addrs) {
            Some(datanode) => {
                info!(%xfer_addrs, ?admin_state, "Datanode admin state changed");
                datanode.admin_state = admin_state;
                true
            }
            None => false,
        }
    }

    pub fn mark_dead(&self, xfer_addrs: &SocketAddr) -> bool {
        match self.nodes.write().get_mut(xfer_addrs) {
            Some(datanode) => {
                datanode.state = DatanodeState::Dead;
                true
            }
            None => false,
        }
    }

    /// Marks every alive node whose last heartbeat is older than `expiry` as
    /// dead and returns the addresses that changed state.
    pub fn expire_stale(&self, expiry: Duration) -> Vec<SocketAddr> {
        let mut nodes = self.nodes.write();
        nodes
            .values_mut()
            .filter(|datanode| datanode.is_alive() && datanode.is_heartbeat_expired(expiry))
            .map(|datanode| {
                warn!(xfer_addrs = %datanode.xfer_addrs, "Datanode missed heartbeats, marking dead");
                datanode.state = DatanodeState::Dead;
                datanode.xfer_addrs
            })
            .collect()
    }

    pub fn is_alive(&self, xfer_addrs: &SocketAddr) -> bool {
        self.nodes
            .read()
            .get(xfer_addrs)
            .is_some_and(|datanode| datanode.is_alive())
    }

    pub fn average_load(&self) -> f64 {
        let nodes = self.nodes.read();
        let (total, count) = nodes
            .values()
            .filter(|datanode| datanode.is_alive())
            .fold((0u64, 0u64), |(total, count), datanode| {
                (total + datanode.load as u64, count + 1)
            });
        if count == 0 {
            return 0.0;
        }
        total as f64 / count as f64
    }
}
