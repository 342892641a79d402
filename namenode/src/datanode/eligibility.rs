use std::net::SocketAddr;

use thiserror::Error;

use crate::{
    config::PlacementConfig, datanode::registry::NodeRegistry,
    namenode_state::datanode_details::DatanodeDetail, placement::request::BlockPlacementRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Ineligibility {
    #[error("datanode is not registered")]
    NotRegistered,
    #[error("datanode is dead")]
    Dead,
    #[error("datanode is decommissioned")]
    Decommissioned,
    #[error("datanode is excluded for this block")]
    Excluded,
    #[error("datanode has {remaining} bytes left, needs {required}")]
    NotEnoughSpace { remaining: u64, required: u64 },
    #[error("datanode load {load} is above the allowed {allowed:.1}")]
    Overloaded { load: u32, allowed: f64 },
}

/// Decides whether a datanode may take a new replica right now.
///
/// Holds no state of its own, every call looks at the snapshot it is handed
/// (or a fresh one from the registry), so results are never cached across a
/// request.
#[derive(Debug, Clone)]
pub struct EligibilityChecker {
    min_remaining_space: u64,
    max_load_factor: Option<f64>,
}

impl EligibilityChecker {
    pub fn new(config: &PlacementConfig) -> Self {
        Self {
            min_remaining_space: config.min_remaining_space,
            max_load_factor: config.max_load_factor,
        }
    }

    pub fn check(
        &self,
        datanode: &DatanodeDetail,
        request: &BlockPlacementRequest,
        average_load: f64,
    ) -> Result<(), Ineligibility> {
        if !datanode.is_alive() {
            return Err(Ineligibility::Dead);
        }
        if datanode.is_decommissioned() {
            return Err(Ineligibility::Decommissioned);
        }
        if request.excluded.contains(&datanode.xfer_addrs) {
            return Err(Ineligibility::Excluded);
        }
        if datanode.storage_remaining < self.min_remaining_space {
            return Err(Ineligibility::NotEnoughSpace {
                remaining: datanode.storage_remaining,
                required: self.min_remaining_space,
            });
        }
        if let Some(factor) = self.max_load_factor {
            let allowed = factor * average_load;
            if average_load > 0.0 && datanode.load as f64 > allowed {
                return Err(Ineligibility::Overloaded {
                    load: datanode.load,
                    allowed,
                });
            }
        }
        Ok(())
    }

    /// Only pays for the cluster wide average when the load rule is turned on.
    pub fn average_load(&self, registry: &NodeRegistry) -> f64 {
        match self.max_load_factor {
            Some(_) => registry.average_load(),
            None => 0.0,
        }
    }

    pub fn check_addrs(
        &self,
        registry: &NodeRegistry,
        xfer_addrs: &SocketAddr,
        request: &BlockPlacementRequest,
    ) -> Result<DatanodeDetail, Ineligibility> {
        let datanode = registry
            .lookup(xfer_addrs)
            .ok_or(Ineligibility::NotRegistered)?;
        self.check(&datanode, request, self.average_load(registry))?;
        Ok(datanode)
    }

    pub fn is_eligible(
        &self,
        registry: &NodeRegistry,
        xfer_addrs: &SocketAddr,
        request: &BlockPlacementRequest,
    ) -> bool {
        self.check_addrs(registry, xfer_addrs, request).is_ok()
    }
}
