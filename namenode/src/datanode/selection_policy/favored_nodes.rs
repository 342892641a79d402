use std::{collections::HashSet, net::SocketAddr};

use utilities::logger::{debug, instrument, tracing, warn};

use crate::{
    datanode::{
        eligibility::{EligibilityChecker, Ineligibility},
        registry::NodeRegistry,
    },
    namenode_state::datanode_details::DatanodeDetail,
    placement::request::BlockPlacementRequest,
};

/// Turns the client's favored addresses into datanodes that can take a replica.
#[derive(Debug, Clone)]
pub struct FavoredNodeResolver {
    registry: NodeRegistry,
    checker: EligibilityChecker,
}

impl FavoredNodeResolver {
    pub fn new(registry: NodeRegistry, checker: EligibilityChecker) -> Self {
        Self { registry, checker }
    }

    /// Keeps client order and stops after `request.replication` nodes.
    /// Unknown or ineligible addresses are dropped, never reported as errors.
    #[instrument(name = "placement_resolve_favored_nodes", skip(self, request), fields(replication = request.replication))]
    pub fn resolve(
        &self,
        addresses: &[SocketAddr],
        request: &BlockPlacementRequest,
    ) -> Vec<DatanodeDetail> {
        let average_load = self.checker.average_load(&self.registry);
        let mut seen = HashSet::new();
        let mut resolved = vec![];
        for xfer_addrs in addresses {
            if resolved.len() == request.replication {
                debug!(%xfer_addrs, "Ignoring favored node past the replication factor");
                break;
            }
            if !seen.insert(*xfer_addrs) {
                continue;
            }
            let Some(datanode) = self.registry.lookup(xfer_addrs) else {
                warn!(%xfer_addrs, reason = %Ineligibility::NotRegistered, "Dropping favored node");
                continue;
            };
            match self.checker.check(&datanode, request, average_load) {
                Ok(()) => resolved.push(datanode),
                Err(reason) => {
                    warn!(%xfer_addrs, %reason, "Dropping favored node");
                }
            }
        }
        resolved
    }
}
