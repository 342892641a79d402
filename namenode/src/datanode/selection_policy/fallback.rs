use std::{collections::HashSet, net::SocketAddr};

use utilities::logger::{debug, instrument, tracing, warn};

use super::selection_policy::DatanodeSelectionPolicy;
use crate::{
    datanode::{eligibility::EligibilityChecker, registry::NodeRegistry},
    error::PlacementError,
    namenode_state::datanode_details::DatanodeDetail,
    placement::request::BlockPlacementRequest,
};

/// Fills the replica slots left over after the favored nodes.
#[derive(Debug)]
pub struct FallbackSelector {
    registry: NodeRegistry,
    checker: EligibilityChecker,
    policy: Box<dyn DatanodeSelectionPolicy>,
}

impl FallbackSelector {
    pub fn new(
        registry: NodeRegistry,
        checker: EligibilityChecker,
        policy: Box<dyn DatanodeSelectionPolicy>,
    ) -> Self {
        Self {
            registry,
            checker,
            policy,
        }
    }

    /// Exactly `count` distinct eligible datanodes, none of them in `already_chosen`.
    #[instrument(name = "placement_select_additional", skip(self, already_chosen, request), fields(policy = self.policy.name()))]
    pub fn select_additional(
        &self,
        count: usize,
        already_chosen: &[DatanodeDetail],
        request: &BlockPlacementRequest,
    ) -> Result<Vec<DatanodeDetail>, PlacementError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let chosen: HashSet<SocketAddr> = already_chosen
            .iter()
            .map(|datanode| datanode.xfer_addrs)
            .collect();
        let average_load = self.checker.average_load(&self.registry);
        let candidates: Vec<DatanodeDetail> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|datanode| !chosen.contains(&datanode.xfer_addrs))
            .filter(|datanode| self.checker.check(datanode, request, average_load).is_ok())
            .collect();
        if candidates.len() < count {
            warn!(
                required = count,
                available = candidates.len(),
                "Not enough eligible datanodes left"
            );
            return Err(PlacementError::InsufficientNodes {
                required: count,
                available: candidates.len(),
            });
        }
        debug!(required = count, available = candidates.len(), "Selecting fallback datanodes");
        let selected = self.policy.choose(count, candidates, request);
        let distinct: HashSet<SocketAddr> =
            selected.iter().map(|datanode| datanode.xfer_addrs).collect();
        if selected.len() != count || distinct.len() != count || !distinct.is_disjoint(&chosen) {
            // a policy broke its contract, refuse rather than under replicate
            warn!(policy = self.policy.name(), returned = selected.len(), "Selection policy returned an invalid pick");
            return Err(PlacementError::InsufficientNodes {
                required: count,
                available: distinct.difference(&chosen).count(),
            });
        }
        Ok(selected)
    }
}
