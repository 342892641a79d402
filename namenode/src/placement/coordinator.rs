use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use utilities::logger::{debug, instrument, tracing, warn};

use crate::{
    config::{PlacementConfig, SelectionPolicyKind},
    datanode::{
        eligibility::EligibilityChecker,
        registry::NodeRegistry,
        selection_policy::{
            available_space_policy::AvailableSpaceSelectionPolicy,
            default_selection_policy::RandomSelectionPolicy, fallback::FallbackSelector,
            favored_nodes::FavoredNodeResolver, random_source::RandomSource,
            selection_policy::DatanodeSelectionPolicy,
        },
    },
    error::PlacementError,
    placement::request::{BlockPlacementRequest, PlacementResult},
};

/// Decides which datanodes receive the replicas of a new block.
///
/// Favored nodes are a hint and are honoured first, eligibility is a hard
/// rule, and the replica count is never reduced: whatever the hint cannot
/// cover is backfilled, and if the cluster cannot cover it either the
/// request fails. `place` only reads the registry, so any number of calls
/// may run at once.
#[derive(Debug)]
pub struct PlacementCoordinator {
    registry: NodeRegistry,
    checker: EligibilityChecker,
    resolver: FavoredNodeResolver,
    fallback: FallbackSelector,
    max_attempts: usize,
}

impl PlacementCoordinator {
    pub fn new(
        registry: NodeRegistry,
        config: &PlacementConfig,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let policy: Box<dyn DatanodeSelectionPolicy> = match config.policy {
            SelectionPolicyKind::Random => Box::new(RandomSelectionPolicy::new(random)),
            SelectionPolicyKind::AvailableSpace => Box::new(AvailableSpaceSelectionPolicy::new(
                random,
                config.available_space_preference,
            )),
        };
        Self::with_policy(registry, config, policy)
    }

    pub fn with_policy(
        registry: NodeRegistry,
        config: &PlacementConfig,
        policy: Box<dyn DatanodeSelectionPolicy>,
    ) -> Self {
        let checker = EligibilityChecker::new(config);
        Self {
            resolver: FavoredNodeResolver::new(registry.clone(), checker.clone()),
            fallback: FallbackSelector::new(registry.clone(), checker.clone(), policy),
            checker,
            registry,
            max_attempts: config.max_placement_attempts.max(1),
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    #[instrument(
        name = "placement_place",
        skip(self, request),
        fields(replication = request.replication, favored = request.favored_nodes.len(), block_size = request.block_size)
    )]
    pub fn place(&self, request: &BlockPlacementRequest) -> Result<PlacementResult, PlacementError> {
        let replication = request.replication;
        if replication == 0 {
            return Err(PlacementError::InvalidRequest(
                "replication factor must be at least 1".to_owned(),
            ));
        }
        // nodes that went bad between selection and the final check stay out
        // for the rest of this request
        let mut attempt_request = request.clone();
        for attempt in 1..=self.max_attempts {
            let mut chosen = self
                .resolver
                .resolve(&attempt_request.favored_nodes, &attempt_request);
            chosen.truncate(replication);
            let favored = chosen.len();
            if chosen.len() < replication {
                let additional = self.fallback.select_additional(
                    replication - chosen.len(),
                    &chosen,
                    &attempt_request,
                )?;
                chosen.extend(additional);
            }

            let stale: Vec<SocketAddr> = chosen
                .iter()
                .map(|datanode| datanode.xfer_addrs)
                .filter(|xfer_addrs| {
                    !self
                        .checker
                        .is_eligible(&self.registry, xfer_addrs, &attempt_request)
                })
                .collect();
            if stale.is_empty() {
                let distinct: HashSet<SocketAddr> =
                    chosen.iter().map(|datanode| datanode.xfer_addrs).collect();
                if chosen.len() != replication || distinct.len() != replication {
                    return Err(PlacementError::InsufficientNodes {
                        required: replication,
                        available: distinct.len(),
                    });
                }
                debug!(
                    favored,
                    fallback = replication - favored,
                    targets = ?distinct,
                    "Placed block replicas"
                );
                return Ok(PlacementResult::new(chosen));
            }
            warn!(attempt, ?stale, "Chosen datanodes changed state during placement, retrying");
            attempt_request.excluded.extend(stale);
        }
        // flapping datanodes on every attempt, report what is reliably usable
        let available = self
            .registry
            .list_all()
            .iter()
            .filter(|datanode| {
                self.checker
                    .is_eligible(&self.registry, &datanode.xfer_addrs, &attempt_request)
            })
            .count();
        Err(PlacementError::InsufficientNodes {
            required: replication,
            available,
        })
    }
}
