use std::sync::Arc;

use super::{random_source::RandomSource, selection_policy::DatanodeSelectionPolicy};
use crate::{
    namenode_state::datanode_details::DatanodeDetail, placement::request::BlockPlacementRequest,
};

const DEFAULT_PREFERENCE: f64 = 0.6;

/// For every slot draws two random candidates and keeps the emptier one with
/// probability `preference`, so fuller datanodes fill up more slowly without
/// every block herding onto the single emptiest node.
#[derive(Debug, Clone)]
pub struct AvailableSpaceSelectionPolicy {
    random: Arc<dyn RandomSource>,
    preference: f64,
}

impl AvailableSpaceSelectionPolicy {
    pub fn new(random: Arc<dyn RandomSource>, preference: f64) -> Self {
        let preference = if preference.is_finite() {
            preference.clamp(0.0, 1.0)
        } else {
            DEFAULT_PREFERENCE
        };
        Self { random, preference }
    }
}

impl DatanodeSelectionPolicy for AvailableSpaceSelectionPolicy {
    fn choose(
        &self,
        count: usize,
        mut candidates: Vec<DatanodeDetail>,
        _request: &BlockPlacementRequest,
    ) -> Vec<DatanodeDetail> {
        let mut chosen = Vec::with_capacity(count);
        while chosen.len() < count && !candidates.is_empty() {
            let first = self.random.next_below(candidates.len());
            let pick = if candidates.len() == 1 {
                first
            } else {
                let mut second = self.random.next_below(candidates.len() - 1);
                if second >= first {
                    second += 1;
                }
                let (emptier, fuller) = if candidates[first].storage_remaining
                    >= candidates[second].storage_remaining
                {
                    (first, second)
                } else {
                    (second, first)
                };
                if self.random.next_f64() < self.preference {
                    emptier
                } else {
                    fuller
                }
            };
            chosen.push(candidates.swap_remove(pick));
        }
        chosen
    }

    fn name(&self) -> &'static str {
        "available_space"
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, net::SocketAddr};

    use super::*;
    use crate::datanode::selection_policy::random_source::SeededRandom;

    fn datanode(port: u16, storage_remaining: u64) -> DatanodeDetail {
        DatanodeDetail::new(
            format!("dn-{port}"),
            SocketAddr::from(([10, 0, 0, 1], port)),
            storage_remaining,
        )
    }

    #[test]
    fn full_preference_never_picks_fuller_of_two() {
        let policy = AvailableSpaceSelectionPolicy::new(Arc::new(SeededRandom::new(1)), 1.0);
        let request = BlockPlacementRequest::new(1);
        for _ in 0..50 {
            let chosen = policy.choose(1, vec![datanode(1, 10), datanode(2, 1000)], &request);
            assert_eq!(chosen[0].xfer_addrs.port(), 2);
        }
    }

    #[test]
    fn favours_empty_nodes_over_many_blocks() {
        let policy = AvailableSpaceSelectionPolicy::new(Arc::new(SeededRandom::new(9)), 0.8);
        let request = BlockPlacementRequest::new(1);
        let pool = || vec![datanode(1, 10), datanode(2, 10), datanode(3, 1000), datanode(4, 1000)];
        let empty_hits = (0..400)
            .filter(|_| policy.choose(1, pool(), &request)[0].storage_remaining == 1000)
            .count();
        assert!(empty_hits > 200, "empty nodes picked {empty_hits} times");
    }

    #[test]
    fn non_finite_preference_behaves_like_default() {
        let pool = || (0..8).map(|port| datanode(port, port as u64 * 100)).collect::<Vec<_>>();
        let request = BlockPlacementRequest::new(3);
        for preference in [f64::NAN, f64::INFINITY] {
            let configured = AvailableSpaceSelectionPolicy::new(Arc::new(SeededRandom::new(5)), preference);
            let default = AvailableSpaceSelectionPolicy::new(Arc::new(SeededRandom::new(5)), 0.6);
            for _ in 0..20 {
                let ports = |chosen: Vec<DatanodeDetail>| {
                    chosen.iter().map(|d| d.xfer_addrs.port()).collect::<Vec<_>>()
                };
                assert_eq!(
                    ports(configured.choose(3, pool(), &request)),
                    ports(default.choose(3, pool(), &request))
                );
            }
        }
    }

    #[test]
    fn returns_exact_count_of_distinct_nodes() {
        let policy = AvailableSpaceSelectionPolicy::new(Arc::new(SeededRandom::new(2)), 0.6);
        let pool: Vec<_> = (0..6).map(|port| datanode(port, port as u64 * 100)).collect();
        let chosen = policy.choose(6, pool, &BlockPlacementRequest::new(6));
        let distinct: HashSet<_> = chosen.iter().map(|d| d.xfer_addrs).collect();
        assert_eq!(chosen.len(), 6);
        assert_eq!(distinct.len(), 6);
    }
}
