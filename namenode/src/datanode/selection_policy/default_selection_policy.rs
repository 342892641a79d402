use std::sync::Arc;

use super::{random_source::RandomSource, selection_policy::DatanodeSelectionPolicy};
use crate::{
    namenode_state::datanode_details::DatanodeDetail, placement::request::BlockPlacementRequest,
};

/// Uniformly random pick, spreads new blocks over the whole cluster.
#[derive(Debug, Clone)]
pub struct RandomSelectionPolicy {
    random: Arc<dyn RandomSource>,
}

impl RandomSelectionPolicy {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl DatanodeSelectionPolicy for RandomSelectionPolicy {
    fn choose(
        &self,
        count: usize,
        mut candidates: Vec<DatanodeDetail>,
        _request: &BlockPlacementRequest,
    ) -> Vec<DatanodeDetail> {
        let count = count.min(candidates.len());
        // partial fisher yates, the first `count` slots end up uniformly sampled
        for slot in 0..count {
            let pick = slot + self.random.next_below(candidates.len() - slot);
            candidates.swap(slot, pick);
        }
        candidates.truncate(count);
        candidates
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
