use crate::{
    namenode_state::datanode_details::DatanodeDetail, placement::request::BlockPlacementRequest,
};

/// Strategy used to fill the replica slots the favored nodes left open.
///
/// `candidates` are already eligible and disjoint from the nodes chosen so
/// far, and there are at least `count` of them. Implementations must return
/// exactly `count` distinct members of `candidates`.
pub trait DatanodeSelectionPolicy: std::fmt::Debug + Send + Sync {
    fn choose(
        &self,
        count: usize,
        candidates: Vec<DatanodeDetail>,
        request: &BlockPlacementRequest,
    ) -> Vec<DatanodeDetail>;

    fn name(&self) -> &'static str;
}
