pub mod block_details;
pub mod datanode_details;
pub mod file_details;
pub mod state_mantainer;

use std::collections::HashMap;

use block_details::BlockDetails;
use file_details::FileDetails;

/// Namespace half of the namenode: which blocks make up a file and where their replicas live.
#[derive(Default, Debug, Clone)]
pub struct NamenodeState {
    pub file_to_detail_map: HashMap<String, FileDetails>,
    pub block_id_to_detail_map: HashMap<String, BlockDetails>,
}

impl NamenodeState {
    pub fn new() -> Self {
        Self::default()
    }
    /// Blocks of `path` holding any byte of `[offset, offset + length)`, in file order.
    pub fn blocks_in_range(&self, path: &str, offset: u64, length: u64) -> Option<Vec<&BlockDetails>> {
        let file = self.file_to_detail_map.get(path)?;
        let end = offset.saturating_add(length);
        Some(
            file.blocks
                .iter()
                .filter_map(|block_id| self.block_id_to_detail_map.get(block_id))
                .filter(|block| block.overlaps(offset, end))
                .collect(),
        )
    }
}
