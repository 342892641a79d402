use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    UnderConstruction,
    Complete,
}

#[derive(Debug, Clone)]
pub struct FileDetails {
    pub path: String,
    pub replication: usize,
    pub block_size: u64,
    /// hint given at create, re-used for later blocks of the same file
    pub favored_nodes: Vec<SocketAddr>,
    pub blocks: Vec<String>,
    pub state: FileState,
    pub length: u64,
}

impl FileDetails {
    pub fn new(
        path: String,
        replication: usize,
        block_size: u64,
        favored_nodes: Vec<SocketAddr>,
    ) -> Self {
        Self {
            path,
            replication,
            block_size,
            favored_nodes,
            blocks: vec![],
            state: FileState::UnderConstruction,
            length: 0,
        }
    }
    pub fn is_under_construction(&self) -> bool {
        self.state == FileState::UnderConstruction
    }
    /// Start of the block after the current last one, `None` once a further
    /// full block would run past the largest representable offset.
    pub fn next_block_offset(&self) -> Option<u64> {
        let offset = (self.blocks.len() as u64).checked_mul(self.block_size)?;
        offset.checked_add(self.block_size)?;
        Some(offset)
    }
    pub fn last_block(&self) -> Option<&String> {
        self.blocks.last()
    }
}
