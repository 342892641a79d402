use std::{collections::HashSet, net::SocketAddr, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    UnderConstruction,
    Commited,
    Deleted(Instant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReplicationStatus {
    Balanced,
    Underreplicated(usize),
    Lost,
}

#[derive(Debug, Clone)]
pub struct BlockDetails {
    pub id: String,
    pub start_offset: u64,
    pub num_bytes: u64,
    pub replication: usize,
    pub locations: Vec<SocketAddr>,
    pub state: BlockState,
    pub replication_scheduled: Option<Instant>,
}

impl BlockDetails {
    pub fn new(start_offset: u64, replication: usize, locations: Vec<SocketAddr>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_offset,
            num_bytes: 0,
            replication,
            locations,
            state: BlockState::UnderConstruction,
            replication_scheduled: None,
        }
    }
    pub fn commit(&mut self, num_bytes: u64) {
        self.num_bytes = num_bytes;
        self.state = BlockState::Commited;
    }
    pub fn is_commited(&self) -> bool {
        self.state == BlockState::Commited
    }
    pub fn add_location(&mut self, xfer_addrs: SocketAddr) {
        if !self.locations.contains(&xfer_addrs) {
            self.locations.push(xfer_addrs);
            self.replication_scheduled = None;
        }
    }
    pub fn remove_location(&mut self, xfer_addrs: &SocketAddr) {
        self.locations.retain(|location| location != xfer_addrs);
    }
    pub fn remove_invalid_locations(&mut self, dead_datanodes: &HashSet<SocketAddr>) {
        self.locations
            .retain(|location| !dead_datanodes.contains(location));
    }
    pub fn mark_deleted(&mut self) {
        self.state = BlockState::Deleted(Instant::now())
    }
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, BlockState::Deleted(_))
    }
    pub fn get_replication_status(&self) -> BlockReplicationStatus {
        match self.locations.len() {
            0 => BlockReplicationStatus::Lost,
            held if held < self.replication => {
                BlockReplicationStatus::Underreplicated(self.replication - held)
            }
            _ => BlockReplicationStatus::Balanced,
        }
    }
    /// Whether any byte of `[offset, end)` lives in this block. An empty block
    /// still being written counts as covering its start offset.
    pub fn overlaps(&self, offset: u64, end: u64) -> bool {
        let block_end = self.start_offset.saturating_add(self.num_bytes);
        self.start_offset < end
            && (block_end > offset || (self.num_bytes == 0 && self.start_offset >= offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn replication_status_follows_locations() {
        let mut block = BlockDetails::new(0, 3, vec![addrs(1), addrs(2), addrs(3)]);
        assert_eq!(block.get_replication_status(), BlockReplicationStatus::Balanced);
        block.remove_invalid_locations(&HashSet::from([addrs(2)]));
        assert_eq!(
            block.get_replication_status(),
            BlockReplicationStatus::Underreplicated(1)
        );
        block.remove_location(&addrs(1));
        block.remove_location(&addrs(3));
        assert_eq!(block.get_replication_status(), BlockReplicationStatus::Lost);
    }

    #[test]
    fn add_location_ignores_duplicates() {
        let mut block = BlockDetails::new(0, 2, vec![addrs(1)]);
        block.replication_scheduled = Some(Instant::now());
        block.add_location(addrs(1));
        assert!(block.replication_scheduled.is_some());
        block.add_location(addrs(2));
        assert_eq!(block.locations, vec![addrs(1), addrs(2)]);
        assert!(block.replication_scheduled.is_none());
    }

    #[test]
    fn overlap_of_byte_ranges() {
        let mut block = BlockDetails::new(100, 3, vec![]);
        // still being written
        assert!(block.overlaps(0, u64::MAX));
        assert!(block.overlaps(100, 101));
        assert!(!block.overlaps(0, 100));
        block.commit(50);
        assert!(block.overlaps(149, 200));
        assert!(!block.overlaps(150, 200));
        assert!(block.overlaps(0, 101));
    }
}
