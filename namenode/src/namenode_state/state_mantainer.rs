use std::collections::HashSet;
use std::net::SocketAddr;
use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc::Sender},
    task::JoinHandle,
    time::interval,
};
use utilities::logger::{Instrument, Level, debug, error, info, span, warn};

use crate::datanode::registry::NodeRegistry;
use crate::error::PlacementError;
use crate::namenode_state::NamenodeState;
use crate::namenode_state::block_details::{BlockReplicationStatus, BlockState};
use crate::placement::coordinator::PlacementCoordinator;
use crate::placement::request::BlockPlacementRequest;
use crate::protocol::ReplicationCommand;

#[derive(Debug, Clone)]
pub struct StateMantainerConfig {
    pub heartbeat_expiry: Duration,
    pub interval: Duration,
    pub replication_retry: Duration,
    pub deleted_block_grace: Duration,
}

/// To mantain the state of the namenode based on the heartbeat: expires silent
/// datanodes, forgets replicas they held and asks for new copies of blocks
/// that fell below their replication factor.
pub struct StateMantainer {
    namenode_state: Arc<Mutex<NamenodeState>>,
    registry: NodeRegistry,
    coordinator: Arc<PlacementCoordinator>,
    replication_sender: Sender<ReplicationCommand>,
    config: StateMantainerConfig,
}

impl StateMantainer {
    pub fn new(
        namenode_state: Arc<Mutex<NamenodeState>>,
        coordinator: Arc<PlacementCoordinator>,
        replication_sender: Sender<ReplicationCommand>,
        config: StateMantainerConfig,
    ) -> Self {
        Self {
            namenode_state,
            registry: coordinator.registry().clone(),
            coordinator,
            replication_sender,
            config,
        }
    }

    /// New targets for a block missing `missing` replicas. When the cluster
    /// cannot cover all of them we still ask for as many as it can take.
    fn replication_targets(
        &self,
        missing: usize,
        holders: &[SocketAddr],
        block_size: u64,
    ) -> Result<Vec<SocketAddr>, PlacementError> {
        let request = BlockPlacementRequest::new(missing)
            .with_excluded(holders.iter().copied())
            .with_block_size(block_size);
        match self.coordinator.place(&request) {
            Ok(placement) => Ok(placement.addresses()),
            Err(PlacementError::InsufficientNodes { available, .. }) if available > 0 => {
                let request = BlockPlacementRequest { replication: available, ..request };
                Ok(self.coordinator.place(&request)?.addresses())
            }
            Err(e) => Err(e),
        }
    }

    /// One pass over the namespace, returns the replication work handed to the pipeline.
    pub async fn sync_once(&self) -> usize {
        let newly_dead = self.registry.expire_stale(self.config.heartbeat_expiry);
        if !newly_dead.is_empty() {
            info!(?newly_dead, "Datanodes declared dead");
        }
        let dead_datanodes: HashSet<SocketAddr> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|datanode| !datanode.is_alive())
            .map(|datanode| datanode.xfer_addrs)
            .collect();

        let mut commands = vec![];
        {
            let mut state = self.namenode_state.lock().await;
            let grace = self.config.deleted_block_grace;
            // deleted blocks linger a little so late block reports can still be answered
            state.block_id_to_detail_map.retain(|_, block_details| {
                if let BlockState::Deleted(deleted_at) = block_details.state {
                    return deleted_at.elapsed() < grace;
                }
                true
            });
            for (block_id, block_details) in state.block_id_to_detail_map.iter_mut() {
                if block_details.is_deleted() {
                    continue;
                }
                block_details.remove_invalid_locations(&dead_datanodes);
                if !block_details.is_commited() {
                    continue;
                }
                match block_details.get_replication_status() {
                    BlockReplicationStatus::Underreplicated(missing) => {
                        if block_details
                            .replication_scheduled
                            .is_some_and(|at| at.elapsed() < self.config.replication_retry)
                        {
                            continue;
                        }
                        match self.replication_targets(
                            missing,
                            &block_details.locations,
                            block_details.num_bytes,
                        ) {
                            Ok(targets) => {
                                block_details.replication_scheduled = Some(std::time::Instant::now());
                                commands.push(ReplicationCommand {
                                    block_id: block_id.clone(),
                                    source: block_details.locations[0],
                                    targets,
                                });
                            }
                            Err(e) => {
                                warn!(%block_id, missing, error = %e, "Can't re-replicate block");
                            }
                        }
                    }
                    BlockReplicationStatus::Lost => {
                        error!(%block_id, "Every replica of the block is gone");
                    }
                    BlockReplicationStatus::Balanced => {}
                }
            }
        }

        let scheduled = commands.len();
        for command in commands {
            debug!(?command, "Scheduling re-replication");
            if let Err(e) = self.replication_sender.send(command).await {
                error!(error = %e, "Replication pipeline is gone, dropping command");
            }
        }
        scheduled
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            loop {
                ticker.tick().await;
                let span = span!(Level::INFO, "namenode_state_sync");
                self.sync_once().instrument(span).await;
            }
        })
    }
}
