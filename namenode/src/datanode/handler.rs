use std::sync::Arc;

use tokio::sync::Mutex;
use utilities::logger::{instrument, trace, tracing};

use super::{parse_xfer_addrs, registry::NodeRegistry};
use crate::{
    error::{NamenodeError, Result},
    namenode_state::NamenodeState,
    protocol::{
        BlockReportRequest, BlockReportResponse, HeartBeatRequest, HeartBeatResponse,
        RegisterRequest, RegisterResponse,
    },
};

/// Registration, heartbeat and block report path used by the datanodes.
#[derive(Clone)]
pub struct DatanodeHandler {
    state: Arc<Mutex<NamenodeState>>,
    registry: NodeRegistry,
}

impl DatanodeHandler {
    pub fn new(state: Arc<Mutex<NamenodeState>>, registry: NodeRegistry) -> Self {
        Self { state, registry }
    }

    #[instrument(name = "datanode_register", skip(self, request), fields(xfer_addrs = %request.xfer_addrs))]
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse> {
        let xfer_addrs = parse_xfer_addrs(&request.xfer_addrs)?;
        let response = if self
            .registry
            .register(xfer_addrs, &request.name, request.storage_remaining)
        {
            RegisterResponse {
                connected: true,
                msg: "Registered successfully".to_owned(),
            }
        } else {
            RegisterResponse {
                connected: true,
                msg: "Registration restablished".to_owned(),
            }
        };
        Ok(response)
    }

    #[instrument(name = "datanode_heart_beat", skip(self, request), fields(xfer_addrs = %request.xfer_addrs))]
    pub async fn heart_beat(&self, request: HeartBeatRequest) -> Result<HeartBeatResponse> {
        let xfer_addrs = parse_xfer_addrs(&request.xfer_addrs)?;
        let connection_alive =
            self.registry
                .heartbeat(&xfer_addrs, request.storage_remaining, request.load);
        Ok(HeartBeatResponse { connection_alive })
    }

    /// Reconciles the blocks a datanode holds with the namespace and tells it
    /// which of its blocks are garbage.
    #[instrument(name = "datanode_block_report", skip(self, request), fields(xfer_addrs = %request.xfer_addrs))]
    pub async fn block_report(&self, request: BlockReportRequest) -> Result<BlockReportResponse> {
        let xfer_addrs = parse_xfer_addrs(&request.xfer_addrs)?;
        if self.registry.lookup(&xfer_addrs).is_none() {
            return Err(NamenodeError::UnknownDatanode(xfer_addrs));
        }
        let mut state = self.state.lock().await;
        let mut blocks_to_be_deleted = vec![];
        for block_id in &request.available_blocks {
            match state.block_id_to_detail_map.get_mut(block_id) {
                Some(block_details) if !block_details.is_deleted() => {
                    block_details.add_location(xfer_addrs);
                }
                _ => blocks_to_be_deleted.push(block_id.to_owned()),
            }
        }
        // blocks still being written may not have reached this datanode yet
        state
            .block_id_to_detail_map
            .iter_mut()
            .filter(|(_, block_details)| {
                block_details.is_commited() && block_details.locations.contains(&xfer_addrs)
            })
            .for_each(|(block_id, block_details)| {
                if !request.available_blocks.contains(block_id) {
                    trace!(%block_id, "Replica missing from block report");
                    block_details.remove_location(&xfer_addrs);
                }
            });
        Ok(BlockReportResponse {
            blocks_to_be_deleted,
        })
    }
}
