use std::sync::Arc;

use tokio::sync::Mutex;
use utilities::logger::{info, instrument, trace, tracing};

use crate::{
    datanode::{parse_xfer_addrs_list, registry::NodeRegistry},
    error::{NamenodeError, Result},
    namenode_state::{
        NamenodeState,
        block_details::BlockDetails,
        file_details::{FileDetails, FileState},
    },
    placement::{coordinator::PlacementCoordinator, request::BlockPlacementRequest},
    protocol::{
        AddBlockRequest, CompleteFileRequest, CreateFileRequest, FileHandle,
        GetBlockLocationsRequest, GetBlockLocationsResponse, LocatedBlock,
    },
};

fn file_too_large(path: &str) -> NamenodeError {
    NamenodeError::InvalidRequest(format!("no room for another block, file is too large : {path}"))
}

/// Client facing namespace operations. Placement runs outside the namespace
/// lock so allocations for unrelated files never wait on each other.
#[derive(Clone)]
pub struct ClientHandler {
    state: Arc<Mutex<NamenodeState>>,
    registry: NodeRegistry,
    coordinator: Arc<PlacementCoordinator>,
    default_replication: usize,
    default_block_size: u64,
}

impl ClientHandler {
    pub fn new(
        state: Arc<Mutex<NamenodeState>>,
        coordinator: Arc<PlacementCoordinator>,
        default_replication: usize,
        default_block_size: u64,
    ) -> Self {
        Self {
            state,
            registry: coordinator.registry().clone(),
            coordinator,
            default_replication,
            default_block_size,
        }
    }

    fn located_block(&self, block: &BlockDetails) -> LocatedBlock {
        LocatedBlock {
            block_id: block.id.clone(),
            start_offset: block.start_offset,
            num_bytes: block.num_bytes,
            locations: block
                .locations
                .iter()
                .filter(|location| self.registry.is_alive(location))
                .copied()
                .collect(),
        }
    }

    #[instrument(name = "client_create_file", skip(self, request), fields(path = %request.path, favored = ?request.favored_nodes))]
    pub async fn create_file(&self, request: CreateFileRequest) -> Result<FileHandle> {
        if !request.path.starts_with('/') {
            return Err(NamenodeError::InvalidRequest(format!(
                "path must be absolute : {}",
                request.path
            )));
        }
        let replication = request.replication.unwrap_or(self.default_replication);
        let block_size = request.block_size.unwrap_or(self.default_block_size);
        if block_size == 0 {
            return Err(NamenodeError::InvalidRequest(
                "block size must be positive".to_owned(),
            ));
        }
        let favored_nodes = parse_xfer_addrs_list(&request.favored_nodes)?;
        if self
            .state
            .lock()
            .await
            .file_to_detail_map
            .contains_key(&request.path)
        {
            return Err(NamenodeError::FileAlreadyExists(request.path));
        }

        let placement = self.coordinator.place(
            &BlockPlacementRequest::new(replication)
                .with_favored_nodes(favored_nodes.clone())
                .with_block_size(block_size),
        )?;

        let mut state = self.state.lock().await;
        // another create for the same path may have won while we were placing
        if state.file_to_detail_map.contains_key(&request.path) {
            return Err(NamenodeError::FileAlreadyExists(request.path));
        }
        let block = BlockDetails::new(0, replication, placement.addresses());
        let located_block = self.located_block(&block);
        let mut file = FileDetails::new(request.path.clone(), replication, block_size, favored_nodes);
        file.blocks.push(block.id.clone());
        state.block_id_to_detail_map.insert(block.id.clone(), block);
        state.file_to_detail_map.insert(request.path.clone(), file);
        info!(block_id = %located_block.block_id, targets = ?located_block.locations, "File created");
        Ok(FileHandle {
            path: request.path,
            block: located_block,
        })
    }

    /// Allocates the next block of a file being written. Without a new hint the
    /// favored nodes given at create are tried again.
    #[instrument(name = "client_add_block", skip(self, request), fields(path = %request.path))]
    pub async fn add_block(&self, request: AddBlockRequest) -> Result<LocatedBlock> {
        let favored_nodes = parse_xfer_addrs_list(&request.favored_nodes)?;
        let placement_request = {
            let state = self.state.lock().await;
            let file = state
                .file_to_detail_map
                .get(&request.path)
                .ok_or_else(|| NamenodeError::FileNotFound(request.path.clone()))?;
            if !file.is_under_construction() {
                return Err(NamenodeError::FileNotUnderConstruction(request.path));
            }
            if file.next_block_offset().is_none() {
                return Err(file_too_large(&request.path));
            }
            let hint = if favored_nodes.is_empty() {
                file.favored_nodes.clone()
            } else {
                favored_nodes
            };
            BlockPlacementRequest::new(file.replication)
                .with_favored_nodes(hint)
                .with_block_size(file.block_size)
        };

        let placement = self.coordinator.place(&placement_request)?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let file = state
            .file_to_detail_map
            .get_mut(&request.path)
            .ok_or_else(|| NamenodeError::FileNotFound(request.path.clone()))?;
        if !file.is_under_construction() {
            return Err(NamenodeError::FileNotUnderConstruction(request.path));
        }
        let start_offset = file
            .next_block_offset()
            .ok_or_else(|| file_too_large(&request.path))?;
        // every block but the last one is full
        if let Some(previous) = file
            .last_block()
            .and_then(|block_id| state.block_id_to_detail_map.get_mut(block_id))
        {
            previous.commit(file.block_size);
        }
        let block = BlockDetails::new(start_offset, file.replication, placement.addresses());
        file.blocks.push(block.id.clone());
        let located_block = self.located_block(&block);
        state.block_id_to_detail_map.insert(block.id.clone(), block);
        trace!(?located_block, "Block allocated");
        Ok(located_block)
    }

    #[instrument(name = "client_complete_file", skip(self, request), fields(path = %request.path, length = request.length))]
    pub async fn complete_file(&self, request: CompleteFileRequest) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let file = state
            .file_to_detail_map
            .get_mut(&request.path)
            .ok_or_else(|| NamenodeError::FileNotFound(request.path.clone()))?;
        if !file.is_under_construction() {
            return Err(NamenodeError::FileNotUnderConstruction(request.path));
        }
        let last_block = file
            .last_block()
            .and_then(|block_id| state.block_id_to_detail_map.get_mut(block_id))
            .ok_or_else(|| {
                NamenodeError::InvalidRequest(format!("file has no blocks : {}", request.path))
            })?;
        // the last block can always reach the largest offset
        let last_block_end = last_block.start_offset.saturating_add(file.block_size);
        if request.length < last_block.start_offset || request.length > last_block_end {
            return Err(NamenodeError::InvalidRequest(format!(
                "length {} does not end in the last block [{}, {}]",
                request.length, last_block.start_offset, last_block_end
            )));
        }
        last_block.commit(request.length - last_block.start_offset);
        file.length = request.length;
        file.state = FileState::Complete;
        info!("File completed");
        Ok(())
    }

    #[instrument(name = "client_get_block_locations", skip(self, request), fields(path = %request.path, offset = request.offset, length = request.length))]
    pub async fn get_block_locations(
        &self,
        request: GetBlockLocationsRequest,
    ) -> Result<GetBlockLocationsResponse> {
        let state = self.state.lock().await;
        let blocks = state
            .blocks_in_range(&request.path, request.offset, request.length)
            .ok_or_else(|| NamenodeError::FileNotFound(request.path.clone()))?
            .into_iter()
            .map(|block| self.located_block(block))
            .collect();
        Ok(GetBlockLocationsResponse {
            path: request.path,
            blocks,
        })
    }

    /// Returns whether the file existed. Replicas are reclaimed through block reports.
    #[instrument(name = "client_delete_file", skip(self))]
    pub async fn delete_file(&self, path: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(file) = state.file_to_detail_map.remove(path) else {
            return Ok(false);
        };
        for block_id in &file.blocks {
            if let Some(block_details) = state.block_id_to_detail_map.get_mut(block_id) {
                block_details.mark_deleted();
            }
        }
        trace!(blocks = ?file.blocks, "File deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::{
        config::PlacementConfig, datanode::selection_policy::random_source::SeededRandom,
        error::PlacementError,
    };

    fn addrs(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn handler(datanodes: u16) -> (NodeRegistry, Arc<Mutex<NamenodeState>>, ClientHandler) {
        let registry = NodeRegistry::new();
        for port in 0..datanodes {
            registry.register(addrs(9000 + port), &format!("dn-{port}"), 1 << 30);
        }
        let coordinator = Arc::new(PlacementCoordinator::new(
            registry.clone(),
            &PlacementConfig::default(),
            Arc::new(SeededRandom::new(17)),
        ));
        let state = Arc::new(Mutex::new(NamenodeState::new()));
        let handler = ClientHandler::new(state.clone(), coordinator, 3, 100);
        (registry, state, handler)
    }

    fn create(path: &str, favored_nodes: &[SocketAddr]) -> CreateFileRequest {
        CreateFileRequest {
            path: path.to_owned(),
            replication: None,
            block_size: None,
            favored_nodes: favored_nodes.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn locations(path: &str) -> GetBlockLocationsRequest {
        GetBlockLocationsRequest {
            path: path.to_owned(),
            offset: 0,
            length: u64::MAX,
        }
    }

    #[tokio::test]
    async fn create_places_first_block_on_favored_nodes() {
        let (_, _, handler) = handler(6);
        let favored = [addrs(9004), addrs(9001), addrs(9002)];
        let handle = handler.create_file(create("/a", &favored)).await.unwrap();
        assert_eq!(handle.block.locations, favored.to_vec());
        assert_eq!(handle.block.start_offset, 0);
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_bad_input() {
        let (_, _, handler) = handler(3);
        handler.create_file(create("/a", &[])).await.unwrap();
        assert!(matches!(
            handler.create_file(create("/a", &[])).await,
            Err(NamenodeError::FileAlreadyExists(_))
        ));
        assert!(matches!(
            handler.create_file(create("relative", &[])).await,
            Err(NamenodeError::InvalidRequest(_))
        ));
        let mut malformed = create("/b", &[]);
        malformed.favored_nodes = vec!["not-an-address".to_owned()];
        assert!(matches!(
            handler.create_file(malformed).await,
            Err(NamenodeError::InvalidAddress { .. })
        ));
        let mut zero = create("/c", &[]);
        zero.replication = Some(0);
        assert!(matches!(
            handler.create_file(zero).await,
            Err(NamenodeError::Placement(PlacementError::InvalidRequest(_)))
        ));
    }

    #[tokio::test]
    async fn failed_placement_leaves_no_trace() {
        let (_, state, handler) = handler(2);
        let err = handler.create_file(create("/a", &[])).await.unwrap_err();
        assert!(matches!(
            err,
            NamenodeError::Placement(PlacementError::InsufficientNodes {
                required: 3,
                available: 2
            })
        ));
        let state = state.lock().await;
        assert!(state.file_to_detail_map.is_empty());
        assert!(state.block_id_to_detail_map.is_empty());
    }

    #[tokio::test]
    async fn blocks_follow_each_other() {
        let (_, _, handler) = handler(5);
        let favored = [addrs(9000), addrs(9001), addrs(9002)];
        handler.create_file(create("/a", &favored)).await.unwrap();
        let second = handler
            .add_block(AddBlockRequest {
                path: "/a".to_owned(),
                favored_nodes: vec![],
            })
            .await
            .unwrap();
        // the create hint carries over
        assert_eq!(second.locations, favored.to_vec());
        assert_eq!(second.start_offset, 100);
        handler
            .complete_file(CompleteFileRequest {
                path: "/a".to_owned(),
                length: 150,
            })
            .await
            .unwrap();

        let all = handler.get_block_locations(locations("/a")).await.unwrap();
        assert_eq!(
            all.blocks
                .iter()
                .map(|b| (b.start_offset, b.num_bytes))
                .collect::<Vec<_>>(),
            vec![(0, 100), (100, 50)]
        );
        let tail = handler
            .get_block_locations(GetBlockLocationsRequest {
                path: "/a".to_owned(),
                offset: 120,
                length: 10,
            })
            .await
            .unwrap();
        assert_eq!(tail.blocks.len(), 1);
        assert_eq!(tail.blocks[0].block_id, second.block_id);

        assert!(matches!(
            handler
                .add_block(AddBlockRequest {
                    path: "/a".to_owned(),
                    favored_nodes: vec![],
                })
                .await,
            Err(NamenodeError::FileNotUnderConstruction(_))
        ));
    }

    #[tokio::test]
    async fn complete_checks_length() {
        let (_, _, handler) = handler(3);
        handler.create_file(create("/a", &[])).await.unwrap();
        let err = handler
            .complete_file(CompleteFileRequest {
                path: "/a".to_owned(),
                length: 101,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NamenodeError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn huge_block_size_never_overflows_offsets() {
        let (_, state, handler) = handler(3);
        let mut huge = create("/big", &[]);
        huge.block_size = Some(u64::MAX);
        handler.create_file(huge).await.unwrap();
        let next = AddBlockRequest {
            path: "/big".to_owned(),
            favored_nodes: vec![],
        };
        for _ in 0..2 {
            assert!(matches!(
                handler.add_block(next.clone()).await,
                Err(NamenodeError::InvalidRequest(_))
            ));
        }
        assert_eq!(state.lock().await.block_id_to_detail_map.len(), 1);

        handler
            .complete_file(CompleteFileRequest {
                path: "/big".to_owned(),
                length: u64::MAX,
            })
            .await
            .unwrap();
        let response = handler.get_block_locations(locations("/big")).await.unwrap();
        assert_eq!(response.blocks.len(), 1);
        assert_eq!(response.blocks[0].num_bytes, u64::MAX);

        // two blocks of half the address space fit, a third does not
        let mut half = create("/half", &[]);
        half.block_size = Some(u64::MAX / 2);
        handler.create_file(half).await.unwrap();
        let second = handler
            .add_block(AddBlockRequest {
                path: "/half".to_owned(),
                favored_nodes: vec![],
            })
            .await
            .unwrap();
        assert_eq!(second.start_offset, u64::MAX / 2);
        assert!(matches!(
            handler
                .add_block(AddBlockRequest {
                    path: "/half".to_owned(),
                    favored_nodes: vec![],
                })
                .await,
            Err(NamenodeError::InvalidRequest(_))
        ));
        handler
            .complete_file(CompleteFileRequest {
                path: "/half".to_owned(),
                length: u64::MAX,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn locations_hide_dead_holders() {
        let (registry, _, handler) = handler(3);
        handler.create_file(create("/a", &[])).await.unwrap();
        registry.mark_dead(&addrs(9001));
        let response = handler.get_block_locations(locations("/a")).await.unwrap();
        assert_eq!(response.blocks[0].locations.len(), 2);
        assert!(!response.blocks[0].locations.contains(&addrs(9001)));
    }

    #[tokio::test]
    async fn delete_file_marks_blocks() {
        let (_, state, handler) = handler(3);
        let handle = handler.create_file(create("/a", &[])).await.unwrap();
        assert!(handler.delete_file("/a").await.unwrap());
        assert!(!handler.delete_file("/a").await.unwrap());
        assert!(state.lock().await.block_id_to_detail_map[&handle.block.block_id].is_deleted());
        assert!(matches!(
            handler.get_block_locations(locations("/a")).await,
            Err(NamenodeError::FileNotFound(_))
        ));
    }
}
