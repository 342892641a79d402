use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, mpsc::Sender};

use crate::{
    admin_handler::AdminHandler,
    client_handler::ClientHandler,
    config::Config,
    datanode::{
        handler::DatanodeHandler,
        registry::NodeRegistry,
        selection_policy::random_source::{RandomSource, SeededRandom, ThreadRandom},
    },
    namenode_state::{
        NamenodeState,
        state_mantainer::{StateMantainer, StateMantainerConfig},
    },
    placement::coordinator::PlacementCoordinator,
    protocol::ReplicationCommand,
};

/// Every handler of one namenode, sharing a single registry and namespace.
pub struct NamenodeServer {
    pub client: ClientHandler,
    pub datanode: DatanodeHandler,
    pub admin: AdminHandler,
    pub state_mantainer: StateMantainer,
    pub registry: NodeRegistry,
}

impl NamenodeServer {
    pub fn new(config: &Config, replication_sender: Sender<ReplicationCommand>) -> Self {
        let random: Arc<dyn RandomSource> = match config.placement.seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        Self::with_random(config, random, replication_sender)
    }

    pub fn with_random(
        config: &Config,
        random: Arc<dyn RandomSource>,
        replication_sender: Sender<ReplicationCommand>,
    ) -> Self {
        let registry = NodeRegistry::new();
        let state = Arc::new(Mutex::new(NamenodeState::new()));
        let coordinator = Arc::new(PlacementCoordinator::new(
            registry.clone(),
            &config.placement,
            random,
        ));
        let state_mantainer = StateMantainer::new(
            state.clone(),
            coordinator.clone(),
            replication_sender,
            StateMantainerConfig {
                heartbeat_expiry: Duration::from_secs(config.heartbeat_expiry_secs),
                interval: Duration::from_secs(config.state_sync_interval_secs.max(1)),
                replication_retry: Duration::from_secs(config.replication_retry_secs),
                deleted_block_grace: Duration::from_secs(config.deleted_block_grace_secs),
            },
        );
        Self {
            client: ClientHandler::new(
                state.clone(),
                coordinator,
                config.default_replication,
                config.block_size,
            ),
            datanode: DatanodeHandler::new(state, registry.clone()),
            admin: AdminHandler::new(registry.clone()),
            state_mantainer,
            registry,
        }
    }
}
