pub mod admin_handler;
pub mod client_handler;
pub mod config;
pub mod datanode;
pub mod error;
pub mod namenode_server;
pub mod namenode_state;
pub mod placement;
pub mod protocol;
