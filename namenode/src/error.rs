use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("invalid placement request: {0}")]
    InvalidRequest(String),
    #[error("not enough eligible datanodes, required {required} but only {available} available")]
    InsufficientNodes { required: usize, available: usize },
}

#[derive(Debug, Error)]
pub enum NamenodeError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("file already exists: {0}")]
    FileAlreadyExists(String),
    #[error("file is not under construction: {0}")]
    FileNotUnderConstruction(String),
    #[error("malformed datanode address {addrs:?}: {reason}")]
    InvalidAddress { addrs: String, reason: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown datanode: {0}")]
    UnknownDatanode(SocketAddr),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

pub type Result<T> = std::result::Result<T, NamenodeError>;
