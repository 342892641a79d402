pub mod eligibility;
pub mod handler;
pub mod registry;
pub mod selection_policy;

use std::net::SocketAddr;

use crate::error::{NamenodeError, Result};

/// Datanodes are addressed by resolved ip and transfer port, hostnames are not accepted.
pub fn parse_xfer_addrs(addrs: &str) -> Result<SocketAddr> {
    addrs
        .trim()
        .parse::<SocketAddr>()
        .map_err(|e| NamenodeError::InvalidAddress {
            addrs: addrs.to_owned(),
            reason: e.to_string(),
        })
}

pub fn parse_xfer_addrs_list(addrs_list: &[String]) -> Result<Vec<SocketAddr>> {
    addrs_list
        .iter()
        .map(|addrs| parse_xfer_addrs(addrs))
        .collect()
}
