use utilities::logger::{info, instrument, tracing};

use crate::{
    datanode::{parse_xfer_addrs, registry::NodeRegistry},
    error::{NamenodeError, Result},
    namenode_state::datanode_details::DatanodeReport,
};

/// Operator facing controls. Decommissioning only affects placement decisions
/// made afterwards, replicas already written stay where they are.
#[derive(Clone)]
pub struct AdminHandler {
    registry: NodeRegistry,
}

impl AdminHandler {
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    #[instrument(name = "admin_mark_decommissioned", skip(self))]
    pub async fn mark_decommissioned(&self, xfer_addrs: &str) -> Result<()> {
        let xfer_addrs = parse_xfer_addrs(xfer_addrs)?;
        if !self.registry.mark_decommissioned(&xfer_addrs) {
            return Err(NamenodeError::UnknownDatanode(xfer_addrs));
        }
        info!(%xfer_addrs, "Datanode decommissioned");
        Ok(())
    }

    #[instrument(name = "admin_clear_decommissioned", skip(self))]
    pub async fn clear_decommissioned(&self, xfer_addrs: &str) -> Result<()> {
        let xfer_addrs = parse_xfer_addrs(xfer_addrs)?;
        if !self.registry.clear_decommissioned(&xfer_addrs) {
            return Err(NamenodeError::UnknownDatanode(xfer_addrs));
        }
        info!(%xfer_addrs, "Datanode back in service");
        Ok(())
    }

    pub async fn datanode_report(&self) -> Vec<DatanodeReport> {
        let mut report: Vec<DatanodeReport> = self
            .registry
            .list_all()
            .iter()
            .map(DatanodeReport::from)
            .collect();
        report.sort_by_key(|datanode| datanode.xfer_addrs);
        report
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::namenode_state::datanode_details::{AdminState, DatanodeState};

    fn addrs(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn toggles_decommission() {
        let registry = NodeRegistry::new();
        registry.register(addrs(2), "dn-2", 10);
        registry.register(addrs(1), "dn-1", 10);
        let admin = AdminHandler::new(registry.clone());

        admin.mark_decommissioned("127.0.0.1:1").await.unwrap();
        let report = admin.datanode_report().await;
        assert_eq!(report[0].xfer_addrs, addrs(1));
        assert_eq!(report[0].admin_state, AdminState::Decommissioned);
        assert_eq!(report[1].admin_state, AdminState::Normal);
        assert_eq!(report[1].state, DatanodeState::Alive);

        admin.clear_decommissioned("127.0.0.1:1").await.unwrap();
        assert!(!registry.lookup(&addrs(1)).unwrap().is_decommissioned());
    }

    #[tokio::test]
    async fn unknown_or_malformed_address() {
        let admin = AdminHandler::new(NodeRegistry::new());
        assert!(matches!(
            admin.mark_decommissioned("127.0.0.1:5").await,
            Err(NamenodeError::UnknownDatanode(_))
        ));
        assert!(matches!(
            admin.clear_decommissioned("nowhere").await,
            Err(NamenodeError::InvalidAddress { .. })
        ));
    }
}
