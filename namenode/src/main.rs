use namenode::{config::Config, namenode_server::NamenodeServer};
use tokio::sync::mpsc;
use utilities::{
    logger::{error, info, init_logger, warn},
    result::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let _gaurd = init_logger(
        "Namenode",
        &config.id,
        &config.log_level,
        config.apm_endpoint.as_deref(),
        &config.log_base,
    )?;
    info!(
        id = %config.id,
        replication = config.default_replication,
        block_size = config.block_size,
        policy = ?config.placement.policy,
        "Starting namenode"
    );

    let (replication_sender, mut replication_receiver) = mpsc::channel(256);
    let server = NamenodeServer::new(&config, replication_sender);
    let state_mantainer = server.state_mantainer.start();

    // the transfer pipeline lives outside the namenode, until one is attached
    // the commands are only surfaced in the logs
    tokio::spawn(async move {
        while let Some(command) = replication_receiver.recv().await {
            warn!(
                block_id = %command.block_id,
                source = %command.source,
                targets = ?command.targets,
                "Re-replication requested but no pipeline is attached"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!(datanodes = server.registry.len(), "Shutting down namenode");
    state_mantainer.abort();
    if let Err(e) = state_mantainer.await {
        if !e.is_cancelled() {
            error!(error = %e, "State mantainer exited abnormally");
        }
    }
    Ok(())
}
