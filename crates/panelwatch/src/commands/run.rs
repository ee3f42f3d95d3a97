//! `panelwatch run`: scheduler until Ctrl-C.

use panelwatch_config::Config;
use panelwatch_core::Monitor;
use tracing::info;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(monitor: &Monitor, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    if monitor.viewers().await?.is_empty() {
        return Err(CliError::NoViewers {
            path: global.config.as_ref().map_or_else(
                || panelwatch_config::config_path().display().to_string(),
                |p| p.display().to_string(),
            ),
        });
    }

    info!(
        panels = config.panels.len(),
        viewers = config.viewers.len() + config.superadmins.len(),
        "starting panelwatch"
    );
    monitor.start().await;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    monitor.shutdown().await;
    Ok(())
}
