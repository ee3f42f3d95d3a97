//! Command dispatch: wires config into a `Monitor`, then runs the handler.

pub mod check;
pub mod config_cmd;
pub mod lists;
pub mod report;
pub mod run;

use std::sync::Arc;

use panelwatch_config::Config;
use panelwatch_core::{Monitor, ViewerId, XuiPanelSource};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Load the config named by `--config` (or the default path).
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(panelwatch_config::load_config(global.config.as_deref())?)
}

/// Assemble the full pipeline from a loaded config.
pub fn build_monitor(config: &Config) -> Result<Monitor, CliError> {
    let monitor_config = config.monitor_config();
    let registry = Arc::new(config.panel_registry()?);
    let resolver = Arc::new(config.scope_resolver(Arc::clone(&registry))?);
    let source = Arc::new(XuiPanelSource::from_config(&monitor_config));
    let store = config.snapshot_store();
    let sink = config.notification_sink()?;

    Ok(Monitor::new(
        monitor_config,
        resolver,
        registry,
        source,
        store,
        sink,
    ))
}

/// Dispatch a monitor-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    monitor: &Monitor,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(monitor, config, global).await,
        Command::Check(args) => check::handle(monitor, args, global).await,
        Command::Report(args) => report::handle(monitor, args, global).await,
        Command::Lists(args) => lists::handle(monitor, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not need a monitor".into(),
        }),
    }
}

/// Resolve `--viewer` against the configured viewers.
pub async fn known_viewer(monitor: &Monitor, raw: &str) -> Result<ViewerId, CliError> {
    let viewer = ViewerId::from(raw);
    if monitor.viewers().await?.contains(&viewer) {
        Ok(viewer)
    } else {
        Err(CliError::NotFound {
            resource_type: "viewer".into(),
            identifier: raw.into(),
            list_command: "config show".into(),
        })
    }
}
