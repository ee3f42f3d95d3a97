//! `panelwatch lists`: client ids of one status across a viewer's panels.

use serde::Serialize;
use tabled::Tabled;

use panelwatch_core::{ListKind, Monitor, PanelId};

use crate::cli::{GlobalOpts, ListsArgs, StatusArg};
use crate::error::CliError;
use crate::output;

use super::known_viewer;

#[derive(Serialize)]
struct ListEntry {
    panel_id: PanelId,
    panel_name: String,
    status: ListKind,
    client_id: String,
}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "Panel")]
    panel: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn list_kind(status: StatusArg) -> ListKind {
    match status {
        StatusArg::Online => ListKind::Online,
        StatusArg::Expiring => ListKind::Expiring,
        StatusArg::Expired => ListKind::Expired,
    }
}

pub async fn handle(monitor: &Monitor, args: ListsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let viewer = known_viewer(monitor, &args.viewer).await?;
    let snapshot = monitor.preview(&viewer).await?;
    let kind = list_kind(args.status);

    let only = args.panel.as_deref().map(PanelId::from);
    if let Some(ref id) = only {
        if snapshot.panel(id).is_none() {
            return Err(CliError::NotFound {
                resource_type: "panel".into(),
                identifier: id.to_string(),
                list_command: format!("report --viewer {viewer}"),
            });
        }
    }

    let entries: Vec<ListEntry> = snapshot
        .panels
        .iter()
        .filter(|(id, _)| only.as_ref().is_none_or(|only| only == *id))
        .flat_map(|(id, panel)| {
            panel.lists.get(kind).iter().map(move |client| ListEntry {
                panel_id: id.clone(),
                panel_name: panel.panel_name.clone(),
                status: kind,
                client_id: client.clone(),
            })
        })
        .collect();

    let color = output::should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &entries,
        |e| ListRow {
            panel: e.panel_name.clone(),
            client: e.client_id.clone(),
            status: output::paint_status(&e.status.to_string(), color),
        },
        |e| e.client_id.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
