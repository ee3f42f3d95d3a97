//! `panelwatch report`: per-panel counts and usage for one viewer.

use tabled::Tabled;

use panelwatch_core::{Monitor, PanelId, PanelReport};

use crate::cli::{GlobalOpts, ReportArgs};
use crate::error::CliError;
use crate::output;

use super::known_viewer;

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Panel")]
    panel: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Users")]
    users: usize,
    #[tabled(rename = "Online")]
    online: usize,
    #[tabled(rename = "Expiring")]
    expiring: usize,
    #[tabled(rename = "Expired")]
    expired: usize,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
}

impl From<&PanelReport> for ReportRow {
    fn from(r: &PanelReport) -> Self {
        let s = &r.snapshot;
        Self {
            panel: r.panel_id.to_string(),
            name: s.panel_name.clone(),
            users: s.counts.users,
            online: s.counts.online,
            expiring: s.counts.expiring,
            expired: s.counts.expired,
            used: output::bytes(Some(s.usage.used_bytes)),
            remaining: if s.usage.unlimited {
                "unlimited".into()
            } else {
                output::bytes(s.usage.remaining_bytes)
            },
        }
    }
}

pub async fn handle(monitor: &Monitor, args: ReportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let viewer = known_viewer(monitor, &args.viewer).await?;
    let snapshot = monitor.preview(&viewer).await?;

    let reports: Vec<PanelReport> = match args.panel {
        Some(ref raw) => {
            let panel_id = PanelId::from(raw.as_str());
            let panel = snapshot.panel(&panel_id).ok_or_else(|| CliError::NotFound {
                resource_type: "panel".into(),
                identifier: raw.clone(),
                list_command: format!("report --viewer {viewer}"),
            })?;
            vec![PanelReport {
                panel_id,
                snapshot: panel.clone(),
            }]
        }
        // Same selection as the daily report: panels with users only.
        None => snapshot
            .panels
            .into_iter()
            .filter(|(_, p)| p.counts.users > 0)
            .map(|(panel_id, snapshot)| PanelReport { panel_id, snapshot })
            .collect(),
    };

    let rendered = output::render_list(
        &global.output,
        &reports,
        |r| ReportRow::from(r),
        |r| r.panel_id.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
