//! `panelwatch check`: one detection cycle, events printed.

use serde::Serialize;
use tabled::Tabled;

use panelwatch_core::{ChangeEvent, CoreError, CycleOutcome, Monitor, ViewerId};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::known_viewer;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct EventLine {
    viewer: ViewerId,
    #[serde(flatten)]
    event: ChangeEvent,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Viewer")]
    viewer: String,
    #[tabled(rename = "Panel")]
    panel: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Transition")]
    transition: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(monitor: &Monitor, args: CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let runs: Vec<(ViewerId, Result<CycleOutcome, CoreError>)> = match args.viewer {
        Some(ref raw) => {
            let viewer = known_viewer(monitor, raw).await?;
            let outcome = monitor.check(&viewer).await;
            vec![(viewer, outcome)]
        }
        None => monitor.check_all().await?,
    };

    let total = runs.len();
    let mut lines = Vec::new();
    let mut failures = Vec::new();
    for (viewer, outcome) in runs {
        match outcome {
            Ok(outcome) => lines.extend(outcome.events.into_iter().map(|event| EventLine {
                viewer: viewer.clone(),
                event,
            })),
            Err(e) => failures.push((viewer, e)),
        }
    }

    let color = output::should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &lines,
        |l| EventRow {
            viewer: l.viewer.to_string(),
            panel: l.event.panel_name.clone(),
            client: l.event.client_id.clone(),
            transition: output::paint_status(&l.event.transition.to_string(), color),
        },
        |l| format!("{}\t{}\t{}\t{}", l.viewer, l.event.panel_id, l.event.client_id, l.event.transition),
    )?;
    output::print_output(&rendered, global.quiet);

    // A single viewer's failure carries its own diagnostic.
    if total == 1 {
        if let Some((_, e)) = failures.pop() {
            return Err(e.into());
        }
    }

    for (viewer, e) in &failures {
        eprintln!("viewer {viewer}: {e}");
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::CyclesFailed {
            failed: failures.len(),
            total,
        })
    }
}
