// ── Monitor ──
//
// Owns the whole pipeline: builder → detector → dispatcher, plus the
// scheduler that drives it. At most one cycle per viewer is in flight
// (per-viewer async mutex); distinct viewers run concurrently.

use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::builder::SnapshotBuilder;
use crate::config::MonitorConfig;
use crate::detect::ChangeDetector;
use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::error::CoreError;
use crate::model::{ChangeEvent, PanelReport, ViewerId, ViewerSnapshot};
use crate::scope::{PanelRegistry, ScopeResolver};
use crate::sink::NotificationSink;
use crate::source::PanelSource;
use crate::store::SnapshotStore;

// ── CycleOutcome ─────────────────────────────────────────────────

/// What one check or report cycle did for one viewer.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub viewer: ViewerId,
    pub snapshot: ViewerSnapshot,
    pub events: Vec<ChangeEvent>,
    pub events_sent: DispatchSummary,
    /// Empty for check cycles.
    pub reports_sent: DispatchSummary,
}

// ── Monitor ──────────────────────────────────────────────────────

/// The engine's entry point.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Call [`check`](Self::check)
/// or [`report`](Self::report) for one-off cycles, or
/// [`start`](Self::start) to run them on a schedule.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    builder: SnapshotBuilder,
    detector: ChangeDetector,
    dispatcher: Dispatcher,
    viewer_locks: DashMap<ViewerId, Arc<Mutex<()>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        resolver: Arc<dyn ScopeResolver>,
        registry: Arc<PanelRegistry>,
        source: Arc<dyn PanelSource>,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let builder = SnapshotBuilder::new(resolver, registry, source, &config);
        let detector = ChangeDetector::new(store);
        let dispatcher = Dispatcher::new(sink, &config);

        Self {
            inner: Arc::new(MonitorInner {
                config,
                builder,
                detector,
                dispatcher,
                viewer_locks: DashMap::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Every viewer scheduled runs visit.
    pub async fn viewers(&self) -> Result<Vec<ViewerId>, CoreError> {
        self.inner.builder.resolver().viewers().await
    }

    /// Build a snapshot without touching the store or any sink.
    pub async fn preview(&self, viewer: &ViewerId) -> Result<ViewerSnapshot, CoreError> {
        self.inner.builder.build(viewer).await
    }

    // ── Cycles ───────────────────────────────────────────────────

    /// One check cycle: build, detect against the stored generation,
    /// advance it, then deliver the resulting events.
    ///
    /// Fails only when scope resolution or the store fails; in that case
    /// nothing was stored or sent.
    pub async fn check(&self, viewer: &ViewerId) -> Result<CycleOutcome, CoreError> {
        let span = info_span!("cycle", kind = "check", %viewer, cycle_id = %Uuid::new_v4());
        self.cycle(viewer, false).instrument(span).await
    }

    /// Full report: a check cycle followed by one report item per panel
    /// that has at least one user.
    pub async fn report(&self, viewer: &ViewerId) -> Result<CycleOutcome, CoreError> {
        let span = info_span!("cycle", kind = "report", %viewer, cycle_id = %Uuid::new_v4());
        self.cycle(viewer, true).instrument(span).await
    }

    /// [`check`](Self::check) every viewer concurrently.
    pub async fn check_all(&self) -> Result<Vec<(ViewerId, Result<CycleOutcome, CoreError>)>, CoreError> {
        let viewers = self.viewers().await?;
        let runs = viewers.into_iter().map(|viewer| async move {
            let outcome = self.check(&viewer).await;
            (viewer, outcome)
        });
        Ok(join_all(runs).await)
    }

    /// [`report`](Self::report) every viewer concurrently.
    pub async fn report_all(&self) -> Result<Vec<(ViewerId, Result<CycleOutcome, CoreError>)>, CoreError> {
        let viewers = self.viewers().await?;
        let runs = viewers.into_iter().map(|viewer| async move {
            let outcome = self.report(&viewer).await;
            (viewer, outcome)
        });
        Ok(join_all(runs).await)
    }

    async fn cycle(&self, viewer: &ViewerId, with_report: bool) -> Result<CycleOutcome, CoreError> {
        let lock = self.viewer_lock(viewer);
        let _guard = lock.lock().await;

        let built = self.inner.builder.build_detailed(viewer, Utc::now()).await?;
        let snapshot = built.snapshot;
        let events = self
            .inner
            .detector
            .detect_and_advance_retaining(viewer, &snapshot, &built.unavailable)
            .await?;
        let events_sent = self.inner.dispatcher.dispatch_events(viewer, &events).await;

        let reports_sent = if with_report {
            let reports: Vec<PanelReport> = snapshot
                .panels
                .iter()
                .filter(|(_, panel)| panel.counts.users > 0)
                .map(|(id, panel)| PanelReport {
                    panel_id: id.clone(),
                    snapshot: panel.clone(),
                })
                .collect();
            self.inner.dispatcher.dispatch_reports(viewer, &reports).await
        } else {
            DispatchSummary::default()
        };

        info!(
            panels = snapshot.panels.len(),
            events = events.len(),
            delivered = events_sent.delivered + reports_sent.delivered,
            "cycle complete"
        );

        Ok(CycleOutcome {
            viewer: viewer.clone(),
            snapshot,
            events,
            events_sent,
            reports_sent,
        })
    }

    fn viewer_lock(&self, viewer: &ViewerId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.inner
                .viewer_locks
                .entry(viewer.clone())
                .or_default()
                .value(),
        )
    }

    // ── Scheduler lifecycle ──────────────────────────────────────

    /// Spawn the interval check task and the daily report task.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;

        let monitor = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(check_task(monitor, cancel)));

        let monitor = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(daily_report_task(monitor, cancel)));

        info!(
            interval_secs = self.inner.config.check_interval.as_secs(),
            daily_at = %self.inner.config.daily_report_at,
            utc_offset = %self.inner.config.utc_offset,
            "scheduler started"
        );
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("scheduler stopped");
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Check every viewer on a fixed interval. The first tick fires
/// immediately so a fresh process establishes its baselines right away.
/// Cancellation also abandons a cycle that is still running.
async fn check_task(monitor: Monitor, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(monitor.inner.config.check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = monitor.check_all() => log_run("check", result),
            },
        }
    }
}

/// Report every viewer once a day at the configured local time.
async fn daily_report_task(monitor: Monitor, cancel: CancellationToken) {
    let config = &monitor.inner.config;

    loop {
        let now = Utc::now();
        let next = next_daily_run(now, config.daily_report_at, config.utc_offset);
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(next = %next, "next daily report scheduled");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = monitor.report_all() => log_run("report", result),
            },
        }
    }
}

fn log_run(kind: &str, result: Result<Vec<(ViewerId, Result<CycleOutcome, CoreError>)>, CoreError>) {
    match result {
        Ok(outcomes) => {
            for (viewer, outcome) in outcomes {
                if let Err(e) = outcome {
                    warn!(%viewer, kind, error = %e, "cycle aborted, will retry next trigger");
                }
            }
        }
        Err(e) => warn!(kind, error = %e, "cannot list viewers"),
    }
}

/// First instant strictly after `now` whose wall-clock time in `offset`
/// is `at`.
pub fn next_daily_run(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive().and_time(at);
    let candidate = offset
        .from_local_datetime(&today)
        .single()
        .unwrap_or(local_now);

    let next = if candidate > local_now {
        candidate
    } else {
        candidate
            .checked_add_days(Days::new(1))
            .unwrap_or(candidate)
    };
    next.with_timezone(&Utc)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn tehran() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600 + 30 * 60).unwrap()
    }

    #[test]
    fn next_run_later_today() {
        // 18:00 local
        let now = utc("2024-05-01T14:30:00Z");
        let at = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(next_daily_run(now, at, tehran()), utc("2024-05-01T16:30:00Z"));
    }

    #[test]
    fn next_run_rolls_to_tomorrow() {
        // 00:00:00 local exactly: already due, so tomorrow
        let now = utc("2024-05-01T20:30:00Z");
        let at = NaiveTime::MIN;
        assert_eq!(next_daily_run(now, at, tehran()), utc("2024-05-02T20:30:00Z"));
    }

    #[test]
    fn next_run_in_utc() {
        let now = utc("2024-12-31T23:59:59Z");
        let at = NaiveTime::MIN;
        let offset = FixedOffset::east_opt(0).unwrap();
        assert_eq!(next_daily_run(now, at, offset), utc("2025-01-01T00:00:00Z"));
    }
}
