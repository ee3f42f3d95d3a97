// ── Notification dispatcher ──
//
// Paced, ordered delivery of a batch to one viewer's destination. Items
// go out in the order given; consecutive sends to the same destination
// are spaced by at least the configured pace. Pacing state is keyed by
// viewer, so a slow or failing destination never delays another one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::model::{ChangeEvent, PanelReport, ViewerId};
use crate::sink::{NotificationSink, SinkError};

/// Outcome counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
    /// Items never attempted because the destination became unavailable.
    pub dropped: usize,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.delivered + self.failed + self.dropped
    }
}

enum Item<'a> {
    Event(&'a ChangeEvent),
    Report(&'a PanelReport),
}

pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    send_pace: Duration,
    report_pace: Duration,
    last_send: DashMap<ViewerId, Instant>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, config: &MonitorConfig) -> Self {
        Self {
            sink,
            send_pace: config.send_pace,
            report_pace: config.report_pace,
            last_send: DashMap::new(),
        }
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Deliver change events in order, paced by `send_pace`.
    pub async fn dispatch_events(
        &self,
        viewer: &ViewerId,
        events: &[ChangeEvent],
    ) -> DispatchSummary {
        self.run(viewer, events.iter().map(Item::Event), self.send_pace)
            .await
    }

    /// Deliver report items in order, paced by `report_pace`.
    pub async fn dispatch_reports(
        &self,
        viewer: &ViewerId,
        reports: &[PanelReport],
    ) -> DispatchSummary {
        self.run(viewer, reports.iter().map(Item::Report), self.report_pace)
            .await
    }

    async fn run<'a, I>(&self, viewer: &ViewerId, items: I, pace: Duration) -> DispatchSummary
    where
        I: ExactSizeIterator<Item = Item<'a>>,
    {
        let mut summary = DispatchSummary::default();
        let mut remaining = items.len();

        for item in items {
            remaining -= 1;
            self.wait_turn(viewer, pace).await;

            let result = match item {
                Item::Event(event) => self.sink.deliver(viewer, event).await,
                Item::Report(report) => self.sink.deliver_report(viewer, report).await,
            };
            self.last_send.insert(viewer.clone(), Instant::now());

            match result {
                Ok(()) => summary.delivered += 1,
                Err(SinkError::DestinationUnavailable { message }) => {
                    warn!(
                        %viewer,
                        sink = self.sink.name(),
                        skipped = remaining,
                        error = %message,
                        "destination unavailable, dropping rest of batch"
                    );
                    summary.failed += 1;
                    summary.dropped = remaining;
                    break;
                }
                Err(e) => {
                    warn!(%viewer, sink = self.sink.name(), error = %e, "delivery failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.total() > 0 {
            debug!(
                %viewer,
                delivered = summary.delivered,
                failed = summary.failed,
                dropped = summary.dropped,
                "batch dispatched"
            );
        }
        summary
    }

    async fn wait_turn(&self, viewer: &ViewerId, pace: Duration) {
        let next = self.last_send.get(viewer).map(|last| *last.value() + pace);
        if let Some(next) = next {
            tokio::time::sleep_until(next).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::model::{PanelId, PanelSnapshot, Transition};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(ViewerId, String, Instant)>>,
        fail_on: Option<(&'static str, bool)>,
    }

    impl Recorder {
        fn failing(client: &'static str, gone: bool) -> Self {
            Self {
                sent: Mutex::default(),
                fail_on: Some((client, gone)),
            }
        }

        fn sent(&self) -> Vec<(ViewerId, String, Instant)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn deliver(&self, viewer: &ViewerId, event: &ChangeEvent) -> Result<(), SinkError> {
            self.sent
                .lock()
                .unwrap()
                .push((viewer.clone(), event.client_id.clone(), Instant::now()));
            match self.fail_on {
                Some((id, true)) if id == event.client_id => {
                    Err(SinkError::DestinationUnavailable {
                        message: "blocked".into(),
                    })
                }
                Some((id, false)) if id == event.client_id => Err(SinkError::failed("flaky")),
                _ => Ok(()),
            }
        }

        async fn deliver_report(
            &self,
            viewer: &ViewerId,
            report: &PanelReport,
        ) -> Result<(), SinkError> {
            self.sent
                .lock()
                .unwrap()
                .push((viewer.clone(), report.panel_id.to_string(), Instant::now()));
            Ok(())
        }
    }

    fn events(ids: &[&str]) -> Vec<ChangeEvent> {
        ids.iter()
            .map(|id| ChangeEvent {
                panel_id: PanelId::from("1"),
                panel_name: "Main".into(),
                client_id: (*id).to_owned(),
                transition: Transition::EnteredExpiring,
            })
            .collect()
    }

    fn dispatcher(sink: Arc<Recorder>) -> Dispatcher {
        Dispatcher::new(sink, &MonitorConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn sends_are_ordered_and_paced() {
        let sink = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&sink));
        let viewer = ViewerId::from("v");

        let summary = d.dispatch_events(&viewer, &events(&["a", "b", "c"])).await;
        assert_eq!(summary.delivered, 3);

        let sent = sink.sent();
        let order: Vec<&str> = sent.iter().map(|(_, id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        for pair in sent.windows(2) {
            assert!(pair[1].2 - pair[0].2 >= Duration::from_millis(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_carries_across_batches() {
        let sink = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&sink));
        let viewer = ViewerId::from("v");

        d.dispatch_events(&viewer, &events(&["a"])).await;
        d.dispatch_events(&viewer, &events(&["b"])).await;

        let sent = sink.sent();
        assert!(sent[1].2 - sent[0].2 >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn destinations_do_not_wait_on_each_other() {
        let sink = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&sink));
        let start = Instant::now();

        d.dispatch_events(&ViewerId::from("v1"), &events(&["a"])).await;
        d.dispatch_events(&ViewerId::from("v2"), &events(&["b"])).await;

        let sent = sink.sent();
        assert_eq!(sent[1].2, start);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_failure_skips_only_that_event() {
        let sink = Arc::new(Recorder::failing("b", false));
        let d = dispatcher(Arc::clone(&sink));

        let summary = d.dispatch_events(&ViewerId::from("v"), &events(&["a", "b", "c"])).await;
        assert_eq!(
            summary,
            DispatchSummary {
                delivered: 2,
                failed: 1,
                dropped: 0
            }
        );
        assert_eq!(sink.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_destination_drops_rest_of_batch() {
        let sink = Arc::new(Recorder::failing("b", true));
        let d = dispatcher(Arc::clone(&sink));

        let summary = d
            .dispatch_events(&ViewerId::from("v"), &events(&["a", "b", "c", "d"]))
            .await;
        assert_eq!(
            summary,
            DispatchSummary {
                delivered: 1,
                failed: 1,
                dropped: 2
            }
        );
        assert_eq!(sink.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_use_report_pace() {
        let sink = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&sink));
        let at = Utc::now();
        let reports: Vec<PanelReport> = ["1", "2"]
            .iter()
            .map(|id| PanelReport {
                panel_id: PanelId::from(*id),
                snapshot: PanelSnapshot::empty("P", at),
            })
            .collect();

        d.dispatch_reports(&ViewerId::from("v"), &reports).await;
        let sent = sink.sent();
        assert!(sent[1].2 - sent[0].2 >= Duration::from_millis(500));
    }
}
