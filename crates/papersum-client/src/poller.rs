//! Job status polling.
//!
//! Asks the backend for a job's status on a fixed interval until the job
//! reports `done` or the request fails, then reconciles the result shape
//! and stops. Only one status request is ever in flight: each tick awaits
//! its response before the next tick is taken.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use papersum_core::{
    AnalysisView, JobOutcome, JobStatus, PollConfig, PollStep, Result, StatusResponse,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ApiClient;

/// Anything that can report a job's status
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse> {
        self.job_status(job_id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Progress {
        status: JobStatus,
        progress: Option<f64>,
        message: String,
    },
    Completed {
        outcome: JobOutcome,
    },
    Failed {
        message: String,
    },
    Cancelled,
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEvent::Progress { .. })
    }

    /// Fold this event into a view
    pub fn apply_to(self, view: &mut AnalysisView) -> PollStep {
        match self {
            PollEvent::Progress { message, .. } => {
                view.apply_outcome(JobOutcome::InProgress { message })
            }
            PollEvent::Completed { outcome } => view.apply_outcome(outcome),
            PollEvent::Failed { message } => {
                view.fail(message);
                PollStep::Stop
            }
            PollEvent::Cancelled => {
                view.cancel();
                PollStep::Stop
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    interval: Duration,
}

impl StatusPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(config.interval())
    }

    /// Poll until a terminal state, cancellation, or the receiver going away.
    ///
    /// The first request goes out immediately; later ones follow the
    /// interval. Exactly one terminal event (`Completed`, `Failed` or
    /// `Cancelled`) is sent unless the receiver was dropped or stopped
    /// reading before cancellation.
    #[instrument(skip(self, source, cancel, tx), fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn run<S>(
        &self,
        source: &S,
        job_id: &str,
        cancel: CancellationToken,
        tx: mpsc::Sender<PollEvent>,
    ) where
        S: StatusSource + ?Sized,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Polling cancelled");
                    let _ = tx.try_send(PollEvent::Cancelled);
                    return;
                }
                _ = tx.closed() => {
                    debug!("Poll receiver dropped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let response = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Polling cancelled mid-request");
                    let _ = tx.try_send(PollEvent::Cancelled);
                    return;
                }
                response = source.fetch_status(job_id) => response,
            };

            let event = match response {
                Err(e) => {
                    warn!(error = %e, "Status request failed, giving up");
                    PollEvent::Failed {
                        message: format!("Failed to fetch status: {}", e),
                    }
                }
                Ok(response) => {
                    let status = response.status.clone();
                    let progress = response.progress;
                    match response.outcome() {
                        JobOutcome::InProgress { message } => {
                            debug!(%status, ?progress, "Job in progress");
                            PollEvent::Progress {
                                status,
                                progress,
                                message,
                            }
                        }
                        outcome => {
                            match &outcome {
                                JobOutcome::Empty => info!("Job finished without results"),
                                JobOutcome::Batch(batch) => {
                                    info!(papers = batch.len(), "Job finished")
                                }
                                _ => info!("Job finished"),
                            }
                            PollEvent::Completed { outcome }
                        }
                    }
                }
            };

            let terminal = event.is_terminal();
            if !deliver(&tx, &cancel, event).await || terminal {
                return;
            }
        }
    }

    /// Run the poller on its own task.
    ///
    /// The poll stops when `cancel` fires or the handle is dropped.
    pub fn spawn(
        self,
        source: Arc<dyn StatusSource>,
        job_id: impl Into<String>,
        cancel: &CancellationToken,
    ) -> PollHandle {
        let job_id = job_id.into();
        let (tx, rx) = mpsc::channel(16);
        let cancel = cancel.child_token();
        let task_cancel = cancel.clone();

        info!(job_id = %job_id, "Starting status poll");
        tokio::spawn(async move {
            self.run(source.as_ref(), &job_id, task_cancel, tx).await;
        });

        PollHandle { events: rx, cancel }
    }
}

/// Send `event` unless cancellation wins first. `false` means stop polling.
async fn deliver(
    tx: &mpsc::Sender<PollEvent>,
    cancel: &CancellationToken,
    event: PollEvent,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("Polling cancelled before delivery");
            let _ = tx.try_send(PollEvent::Cancelled);
            false
        }
        sent = tx.send(event) => {
            if sent.is_err() {
                debug!("Poll receiver dropped");
            }
            sent.is_ok()
        }
    }
}

/// A running poll. Dropping the handle cancels it.
pub struct PollHandle {
    events: mpsc::Receiver<PollEvent>,
    cancel: CancellationToken,
}

impl PollHandle {
    pub async fn next(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Feed every event into `view` until it is terminal.
    ///
    /// `on_event` sees each event before it is applied, which is where a
    /// caller prints progress.
    pub async fn drive<F>(mut self, view: &mut AnalysisView, mut on_event: F)
    where
        F: FnMut(&PollEvent),
    {
        while let Some(event) = self.next().await {
            on_event(&event);
            if event.apply_to(view) == PollStep::Stop {
                return;
            }
        }
        // Task ended without a terminal event reaching us
        view.cancel();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papersum_core::{PaperSumError, NO_RESULTS_MESSAGE};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    const TICK: Duration = Duration::from_millis(1500);

    /// Replays canned responses and records when each request arrived.
    /// Once the script runs out it keeps answering `running`.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<StatusResponse>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<StatusResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _job_id: &str) -> Result<StatusResponse> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(status(r#"{"status": "running"}"#)))
        }
    }

    fn status(json: &str) -> StatusResponse {
        serde_json::from_str(json).unwrap()
    }

    async fn collect(poller: StatusPoller, source: &ScriptedSource) -> Vec<PollEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        poller
            .run(source, "job-1", CancellationToken::new(), tx)
            .await;
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_request_per_tick_until_done() {
        let source = ScriptedSource::new(vec![
            Ok(status(r#"{"status": "pending", "progress": 0}"#)),
            Ok(status(r#"{"status": "running", "progress": 30}"#)),
            Ok(status(r#"{"status": "running", "progress": 80}"#)),
            Ok(status(r#"{"status": "done", "result": {"feedback": "ok"}}"#)),
        ]);

        let events = collect(StatusPoller::new(TICK), &source).await;

        let calls = source.calls();
        assert_eq!(calls.len(), 4);
        for pair in calls.windows(2) {
            assert_eq!(pair[1] - pair[0], TICK);
        }

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[1],
            PollEvent::Progress {
                status: JobStatus::Running,
                progress: Some(30.0),
                message: "Status: running (30%)".into(),
            }
        );
        assert!(matches!(
            &events[3],
            PollEvent::Completed { outcome: JobOutcome::Single(r) } if r.feedback == "ok"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_without_results_stops_polling() {
        let source = ScriptedSource::new(vec![
            Ok(status(r#"{"status": "running"}"#)),
            Ok(status(r#"{"status": "done", "progress": 100}"#)),
        ]);

        let events = collect(StatusPoller::new(TICK), &source).await;
        assert_eq!(
            events.last(),
            Some(&PollEvent::Completed {
                outcome: JobOutcome::Empty
            })
        );

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_terminal_without_retry() {
        let source = ScriptedSource::new(vec![
            Ok(status(r#"{"status": "running"}"#)),
            Err(PaperSumError::Http("connection reset".into())),
        ]);

        let events = collect(StatusPoller::new(TICK), &source).await;
        assert_eq!(
            events.last(),
            Some(&PollEvent::Failed {
                message: "Failed to fetch status: HTTP error: connection reset".into()
            })
        );
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_requests() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let cancel = CancellationToken::new();
        let mut handle = StatusPoller::new(TICK).spawn(source.clone(), "job-1", &cancel);

        for _ in 0..2 {
            assert!(matches!(handle.next().await, Some(PollEvent::Progress { .. })));
        }
        cancel.cancel();
        assert_eq!(handle.next().await, Some(PollEvent::Cancelled));
        assert_eq!(handle.next().await, None);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_requests() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let cancel = CancellationToken::new();
        let mut handle = StatusPoller::new(TICK).spawn(source.clone(), "job-1", &cancel);
        assert!(handle.next().await.is_some());
        drop(handle);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_updates_view_for_batch() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(status(r#"{"status": "running", "progress": 50}"#)),
            Ok(status(
                r#"{"status": "done", "results": {"b": {"feedback": "B"}, "a": {"feedback": "A"}}}"#,
            )),
        ]));
        let mut view = AnalysisView::new("job-1");
        let mut seen = Vec::new();

        StatusPoller::new(TICK)
            .spawn(source, "job-1", &CancellationToken::new())
            .drive(&mut view, |e| seen.push(e.clone()))
            .await;

        assert_eq!(seen.len(), 2);
        assert!(view.is_terminal());
        assert_eq!(view.batch().unwrap().paper_ids(), &["b", "a"]);
        assert_eq!(view.current_result().unwrap().feedback, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_reports_empty_message() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(status(r#"{"status": "done"}"#))]));
        let mut view = AnalysisView::new("job-1");

        StatusPoller::new(TICK)
            .spawn(source.clone(), "job-1", &CancellationToken::new())
            .drive(&mut view, |_| {})
            .await;

        assert_eq!(view.status_message, NO_RESULTS_MESSAGE);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_receiver_stalls() {
        let source = ScriptedSource::new(vec![]);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let poller = StatusPoller::new(TICK);
        let poll = poller.run(&source, "job-1", cancel.clone(), tx);
        let stop = async {
            tokio::time::sleep(TICK * 3).await;
            cancel.cancel();
        };
        tokio::join!(poll, stop);

        // Second progress event blocked on the full channel until cancel
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_cancelled_by_parent_token() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let cancel = CancellationToken::new();
        let mut view = AnalysisView::new("job-1");

        let handle = StatusPoller::new(TICK).spawn(source.clone(), "job-1", &cancel);
        let stop = async {
            tokio::time::sleep(TICK * 2 + TICK / 3).await;
            cancel.cancel();
        };
        tokio::join!(handle.drive(&mut view, |_| {}), stop);

        assert!(!view.running);
        assert!(view.display.is_none());
        assert!(view.error.is_none());
        assert_eq!(source.calls().len(), 2);
    }
}
