use crate::{AnalysisResult, BatchResults, JobOutcome, StatusResponse, NO_RESULTS_MESSAGE};

/// Whether the poller should keep asking for status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Stop,
}

/// What the view currently shows for a finished job
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayedResult {
    Single(AnalysisResult),
    Batch(BatchResults),
    Empty,
}

/// Per-job view state owned by whatever surface displays the analysis
#[derive(Debug, Clone)]
pub struct AnalysisView {
    pub job_id: String,
    pub running: bool,
    pub status_message: String,
    pub display: Option<DisplayedResult>,
    pub error: Option<String>,
}

impl AnalysisView {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            running: true,
            status_message: "Status: pending".to_string(),
            display: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.running
    }

    /// Apply one status response. Responses arriving after a terminal
    /// state are ignored so the displayed result cannot change under the user.
    pub fn apply(&mut self, response: StatusResponse) -> PollStep {
        if self.is_terminal() {
            return PollStep::Stop;
        }
        self.apply_outcome(response.outcome())
    }

    pub fn apply_outcome(&mut self, outcome: JobOutcome) -> PollStep {
        if self.is_terminal() {
            return PollStep::Stop;
        }

        match outcome {
            JobOutcome::InProgress { message } => {
                self.status_message = message;
                return PollStep::Continue;
            }
            JobOutcome::Single(result) => {
                self.status_message = "Done".to_string();
                self.display = Some(DisplayedResult::Single(result));
            }
            JobOutcome::Batch(batch) => {
                self.status_message = format!("Done ({} papers)", batch.len());
                self.display = Some(DisplayedResult::Batch(batch));
            }
            JobOutcome::Empty => {
                self.status_message = NO_RESULTS_MESSAGE.to_string();
                self.display = Some(DisplayedResult::Empty);
            }
        }

        self.running = false;
        PollStep::Stop
    }

    /// Record a terminal failure (transport or parse error)
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        let message = message.into();
        self.status_message = message.clone();
        self.error = Some(message);
        self.running = false;
    }

    /// Stop without a result, e.g. when the displaying surface goes away
    pub fn cancel(&mut self) {
        self.running = false;
    }

    /// Switch the paper shown for a batch result. This is the only way the
    /// displayed result changes once the job is done.
    pub fn select_paper(&mut self, paper_id: &str) -> bool {
        match self.display.as_mut() {
            Some(DisplayedResult::Batch(batch)) => batch.select(paper_id),
            _ => false,
        }
    }

    pub fn batch(&self) -> Option<&BatchResults> {
        match self.display.as_ref() {
            Some(DisplayedResult::Batch(batch)) => Some(batch),
            _ => None,
        }
    }

    pub fn current_result(&self) -> Option<&AnalysisResult> {
        match self.display.as_ref()? {
            DisplayedResult::Single(result) => Some(result),
            DisplayedResult::Batch(batch) => batch.selected_result(),
            DisplayedResult::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> StatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_progress_keeps_polling() {
        let mut view = AnalysisView::new("job-1");
        let step = view.apply(response(r#"{"status": "running", "progress": 30}"#));
        assert_eq!(step, PollStep::Continue);
        assert!(view.running);
        assert_eq!(view.status_message, "Status: running (30%)");
        assert!(view.current_result().is_none());
    }

    #[test]
    fn test_result_is_frozen_after_done() {
        let mut view = AnalysisView::new("job-1");
        view.apply(response(r#"{"status": "done", "result": {"feedback": "first"}}"#));
        let step = view.apply(response(r#"{"status": "done", "result": {"feedback": "second"}}"#));

        assert_eq!(step, PollStep::Stop);
        assert_eq!(view.current_result().unwrap().feedback, "first");
    }

    #[test]
    fn test_empty_done_is_terminal_degraded() {
        let mut view = AnalysisView::new("job-1");
        let step = view.apply(response(r#"{"status": "done"}"#));
        assert_eq!(step, PollStep::Stop);
        assert!(view.is_terminal());
        assert_eq!(view.status_message, NO_RESULTS_MESSAGE);
        assert_eq!(view.display, Some(DisplayedResult::Empty));
        assert!(view.error.is_none());
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut view = AnalysisView::new("job-1");
        view.fail("Failed to fetch status: connection refused");
        assert!(view.is_terminal());
        assert_eq!(
            view.apply(response(r#"{"status": "done", "result": {}}"#)),
            PollStep::Stop
        );
        assert!(view.display.is_none());
    }

    #[test]
    fn test_select_paper_only_for_batches() {
        let mut view = AnalysisView::new("job-1");
        view.apply(response(
            r#"{"status": "done", "results": {"p1": {"feedback": "one"}, "p2": {"feedback": "two"}}}"#,
        ));
        assert_eq!(view.current_result().unwrap().feedback, "one");
        assert!(view.select_paper("p2"));
        assert_eq!(view.current_result().unwrap().feedback, "two");
        assert!(!view.select_paper("p3"));

        let mut single = AnalysisView::new("job-2");
        single.apply(response(r#"{"status": "done", "result": {"feedback": "x"}}"#));
        assert!(!single.select_paper("p1"));
    }
}
