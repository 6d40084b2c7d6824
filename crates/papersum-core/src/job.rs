use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AnalysisOptions, AnalysisResult};

/// Message shown when a job finishes without any result payload
pub const NO_RESULTS_MESSAGE: &str = "No results available.";

// =============================================================================
// Job Status
// =============================================================================

/// Server-reported job state. Unknown states are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Done,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, JobStatus::Done)
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "done" => JobStatus::Done,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub paper_id: String,
    pub options: AnalysisOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    pub job_id: String,
}

/// Per-paper results keyed by paper id, in the order the server sent them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultMap(pub Vec<(String, AnalysisResult)>);

impl<'de> Deserialize<'de> for ResultMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ResultMapVisitor;

        impl<'de> Visitor<'de> for ResultMapVisitor {
            type Value = ResultMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of paper id to analysis result")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, AnalysisResult)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, AnalysisResult>()? {
                    // Duplicate keys: last value wins, first position is kept
                    match entries.iter_mut().find(|entry| entry.0 == key) {
                        Some(slot) => slot.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(ResultMap(entries))
            }
        }

        deserializer.deserialize_map(ResultMapVisitor)
    }
}

/// Body of `GET /analysis/status/{job_id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
    #[serde(default)]
    pub results: Option<ResultMap>,
    #[serde(default)]
    pub paper_ids: Option<Vec<String>>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl StatusResponse {
    /// Human-readable progress line, e.g. `Status: running (40%)`
    pub fn progress_message(&self) -> String {
        match self.progress {
            Some(p) => format!("Status: {} ({}%)", self.status, p),
            None => format!("Status: {}", self.status),
        }
    }

    /// Reconcile the response into what should be displayed.
    ///
    /// Batch `results` take precedence over a legacy singular `result`.
    pub fn outcome(self) -> JobOutcome {
        if !self.status.is_done() {
            return JobOutcome::InProgress {
                message: self.progress_message(),
            };
        }

        if let Some(ResultMap(entries)) = self.results {
            let paper_ids = match self.paper_ids {
                Some(ids) if !ids.is_empty() => ids,
                _ => entries.iter().map(|(id, _)| id.clone()).collect(),
            };
            return JobOutcome::Batch(BatchResults::new(paper_ids, entries));
        }

        match self.result {
            Some(result) => JobOutcome::Single(result),
            None => JobOutcome::Empty,
        }
    }
}

// =============================================================================
// Reconciled Outcome
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    InProgress { message: String },
    Single(AnalysisResult),
    Batch(BatchResults),
    /// Done, but the server returned neither `result` nor `results`
    Empty,
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::InProgress { .. })
    }
}

/// Results of a multi-paper job plus the currently selected paper
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResults {
    paper_ids: Vec<String>,
    results: Vec<(String, AnalysisResult)>,
    selected: Option<String>,
}

impl BatchResults {
    pub fn new(paper_ids: Vec<String>, results: Vec<(String, AnalysisResult)>) -> Self {
        let selected = paper_ids.first().cloned();
        Self {
            paper_ids,
            results,
            selected,
        }
    }

    pub fn paper_ids(&self) -> &[String] {
        &self.paper_ids
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn get(&self, paper_id: &str) -> Option<&AnalysisResult> {
        self.results
            .iter()
            .find(|(id, _)| id == paper_id)
            .map(|(_, r)| r)
    }

    pub fn selected_result(&self) -> Option<&AnalysisResult> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    /// Switch the displayed paper. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, paper_id: &str) -> bool {
        if !self.paper_ids.iter().any(|id| id == paper_id) {
            return false;
        }
        self.selected = Some(paper_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.paper_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paper_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> StatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_status_round_trips_unknown_values() {
        let resp = parse(r#"{"status": "queued", "progress": 5}"#);
        assert_eq!(resp.status, JobStatus::Other("queued".into()));
        assert_eq!(String::from(resp.status), "queued");
    }

    #[test]
    fn test_progress_message() {
        assert_eq!(
            parse(r#"{"status": "running", "progress": 40}"#).progress_message(),
            "Status: running (40%)"
        );
        assert_eq!(
            parse(r#"{"status": "running", "progress": 12.5}"#).progress_message(),
            "Status: running (12.5%)"
        );
        assert_eq!(parse(r#"{"status": "pending"}"#).progress_message(), "Status: pending");
    }

    #[test]
    fn test_not_done_is_in_progress_even_with_result() {
        let outcome = parse(r#"{"status": "running", "progress": 90, "result": {"feedback": "x"}}"#)
            .outcome();
        assert_eq!(
            outcome,
            JobOutcome::InProgress {
                message: "Status: running (90%)".into()
            }
        );
        assert!(!outcome.is_terminal());
    }

    #[test]
    fn test_batch_without_paper_ids_uses_key_order() {
        let outcome = parse(
            r#"{"status": "done", "results": {
                "zeta": {"feedback": "z"},
                "alpha": {"feedback": "a"},
                "mid": {"feedback": "m"}
            }}"#,
        )
        .outcome();

        let JobOutcome::Batch(batch) = outcome else {
            panic!("expected batch outcome");
        };
        assert_eq!(batch.paper_ids(), &["zeta", "alpha", "mid"]);
        assert_eq!(batch.selected_id(), Some("zeta"));
        assert_eq!(batch.selected_result().unwrap().feedback, "z");
    }

    #[test]
    fn test_batch_respects_explicit_paper_ids() {
        let outcome = parse(
            r#"{"status": "done",
                "paper_ids": ["b", "a"],
                "results": {"a": {"feedback": "A"}, "b": {"feedback": "B"}}}"#,
        )
        .outcome();

        let JobOutcome::Batch(batch) = outcome else {
            panic!("expected batch outcome");
        };
        assert_eq!(batch.paper_ids(), &["b", "a"]);
        assert_eq!(batch.selected_result().unwrap().feedback, "B");
    }

    #[test]
    fn test_batch_takes_precedence_over_legacy_result() {
        let outcome = parse(
            r#"{"status": "done",
                "result": {"feedback": "legacy"},
                "results": {"p1": {"feedback": "new"}}}"#,
        )
        .outcome();
        assert!(matches!(outcome, JobOutcome::Batch(_)));
    }

    #[test]
    fn test_legacy_result_is_kept_exactly() {
        let json = r#"{"status": "done", "progress": 100, "result": {
            "summary_sections": [{"title": "Overview", "content": "About the paper"}],
            "feedback": "Solid methodology.",
            "key_findings": ["one", "two"],
            "citations": ["Smith 2020"]
        }}"#;
        let expected: AnalysisResult = serde_json::from_value(
            serde_json::from_str::<serde_json::Value>(json).unwrap()["result"].clone(),
        )
        .unwrap();

        assert_eq!(parse(json).outcome(), JobOutcome::Single(expected));
    }

    #[test]
    fn test_done_without_results_is_empty() {
        let outcome = parse(r#"{"status": "done", "progress": 100}"#).outcome();
        assert_eq!(outcome, JobOutcome::Empty);
        assert!(outcome.is_terminal());

        let outcome = parse(r#"{"status": "done", "result": null, "results": null}"#).outcome();
        assert_eq!(outcome, JobOutcome::Empty);
    }

    #[test]
    fn test_batch_select() {
        let mut batch = BatchResults::new(
            vec!["a".into(), "b".into()],
            vec![
                ("a".into(), AnalysisResult::default()),
                (
                    "b".into(),
                    AnalysisResult {
                        feedback: "B".into(),
                        ..Default::default()
                    },
                ),
            ],
        );
        assert!(batch.select("b"));
        assert_eq!(batch.selected_result().unwrap().feedback, "B");
        assert!(!batch.select("missing"));
        assert_eq!(batch.selected_id(), Some("b"));
    }

    #[test]
    fn test_paper_id_without_result_selects_nothing_displayable() {
        let batch = BatchResults::new(vec!["ghost".into()], vec![]);
        assert_eq!(batch.selected_id(), Some("ghost"));
        assert!(batch.selected_result().is_none());
    }
}
