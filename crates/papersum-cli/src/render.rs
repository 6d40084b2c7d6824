//! Terminal rendering for analysis results, history and settings.

use std::fmt::Write as _;
use std::io::IsTerminal;

use papersum_core::{
    AnalysisResult, AnalysisView, BatchResults, DisplayedResult, HistoryItem, ServerSettings,
    Theme, NO_RESULTS_MESSAGE,
};

const RESET: &str = "\x1B[0m";

/// Heading style derived from the theme preference
#[derive(Debug, Clone, Copy)]
pub struct Style {
    accent: Option<&'static str>,
}

impl Style {
    pub fn for_theme(theme: Theme) -> Self {
        let color_ok = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        if !color_ok {
            return Self::plain();
        }
        let accent = match theme {
            Theme::Dark => "\x1B[1;36m",
            Theme::Light => "\x1B[1;34m",
        };
        Self {
            accent: Some(accent),
        }
    }

    pub fn plain() -> Self {
        Self { accent: None }
    }

    fn heading(&self, text: &str) -> String {
        match self.accent {
            Some(color) => format!("{}{}{}", color, text, RESET),
            None => text.to_string(),
        }
    }
}

pub fn format_result(result: &AnalysisResult, style: &Style) -> String {
    let mut out = String::new();

    if result.is_empty() {
        let _ = writeln!(out, "  (empty result)");
        return out;
    }

    for section in &result.summary_sections {
        let title = if section.title.is_empty() { "Summary" } else { section.title.as_str() };
        let _ = writeln!(out, "{}", style.heading(title));
        let _ = writeln!(out, "{:-<60}", "");
        let _ = writeln!(out, "{}", section.content.trim());
        let _ = writeln!(out);
    }

    if !result.feedback.trim().is_empty() {
        let _ = writeln!(out, "{}", style.heading("Feedback"));
        let _ = writeln!(out, "{:-<60}", "");
        let _ = writeln!(out, "{}", result.feedback.trim());
        let _ = writeln!(out);
    }

    if !result.key_findings.is_empty() {
        let _ = writeln!(out, "{}", style.heading("Key Findings"));
        let _ = writeln!(out, "{:-<60}", "");
        for (i, finding) in result.key_findings.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, finding);
        }
        let _ = writeln!(out);
    }

    if !result.citations.is_empty() {
        let _ = writeln!(out, "{}", style.heading("Citations"));
        let _ = writeln!(out, "{:-<60}", "");
        for (i, citation) in result.citations.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {}", i + 1, citation.display_line());
        }
        let _ = writeln!(out);
    }

    out
}

pub fn format_papers(batch: &BatchResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Papers:");
    let _ = writeln!(out, "{:-<60}", "");
    for (i, id) in batch.paper_ids().iter().enumerate() {
        let marker = if batch.selected_id() == Some(id.as_str()) { "*" } else { " " };
        let _ = writeln!(out, "{} {:<4} {}", marker, i + 1, id);
    }
    out
}

pub fn format_view(view: &AnalysisView, style: &Style) -> String {
    let mut out = String::new();

    if let Some(error) = &view.error {
        let _ = writeln!(out, "{}", error);
        return out;
    }

    match &view.display {
        None => {
            let _ = writeln!(out, "{}", view.status_message);
        }
        Some(DisplayedResult::Empty) => {
            let _ = writeln!(out, "{}", NO_RESULTS_MESSAGE);
        }
        Some(DisplayedResult::Single(result)) => {
            out.push_str(&format_result(result, style));
        }
        Some(DisplayedResult::Batch(batch)) => {
            if batch.is_empty() {
                let _ = writeln!(out, "{}", NO_RESULTS_MESSAGE);
                return out;
            }
            out.push_str(&format_papers(batch));
            let _ = writeln!(out);
            match (batch.selected_id(), batch.selected_result()) {
                (Some(id), Some(result)) => {
                    let _ = writeln!(out, "{}", style.heading(&format!("Paper: {}", id)));
                    let _ = writeln!(out);
                    out.push_str(&format_result(result, style));
                }
                (Some(id), None) => {
                    let _ = writeln!(out, "No result for paper {}", id);
                }
                _ => {}
            }
            if batch.len() > 1 {
                let _ = writeln!(out, "  Use: select <paper_id> to switch papers");
            }
        }
    }

    out
}

pub fn format_history(items: &[HistoryItem]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "No analysis history yet.");
        return out;
    }
    let _ = writeln!(out, "History:");
    let _ = writeln!(out, "{:-<60}", "");
    let _ = writeln!(out, "  {:<4} {:<40} {}", "#", "ID", "Status");
    let _ = writeln!(out, "{:-<60}", "");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {:<4} {:<40} {}", i + 1, item.id, item.status);
    }
    out
}

pub fn format_settings(settings: &ServerSettings, theme: Theme) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Settings:");
    let _ = writeln!(out, "{:-<40}", "");
    let _ = writeln!(out, "  Default summary length: {}", settings.default_summary_length);
    let _ = writeln!(out, "  Theme (local):          {}", theme);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use papersum_core::{Citation, Section, StatusResponse};

    fn sample() -> AnalysisResult {
        AnalysisResult {
            paper_id: None,
            summary_sections: vec![Section {
                title: "Overview".into(),
                content: "A transformer paper.".into(),
            }],
            feedback: "Strong baselines, limited ablations.".into(),
            key_findings: vec!["Attention suffices".into(), "Faster training".into()],
            citations: vec![Citation::Legacy("Bahdanau et al., 2014".into())],
        }
    }

    fn view_from(json: &str) -> AnalysisView {
        let mut view = AnalysisView::new("job");
        view.apply(serde_json::from_str::<StatusResponse>(json).unwrap());
        view
    }

    #[test]
    fn test_result_sections_in_order() {
        let text = format_result(&sample(), &Style::plain());
        let overview = text.find("Overview").unwrap();
        let feedback = text.find("Feedback").unwrap();
        let findings = text.find("Key Findings").unwrap();
        let citations = text.find("Citations").unwrap();
        assert!(overview < feedback && feedback < findings && findings < citations);
        assert!(text.contains("  2. Faster training"));
        assert!(text.contains("  [1] Bahdanau et al., 2014"));
        assert!(!text.contains('\x1B'));
    }

    #[test]
    fn test_view_empty_shows_degraded_message() {
        let text = format_view(&view_from(r#"{"status": "done"}"#), &Style::plain());
        assert_eq!(text.trim(), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_view_batch_marks_selected_paper() {
        let mut view = view_from(
            r#"{"status": "done", "results": {"p1": {"feedback": "one"}, "p2": {"feedback": "two"}}}"#,
        );
        let text = format_view(&view, &Style::plain());
        assert!(text.contains("* 1    p1"));
        assert!(text.contains("Paper: p1"));
        assert!(text.contains("one"));

        view.select_paper("p2");
        let text = format_view(&view, &Style::plain());
        assert!(text.contains("* 2    p2"));
        assert!(text.contains("two"));
    }

    #[test]
    fn test_view_failure_shows_message() {
        let mut view = AnalysisView::new("job");
        view.fail("Failed to fetch status: timed out");
        assert_eq!(
            format_view(&view, &Style::plain()).trim(),
            "Failed to fetch status: timed out"
        );
    }

    #[test]
    fn test_history_table() {
        let items = vec![HistoryItem {
            id: "abc".into(),
            status: "done".into(),
        }];
        let text = format_history(&items);
        assert!(text.contains("abc"));
        assert!(format_history(&[]).contains("No analysis history yet."));
    }
}
