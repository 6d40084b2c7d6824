use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AnalysisOptions, PaperSumError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub paper_id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Body of `POST /papers/by-url`
#[derive(Debug, Clone, Serialize)]
pub struct UrlRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<AnalysisOptions>,
}

/// Reject anything that is not named `*.pdf` (case-insensitive).
///
/// Runs before the file is opened, so a rejected upload never touches the
/// filesystem or the network.
pub fn ensure_pdf_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PaperSumError::NotPdf(path.display().to_string()))?;

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        return Err(PaperSumError::NotPdf(name.to_string()));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_pdf_any_case() {
        assert_eq!(ensure_pdf_name(Path::new("papers/attention.pdf")).unwrap(), "attention.pdf");
        assert_eq!(ensure_pdf_name(Path::new("SCAN.PDF")).unwrap(), "SCAN.PDF");
    }

    #[test]
    fn test_rejects_other_extensions() {
        for name in ["notes.txt", "paper.pdf.zip", "paper", "archive.tar.gz", ".pdf"] {
            let err = ensure_pdf_name(Path::new(name)).unwrap_err();
            assert!(matches!(err, PaperSumError::NotPdf(_)), "{name} should be rejected");
        }
    }

    #[test]
    fn test_url_request_omits_missing_options() {
        let req = UrlRequest {
            url: "https://arxiv.org/pdf/1706.03762".into(),
            options: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("options").is_none());
    }
}
