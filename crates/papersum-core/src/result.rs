use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// A reference extracted from the paper.
///
/// Older jobs stored citations as single-line strings, newer ones as
/// structured records. Anything else is kept as raw JSON so one odd
/// citation never sinks the whole result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Citation {
    Structured {
        title: String,
        #[serde(default, deserialize_with = "lenient_authors")]
        authors: Vec<String>,
        #[serde(default, deserialize_with = "lenient_year")]
        year: Option<i32>,
        #[serde(default)]
        link: Option<String>,
    },
    Legacy(String),
    Other(serde_json::Value),
}

/// Year as a number or a numeric string; anything unparseable is dropped
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Year>::deserialize(deserializer)? {
        Some(Year::Number(n)) => i32::try_from(n).ok(),
        Some(Year::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// A list of names, or a single string holding all of them
fn lenient_authors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Authors {
        Many(Vec<String>),
        One(String),
    }

    Ok(match Option::<Authors>::deserialize(deserializer)? {
        Some(Authors::Many(names)) => names,
        Some(Authors::One(name)) if !name.trim().is_empty() => vec![name],
        _ => Vec::new(),
    })
}

impl Citation {
    /// One-line rendering: `Authors (Year). Title. Link`
    pub fn display_line(&self) -> String {
        match self {
            Citation::Legacy(s) => s.clone(),
            Citation::Other(value) => value.to_string(),
            Citation::Structured {
                title,
                authors,
                year,
                link,
            } => {
                let mut line = String::new();
                if !authors.is_empty() {
                    line.push_str(&authors.join(", "));
                }
                if let Some(y) = year {
                    if line.is_empty() {
                        line.push_str(&format!("({})", y));
                    } else {
                        line.push_str(&format!(" ({})", y));
                    }
                }
                if !line.is_empty() {
                    line.push_str(". ");
                }
                line.push_str(title);
                if let Some(l) = link.as_deref().filter(|l| !l.is_empty()) {
                    line.push_str(". ");
                    line.push_str(l);
                }
                line
            }
        }
    }
}

/// Structured output of a completed analysis job
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub summary_sections: Vec<Section>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.summary_sections.is_empty()
            && self.feedback.trim().is_empty()
            && self.key_findings.is_empty()
            && self.citations.is_empty()
    }
}
