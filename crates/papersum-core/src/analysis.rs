use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PaperSumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    #[default]
    Overall,
    Methodology,
    LiteratureReview,
    Results,
    TechStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Paragraphs,
    BulletPoints,
    MindMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Summary,
    Critique,
    Notes,
}

/// Options sent with `POST /analysis/run`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default)]
    pub summary_length: SummaryLength,
    #[serde(default)]
    pub focus_area: FocusArea,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub analysis_type: AnalysisType,
}

// Wire names double as the CLI spelling, so both directions go through one table per enum.
macro_rules! wire_names {
    ($ty:ty, $label:literal, { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name,)+
                }
            }

            pub fn all() -> &'static [$ty] {
                &[$($variant),+]
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = PaperSumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(PaperSumError::InvalidOption(format!(
                        "unknown {} '{}' (expected one of: {})",
                        $label,
                        s,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

wire_names!(SummaryLength, "summary length", {
    SummaryLength::Short => "short",
    SummaryLength::Medium => "medium",
    SummaryLength::Long => "long",
});

wire_names!(FocusArea, "focus area", {
    FocusArea::Overall => "overall",
    FocusArea::Methodology => "methodology",
    FocusArea::LiteratureReview => "literature_review",
    FocusArea::Results => "results",
    FocusArea::TechStack => "tech_stack",
});

wire_names!(OutputFormat, "output format", {
    OutputFormat::Paragraphs => "paragraphs",
    OutputFormat::BulletPoints => "bullet_points",
    OutputFormat::MindMap => "mind_map",
});

wire_names!(AnalysisType, "analysis type", {
    AnalysisType::Summary => "summary",
    AnalysisType::Critique => "critique",
    AnalysisType::Notes => "notes",
});
