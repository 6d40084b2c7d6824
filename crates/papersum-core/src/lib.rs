// Domain modules
pub mod account;
pub mod analysis;
pub mod config;
pub mod error;
pub mod job;
pub mod paper;
pub mod result;
pub mod view;

pub use account::{AuthResponse, Credentials, HistoryItem, HistoryResponse, ServerSettings, Theme};
pub use analysis::{AnalysisOptions, AnalysisType, FocusArea, OutputFormat, SummaryLength};
pub use config::{ApiConfig, PaperSumConfig, PollConfig};
pub use error::{PaperSumError, Result};
pub use job::{
    BatchResults, JobOutcome, JobStatus, ResultMap, RunRequest, RunResponse, StatusResponse,
    NO_RESULTS_MESSAGE,
};
pub use paper::{ensure_pdf_name, UploadResponse, UrlRequest};
pub use result::{AnalysisResult, Citation, Section};
pub use view::{AnalysisView, DisplayedResult, PollStep};
