use std::path::Path;

use papersum_core::{
    ensure_pdf_name, AnalysisOptions, ApiConfig, AuthResponse, Credentials, HistoryItem,
    HistoryResponse, PaperSumError, Result, RunRequest, RunResponse, ServerSettings,
    StatusResponse, UploadResponse, UrlRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Longest raw body echoed back in an error message
const MAX_ERROR_BODY: usize = 300;

/// Fallback shown when a login attempt fails without a server message
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// Client for the research paper analysis REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PaperSumError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| PaperSumError::Http(e.to_string()))?;
        Self::parse_response(resp).await
    }

    async fn parse_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PaperSumError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), %message, "API request failed");
            return Err(PaperSumError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, body = %truncate(&body, MAX_ERROR_BODY), "Unreadable response body");
            PaperSumError::Json(e)
        })
    }

    /// `GET /`
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn health(&self) -> Result<HealthResponse> {
        self.send(self.client.get(self.url("/"))).await
    }

    /// `POST /papers/upload`. Non-PDF names are rejected before any I/O.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload_pdf(&self, path: &Path) -> Result<UploadResponse> {
        let filename = ensure_pdf_name(path)?;

        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(PaperSumError::EmptyFile(filename));
        }
        debug!(size = bytes.len(), "Uploading PDF");

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/pdf")
            .map_err(|e| PaperSumError::Http(e.to_string()))?;
        let form = Form::new().part("file", part);

        let uploaded: UploadResponse = self
            .send(self.client.post(self.url("/papers/upload")).multipart(form))
            .await?;
        info!(paper_id = %uploaded.paper_id, "Paper uploaded");
        Ok(uploaded)
    }

    /// `POST /papers/by-url`
    #[instrument(skip(self, options))]
    pub async fn paper_by_url(
        &self,
        url: &str,
        options: Option<AnalysisOptions>,
    ) -> Result<UploadResponse> {
        let request = UrlRequest {
            url: url.to_string(),
            options,
        };
        let registered: UploadResponse = self
            .send(self.client.post(self.url("/papers/by-url")).json(&request))
            .await?;
        info!(paper_id = %registered.paper_id, "Paper fetched by URL");
        Ok(registered)
    }

    /// `POST /analysis/run`
    #[instrument(skip(self, options))]
    pub async fn run_analysis(&self, paper_id: &str, options: AnalysisOptions) -> Result<RunResponse> {
        let request = RunRequest {
            paper_id: paper_id.to_string(),
            options,
        };
        let run: RunResponse = self
            .send(self.client.post(self.url("/analysis/run")).json(&request))
            .await?;
        info!(job_id = %run.job_id, "Analysis started");
        Ok(run)
    }

    /// `GET /analysis/status/{job_id}`
    #[instrument(skip(self))]
    pub async fn job_status(&self, job_id: &str) -> Result<StatusResponse> {
        let path = format!("/analysis/status/{}", urlencoding::encode(job_id));
        self.send(self.client.get(self.url(&path))).await
    }

    /// `GET /history/list`
    #[instrument(skip(self))]
    pub async fn list_history(&self) -> Result<Vec<HistoryItem>> {
        let history: HistoryResponse = self.send(self.client.get(self.url("/history/list"))).await?;
        Ok(history.items)
    }

    /// `GET /settings`
    #[instrument(skip(self))]
    pub async fn get_settings(&self) -> Result<ServerSettings> {
        self.send(self.client.get(self.url("/settings"))).await
    }

    /// `POST /settings`
    #[instrument(skip(self))]
    pub async fn update_settings(&self, settings: &ServerSettings) -> Result<ServerSettings> {
        self.send(self.client.post(self.url("/settings")).json(settings))
            .await
    }

    /// `POST /auth/login`
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        self.send(self.client.post(self.url("/auth/login")).json(credentials))
            .await
    }

    /// `POST /auth/signup`
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse> {
        self.send(self.client.post(self.url("/auth/signup")).json(credentials))
            .await
    }
}

/// Message for a failed login: the server's detail, or a generic fallback
pub fn login_failure_message(err: &PaperSumError) -> String {
    match err {
        PaperSumError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
        _ => LOGIN_FAILED.to_string(),
    }
}

/// Pull a readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// (`{"detail": [{"msg": "..."}]}`) and `{"message": "..."}`; anything else
/// is returned raw, truncated.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return truncate(body.trim(), MAX_ERROR_BODY);
    };

    match json.get("detail") {
        Some(serde_json::Value::String(s)) => return s.clone(),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
        _ => {}
    }

    if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
        return msg.to_string();
    }

    truncate(body.trim(), MAX_ERROR_BODY)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
