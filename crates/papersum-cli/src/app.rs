use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use papersum_client::{login_failure_message, ApiClient, PollEvent, StatusPoller, StatusSource};
use papersum_core::{
    AnalysisOptions, AnalysisType, AnalysisView, Credentials, FocusArea, OutputFormat,
    PaperSumConfig, ServerSettings, SummaryLength, Theme,
};
use papersum_services::Services;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::interrupt::Interrupts;
use crate::render::{self, Style};

/// Per-run overrides on top of the configured analysis defaults
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OptionOverrides {
    /// Summary length (short, medium, long)
    #[arg(short = 'l', long = "length")]
    pub summary_length: Option<SummaryLength>,

    /// Focus area (overall, methodology, literature_review, results, tech_stack)
    #[arg(short = 'f', long = "focus")]
    pub focus_area: Option<FocusArea>,

    /// Output format (paragraphs, bullet_points, mind_map)
    #[arg(short = 'o', long = "format")]
    pub output_format: Option<OutputFormat>,

    /// Analysis type (summary, critique, notes)
    #[arg(short = 't', long = "type")]
    pub analysis_type: Option<AnalysisType>,
}

pub struct App {
    config: PaperSumConfig,
    client: ApiClient,
    services: Services,
    theme: Theme,
    interrupts: Interrupts,
    last: Option<AnalysisView>,
}

impl App {
    pub fn new(config: PaperSumConfig, services: Services, interrupts: Interrupts) -> Result<Self> {
        let token = services.session.token()?;
        let theme = services.session.theme()?;
        let client = ApiClient::new(&config.api)?.with_token(token);

        Ok(Self {
            config,
            client,
            services,
            theme,
            interrupts,
            last: None,
        })
    }

    fn style(&self) -> Style {
        Style::for_theme(self.theme)
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub async fn cmd_health(&self) -> Result<()> {
        println!("System Status:");
        println!("{:-<40}", "");
        println!("  API: {}", self.client.base_url());

        match self.client.health().await {
            Ok(health) => {
                let service = health.service.unwrap_or(health.status);
                println!("  Backend: connected ({})", service);
            }
            Err(e) => {
                println!("  Backend: unreachable ({})", e);
            }
        }

        let signed_in = if self.client.has_token() { "yes" } else { "no" };
        println!("  Signed in: {}", signed_in);
        println!("  Theme: {}", self.theme);
        println!("  Local state: {}", self.services.store.path().display());
        Ok(())
    }

    pub async fn cmd_login(&mut self, email: &str, password: &str, signup: bool) -> Result<()> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let result = if signup {
            self.client.signup(&credentials).await
        } else {
            self.client.login(&credentials).await
        };

        let auth = match result {
            Ok(auth) => auth,
            Err(e) => bail!("{}", login_failure_message(&e)),
        };

        self.services.session.set_token(&auth.token)?;
        self.client.set_token(Some(auth.token));

        let who = auth.email.unwrap_or_else(|| email.to_string());
        if signup {
            println!("Account created. Logged in as {}", who);
        } else {
            println!("Logged in as {}", who);
        }
        Ok(())
    }

    pub fn cmd_logout(&mut self) -> Result<()> {
        self.services.session.clear_token()?;
        self.client.set_token(None);
        println!("Logged out");
        Ok(())
    }

    // =========================================================================
    // Papers & Analysis
    // =========================================================================

    pub async fn cmd_upload(&self, path: &Path) -> Result<String> {
        let uploaded = self.client.upload_pdf(path).await?;
        let name = uploaded
            .filename
            .unwrap_or_else(|| path.display().to_string());
        println!("Uploaded {} (paper id: {})", name, uploaded.paper_id);
        Ok(uploaded.paper_id)
    }

    pub async fn cmd_fetch(&self, url: &str) -> Result<String> {
        let registered = self.client.paper_by_url(url, None).await?;
        println!("Fetched {} (paper id: {})", url, registered.paper_id);
        Ok(registered.paper_id)
    }

    /// Configured defaults, the server's default summary length, then overrides
    async fn resolve_options(&self, overrides: OptionOverrides) -> AnalysisOptions {
        let mut options = self.config.defaults;

        match overrides.summary_length {
            Some(length) => options.summary_length = length,
            None => match self.client.get_settings().await {
                Ok(settings) => options.summary_length = settings.default_summary_length,
                Err(e) => debug!(error = %e, "Using local default summary length"),
            },
        }
        if let Some(focus) = overrides.focus_area {
            options.focus_area = focus;
        }
        if let Some(format) = overrides.output_format {
            options.output_format = format;
        }
        if let Some(kind) = overrides.analysis_type {
            options.analysis_type = kind;
        }
        options
    }

    pub async fn cmd_analyze(
        &mut self,
        paper_id: &str,
        overrides: OptionOverrides,
        wait: bool,
    ) -> Result<()> {
        let options = self.resolve_options(overrides).await;

        println!();
        println!("Running analysis...");
        println!("  Paper: {}", paper_id);
        println!("  Length: {}", options.summary_length);
        println!("  Focus: {}", options.focus_area);
        println!("  Format: {}", options.output_format);
        println!("  Type: {}", options.analysis_type);
        println!();

        let run = self.client.run_analysis(paper_id, options).await?;
        println!("Job started: {}", run.job_id);

        if wait {
            self.wait_for_job(&run.job_id).await
        } else {
            println!("  Use: status {} --watch", run.job_id);
            Ok(())
        }
    }

    pub async fn cmd_run(&mut self, path: &Path, overrides: OptionOverrides) -> Result<()> {
        let paper_id = self.cmd_upload(path).await?;
        self.cmd_analyze(&paper_id, overrides, true).await
    }

    pub async fn cmd_status(&mut self, job_id: &str, watch: bool) -> Result<()> {
        if watch {
            return self.wait_for_job(job_id).await;
        }

        let status = match self.client.job_status(job_id).await {
            Ok(status) => status,
            Err(e) => bail!("Failed to fetch status: {}", e),
        };

        let mut view = AnalysisView::new(job_id);
        view.apply(status);
        print!("{}", render::format_view(&view, &self.style()));
        if view.is_terminal() {
            self.last = Some(view);
        }
        Ok(())
    }

    /// Poll until the job finishes or Ctrl-C stops the wait
    async fn wait_for_job(&mut self, job_id: &str) -> Result<()> {
        let wait = self.interrupts.begin();
        let poller = StatusPoller::from_config(&self.config.poll);
        let source = Arc::new(self.client.clone());
        let view = watch_job(poller, source, job_id, wait.token()).await?;

        if view.display.is_none() {
            println!("  Job {} is still running. Use: status {} --watch", job_id, job_id);
            return Ok(());
        }

        println!();
        print!("{}", render::format_view(&view, &self.style()));
        self.last = Some(view);
        Ok(())
    }

    // =========================================================================
    // Result Navigation
    // =========================================================================

    pub fn cmd_papers(&self) {
        match self.last.as_ref().and_then(|v| v.batch()) {
            Some(batch) => print!("{}", render::format_papers(batch)),
            None => println!("No multi-paper result to choose from."),
        }
    }

    pub fn cmd_select(&mut self, paper_id: &str) {
        let style = self.style();
        let Some(view) = self.last.as_mut() else {
            println!("No result loaded yet.");
            return;
        };

        if view.select_paper(paper_id) {
            print!("{}", render::format_view(view, &style));
        } else if view.batch().is_none() {
            println!("The last result covers a single paper.");
        } else {
            println!("Unknown paper id: {}. Use 'papers' to list them.", paper_id);
        }
    }

    pub fn cmd_show(&self) {
        match &self.last {
            Some(view) => print!("{}", render::format_view(view, &self.style())),
            None => println!("No result loaded yet."),
        }
    }

    // =========================================================================
    // History & Settings
    // =========================================================================

    pub async fn cmd_history(&self) -> Result<()> {
        let items = self.client.list_history().await?;
        print!("{}", render::format_history(&items));
        Ok(())
    }

    pub async fn cmd_settings(&self, default_summary_length: Option<SummaryLength>) -> Result<()> {
        let settings = match default_summary_length {
            Some(length) => {
                let updated = self
                    .client
                    .update_settings(&ServerSettings {
                        default_summary_length: length,
                    })
                    .await?;
                println!("Settings saved.");
                updated
            }
            None => self.client.get_settings().await?,
        };
        print!("{}", render::format_settings(&settings, self.theme));
        Ok(())
    }

    pub fn cmd_theme(&mut self, theme: Option<Theme>) -> Result<()> {
        if let Some(theme) = theme {
            self.services.session.set_theme(theme)?;
            self.theme = theme;
        }
        println!("Theme: {}", self.theme);
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<()> {
        self.cmd_theme(Some(self.theme.toggle()))
    }
}

/// Poll `job_id` to a terminal state, printing progress whenever it changes.
///
/// A failed status fetch is an error. Cancellation is not: the returned view
/// simply has nothing to display.
pub async fn watch_job(
    poller: StatusPoller,
    source: Arc<dyn StatusSource>,
    job_id: &str,
    cancel: &CancellationToken,
) -> Result<AnalysisView> {
    let mut view = AnalysisView::new(job_id);
    let mut last_message = String::new();

    poller
        .spawn(source, job_id, cancel)
        .drive(&mut view, |event| match event {
            PollEvent::Progress { message, .. } if *message != last_message => {
                println!("  {}", message);
                last_message = message.clone();
            }
            PollEvent::Cancelled => println!("  Stopped waiting."),
            _ => {}
        })
        .await;

    if let Some(error) = &view.error {
        bail!("{}", error);
    }
    Ok(view)
}
