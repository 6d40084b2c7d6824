mod app;
mod interrupt;
mod render;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use papersum_core::config::normalize_base_url;
use papersum_core::{PaperSumConfig, PaperSumError, SummaryLength, Theme};
use papersum_services::Services;
use tracing_subscriber::EnvFilter;

use app::{App, OptionOverrides};
use interrupt::Interrupts;

#[derive(Parser)]
#[command(name = "papersum")]
#[command(about = "PaperSum - research paper analysis client", long_about = None)]
struct Cli {
    /// Backend base URL (overrides PAPERSUM_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Status poll interval in milliseconds (overrides PAPERSUM_POLL_MS)
    #[arg(long, global = true)]
    poll_ms: Option<u64>,

    /// Local state database (overrides PAPERSUM_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend and session status
    Health,

    /// Log in and store the session token
    Login {
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "PAPERSUM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and store the session token
    Signup {
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "PAPERSUM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session token
    Logout,

    /// Upload a PDF and print its paper id
    Upload { file: PathBuf },

    /// Register a paper by URL and print its paper id
    Fetch { url: String },

    /// Start an analysis for an uploaded paper
    Analyze {
        paper_id: String,

        #[command(flatten)]
        options: OptionOverrides,

        /// Print the job id and return without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Upload a PDF, analyze it and wait for the result
    Run {
        file: PathBuf,

        #[command(flatten)]
        options: OptionOverrides,
    },

    /// Show the status of a job
    Status {
        job_id: String,

        /// Keep polling until the job is done
        #[arg(short, long)]
        watch: bool,
    },

    /// List previous analyses
    History,

    /// Show or update server-side settings
    Settings {
        /// New default summary length (short, medium, long)
        #[arg(long)]
        default_summary_length: Option<SummaryLength>,
    },

    /// Show or set the local theme (light, dark)
    Theme { theme: Option<Theme> },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.api_url.as_deref(), cli.poll_ms)?;
    let services = Services::open(cli.db)?;
    let mut app = App::new(config, services, Interrupts::install())?;

    match cli.command {
        Some(Commands::Health) => app.cmd_health().await?,
        Some(Commands::Login { email, password }) => {
            let password = password_or_prompt(password)?;
            app.cmd_login(&email, &password, false).await?
        }
        Some(Commands::Signup { email, password }) => {
            let password = password_or_prompt(password)?;
            app.cmd_login(&email, &password, true).await?
        }
        Some(Commands::Logout) => app.cmd_logout()?,
        Some(Commands::Upload { file }) => {
            app.cmd_upload(&file).await?;
        }
        Some(Commands::Fetch { url }) => {
            app.cmd_fetch(&url).await?;
        }
        Some(Commands::Analyze {
            paper_id,
            options,
            no_wait,
        }) => app.cmd_analyze(&paper_id, options, !no_wait).await?,
        Some(Commands::Run { file, options }) => app.cmd_run(&file, options).await?,
        Some(Commands::Status { job_id, watch }) => app.cmd_status(&job_id, watch).await?,
        Some(Commands::History) => app.cmd_history().await?,
        Some(Commands::Settings {
            default_summary_length,
        }) => app.cmd_settings(default_summary_length).await?,
        Some(Commands::Theme { theme }) => app.cmd_theme(theme)?,
        None => run_interactive(&mut app).await?,
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied
fn load_config(api_url: Option<&str>, poll_ms: Option<u64>) -> Result<PaperSumConfig> {
    let mut config = PaperSumConfig::from_env()?;

    if let Some(url) = api_url {
        config.api.base_url = normalize_base_url(url)?;
    }
    if let Some(ms) = poll_ms {
        if ms == 0 {
            bail!("--poll-ms must be greater than zero");
        }
        config.poll.interval_ms = ms;
    }

    Ok(config)
}

/// `--password` / `PAPERSUM_PASSWORD` when given, otherwise a hidden prompt
fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let password = Password::new().with_prompt("Password").interact()?;
    Ok(password)
}

async fn run_interactive(app: &mut App) -> Result<()> {
    display_welcome();
    app.cmd_health().await?;
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let args = &parts[1..];

        let outcome = match cmd.as_str() {
            "help" | "h" | "?" => {
                display_help();
                Ok(())
            }
            "health" | "s" => app.cmd_health().await,
            "login" | "signup" => match args {
                [email] => match password_or_prompt(None) {
                    Ok(password) => app.cmd_login(email, &password, cmd == "signup").await,
                    Err(e) => Err(e),
                },
                _ => {
                    println!("Usage: {} <email>", cmd);
                    Ok(())
                }
            },
            "logout" => app.cmd_logout(),
            "upload" | "u" => match args {
                [file] => app.cmd_upload(Path::new(file)).await.map(|_| ()),
                _ => {
                    println!("Usage: upload <file.pdf>");
                    Ok(())
                }
            },
            "fetch" => match args {
                [url] => app.cmd_fetch(url).await.map(|_| ()),
                _ => {
                    println!("Usage: fetch <url>");
                    Ok(())
                }
            },
            "analyze" | "a" => handle_analyze_command(app, args).await,
            "run" | "r" => handle_run_command(app, args).await,
            "status" => match args {
                [job_id] => app.cmd_status(job_id, false).await,
                [job_id, "-w" | "--watch"] => app.cmd_status(job_id, true).await,
                _ => {
                    println!("Usage: status <job_id> [--watch]");
                    Ok(())
                }
            },
            "papers" | "p" => {
                app.cmd_papers();
                Ok(())
            }
            "select" => match args {
                [paper_id] => {
                    app.cmd_select(paper_id);
                    Ok(())
                }
                _ => {
                    println!("Usage: select <paper_id>");
                    Ok(())
                }
            },
            "show" => {
                app.cmd_show();
                Ok(())
            }
            "history" => app.cmd_history().await,
            "settings" => match args {
                [] => app.cmd_settings(None).await,
                [length] => match length.parse::<SummaryLength>() {
                    Ok(length) => app.cmd_settings(Some(length)).await,
                    Err(e) => Err(e.into()),
                },
                _ => {
                    println!("Usage: settings [short|medium|long]");
                    Ok(())
                }
            },
            "theme" => match args {
                [] => app.toggle_theme(),
                [name] => match name.parse::<Theme>() {
                    Ok(theme) => app.cmd_theme(Some(theme)),
                    Err(e) => Err(e.into()),
                },
                _ => {
                    println!("Usage: theme [light|dark]");
                    Ok(())
                }
            },
            "clear" | "cls" => {
                print!("\x1B[2J\x1B[1;1H");
                stdout.flush()?;
                Ok(())
            }
            "exit" | "quit" | "q" => {
                println!("  Goodbye!");
                break;
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", cmd);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("Error: {}", error_text(&e));
        }
    }

    Ok(())
}

/// API errors show the server's own message at the prompt
fn error_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<PaperSumError>() {
        Some(e) => e.user_message(),
        None => err.to_string(),
    }
}

fn display_welcome() {
    println!();
    println!("  ╔═╗ ╔═╗ ╔═╗ ╔═╗ ╦═╗ ╔═╗ ╦ ╦ ╔╦╗");
    println!("  ╠═╝ ╠═╣ ╠═╝ ║╣  ╠╦╝ ╚═╗ ║ ║ ║║║");
    println!("  ╩   ╩ ╩ ╩   ╚═╝ ╩╚═ ╚═╝ ╚═╝ ╩ ╩");
    println!();
    println!("  Research Paper Analysis");
    println!();
    println!("  Use the interactive commands:");
    println!();
    println!("  run, r <file.pdf>      # Upload, analyze and wait for the result");
    println!("  status <job> [-w]      # Check (or watch) a running job");
    println!("  papers, p              # List papers in the last result");
    println!("  select <paper_id>      # Show another paper's result");
    println!("  health, s              # Show system status");
    println!("  help                   # Show all command options");
    println!("  exit, quit, q          # Leave the prompt");
    println!();
}

fn display_help() {
    println!();
    println!("Available Commands:");
    println!("  login <email>          Log in (password is prompted)");
    println!("  signup <email>         Create an account");
    println!("  logout                 Forget the stored token");
    println!("  upload, u <file.pdf>   Upload a PDF and print its paper id");
    println!("  fetch <url>            Register a paper by URL");
    println!("  analyze, a <paper_id>  Start an analysis and wait for it");
    println!("  run, r <file.pdf>      Upload then analyze");
    println!("    Options:");
    println!("      -l, --length       short, medium, long");
    println!("      -f, --focus        overall, methodology, literature_review, results, tech_stack");
    println!("      -o, --format       paragraphs, bullet_points, mind_map");
    println!("      -t, --type         summary, critique, notes");
    println!("      --no-wait          Return once the job is started (analyze only)");
    println!("  status <job> [-w]      Show a job's status, --watch polls until done");
    println!("  papers, p              List papers in the last multi-paper result");
    println!("  select <paper_id>      Switch the displayed paper");
    println!("  show                   Show the last result again");
    println!("  history                List previous analyses");
    println!("  settings [length]      Show or set the default summary length");
    println!("  theme [light|dark]     Toggle or set the theme");
    println!("  health, s              Show system status");
    println!("  clear, cls             Clear screen");
    println!("  help, h                Show this help message");
    println!("  exit, quit, q          Leave the prompt");
    println!();
    println!("Tip: Ctrl+C stops waiting on a job without cancelling it on the server,");
    println!("     and exits the prompt otherwise");
    println!();
}

/// Parse `-l/-f/-o/-t <value>` and `--no-wait` from prompt arguments
fn parse_analysis_args(args: &[&str]) -> Result<(OptionOverrides, bool)> {
    let mut options = OptionOverrides::default();
    let mut no_wait = false;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i];
        if flag == "--no-wait" {
            no_wait = true;
            i += 1;
            continue;
        }

        let Some(value) = args.get(i + 1) else {
            bail!("Missing value for {}", flag);
        };
        match flag {
            "-l" | "--length" => options.summary_length = Some(value.parse()?),
            "-f" | "--focus" => options.focus_area = Some(value.parse()?),
            "-o" | "--format" => options.output_format = Some(value.parse()?),
            "-t" | "--type" => options.analysis_type = Some(value.parse()?),
            _ => bail!("Unknown option: {}", flag),
        }
        i += 2;
    }

    Ok((options, no_wait))
}

async fn handle_analyze_command(app: &mut App, args: &[&str]) -> Result<()> {
    let Some((paper_id, rest)) = args.split_first() else {
        println!("Usage: analyze <paper_id> [options]");
        println!("  Example: analyze 42 -l short -t critique");
        return Ok(());
    };

    let (options, no_wait) = parse_analysis_args(rest)?;
    app.cmd_analyze(paper_id, options, !no_wait).await
}

async fn handle_run_command(app: &mut App, args: &[&str]) -> Result<()> {
    let Some((file, rest)) = args.split_first() else {
        println!("Usage: run <file.pdf> [options]");
        println!("  Example: run paper.pdf -f methodology -o bullet_points");
        return Ok(());
    };

    let (options, _) = parse_analysis_args(rest)?;
    app.cmd_run(Path::new(file), options).await
}
