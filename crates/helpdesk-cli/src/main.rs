#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hd: helpdesk ticket lifecycle and SLA deadlines",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (overridden by `HD_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Engine config file (default: `.helpdesk/config.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Acting principal's email (falls back to `HD_ACTOR`).
    #[arg(long, global = true, value_name = "EMAIL")]
    actor: Option<String>,

    /// Role held by the actor; repeatable (falls back to `HD_ROLES`).
    #[arg(long = "role", global = true, value_name = "ROLE")]
    roles: Vec<String>,

    /// Evaluate as of this instant (RFC 3339) instead of the system clock.
    #[arg(long, global = true, value_name = "TIME")]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }

    fn globals(&self) -> anyhow::Result<cmd::Globals> {
        Ok(cmd::Globals {
            project_root: env::current_dir()?,
            config: self.config.clone(),
            actor: self.actor.clone(),
            roles: self.roles.clone(),
            now: self.now,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a helpdesk store",
        after_help = "EXAMPLES:\n    # Create .helpdesk/ in the current directory\n    hd init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "Compute an SLA deadline",
        long_about = "Compute the guaranteed-resolution time for a category from a start instant.",
        after_help = "EXAMPLES:\n    # Deadline for a hardware ticket opened now\n    hd deadline --category Hardware\n\n    # From a fixed start\n    hd deadline --category Other --start 2025-03-07T15:30:00Z"
    )]
    Deadline(cmd::deadline::DeadlineArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Open a new ticket",
        after_help = "EXAMPLES:\n    hd --actor bob@corp.io create --id 2025-0001 --title \"VPN drops\" --content \"Every ten minutes\""
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one ticket",
        after_help = "EXAMPLES:\n    hd show 2025-0001\n    hd show 2025-0001 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List tickets",
        after_help = "EXAMPLES:\n    hd list --open\n    hd list --status Resolved --category Hardware"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Apply changes to a ticket",
        long_about = "Apply a change set to a ticket. Requires an actor holding the agent role.",
        after_help = "EXAMPLES:\n    # Resolve with a closing note\n    hd --actor ann@helpdesk.io --role sd update 2025-0001 --status Resolved --closing-comment \"Replaced cable\"\n\n    # Reopen\n    hd update 2025-0001 --status Open\n\n    # Apply a JSON change set\n    hd update 2025-0001 --changes changes.json"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    hd completions bash > /etc/bash_completion.d/hd"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("HD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "helpdesk_core=debug,hd=debug,warn"
        } else {
            "warn"
        })
    });

    let format = env::var("HD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let output = cli.output_mode();
    let globals = cli.globals()?;

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &globals, output),
        Commands::Deadline(args) => cmd::deadline::run_deadline(args, &globals, output),
        Commands::Create(args) => cmd::create::run_create(args, &globals, output),
        Commands::Show(args) => cmd::show::run_show(args, &globals, output),
        Commands::List(args) => cmd::list::run_list(args, &globals, output),
        Commands::Update(args) => cmd::update::run_update(args, &globals, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    helpdesk_core::init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error = CliError::from(&err);
            tracing::debug!(code = error.error_code, error = ?err, "command failed");
            render_error(cli.output_mode(), &error);
            ExitCode::FAILURE
        }
    }
}
