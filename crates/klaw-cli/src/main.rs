use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use klaw_core::config::load_settings;
use klaw_core::error::{classify, ErrorClass, EXIT_FAILURE};
use klaw_render::Format;

mod commands;
mod prompt;

const LOG_ENV: &str = "KLAW_LOG";

#[derive(Parser)]
#[command(
    name = "klaw",
    version,
    about = "Keep TODO comments and GitHub issues in step"
)]
struct Cli {
    /// Directory to scan (overrides `directory` in klaw.yml)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Path to klaw.yml (default: search the root and its ancestors)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile annotations with remote issues (default)
    List(ListArgs),
    /// Create issues for untracked annotations and tag them in place
    Create(CreateArgs),
    /// Print the resolved configuration
    Config,
    /// Print version information
    Version,
}

#[derive(Args, Default)]
pub(crate) struct ListArgs {
    /// Rewrite drifted annotations to the remote state
    #[arg(short, long)]
    pub update: bool,
    /// Hide rows whose state is closed
    #[arg(short, long)]
    pub skip_closed: bool,
    /// List local annotations only, without contacting GitHub
    #[arg(short, long)]
    pub offline: bool,
    /// Output format: table, json or csv
    #[arg(long, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Args)]
pub(crate) struct CreateArgs {
    /// Create every untracked annotation without asking
    #[arg(short, long)]
    pub yes: bool,
    /// Rejected: creating issues needs the remote tracker
    #[arg(short, long, hide = true)]
    pub offline: bool,
    #[arg(long, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self, terminal: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => terminal && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

/// Whether styling is enabled for each output stream.
#[derive(Clone, Copy)]
pub(crate) struct Colors {
    pub stdout: bool,
    pub stderr: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(classify)
        .map(ErrorClass::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

fn run(cli: Cli, colors: Colors) -> Result<()> {
    let command = cli.command.unwrap_or(Command::List(ListArgs::default()));
    if let Command::Version = command {
        println!("klaw {}", klaw_core::version());
        return Ok(());
    }

    let start = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let settings = load_settings(&start, cli.config.as_deref(), cli.root.as_deref())?;
    tracing::debug!(config = %settings.config_path.display(), root = %settings.root.display(), "loaded settings");

    match command {
        Command::List(args) => commands::list(&settings, &args, colors),
        Command::Create(args) => commands::create(&settings, &args, colors),
        Command::Config => commands::show_config(&settings, colors),
        Command::Version => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let colors = Colors {
        stdout: cli.color.enabled(io::stdout().is_terminal()),
        stderr: cli.color.enabled(io::stderr().is_terminal()),
    };

    match run(cli, colors) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if colors.stderr {
                eprintln!("{} {:#}", "[error]".red(), err);
            } else {
                eprintln!("[error] {:#}", err);
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klaw_core::config::ConfigError;
    use klaw_core::issue::IssueError;

    #[test]
    fn exit_code_follows_context_chain() {
        let err = anyhow::Error::new(ConfigError::MissingToken).context("loading settings");
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(IssueError::Rejected("nope".to_string())).context("listing");
        assert_eq!(exit_code(&err), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }

    #[test]
    fn list_is_the_default_command() {
        let cli = Cli::try_parse_from(["klaw", "--root", "/tmp"]).expect("parse");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["klaw", "list", "-u", "-s", "--format", "json"]).expect("parse");
        match cli.command {
            Some(Command::List(args)) => {
                assert!(args.update && args.skip_closed && !args.offline);
                assert_eq!(args.format, Format::Json);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn color_never_and_always_ignore_terminal() {
        assert!(!ColorChoice::Never.enabled(true));
        assert!(ColorChoice::Always.enabled(false));
        assert!(!ColorChoice::Auto.enabled(false));
    }
}
