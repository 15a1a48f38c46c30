#![forbid(unsafe_code)]

mod actions;
mod commands;
mod helpers;

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Generator, Shell};
use commands::{BlobCommand, CatalogCommand, EvaluateArgs, LayoutCommand, ResultCommand, TestCommand};
use commtest_core::{
    resolve_config_path, CommtestConfig, ConfigPathScope, ExitCode, MachineError,
    ENV_COMMTEST_CONFIG, ENV_COMMTEST_LOG_JSON, ENV_COMMTEST_LOG_LEVEL,
};
use serde_json::json;
use std::fmt::Display;
use std::process::ExitCode as ProcessExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const COMMTEST_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "commtest", version)]
#[command(about = "Commissioning test forms: author, inspect and record results")]
#[command(help_template = COMMTEST_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  COMMTEST_CONFIG      Config file path\n  COMMTEST_DATA_DIR    Local store root\n  COMMTEST_LOG_LEVEL   Log verbosity override\n  COMMTEST_LOG_JSON    1 for JSON logs, 0 for human logs"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,
    #[arg(long = "print-config-paths", default_value_t = false)]
    print_config_paths: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    Test {
        #[command(subcommand)]
        command: TestCommand,
    },
    Layout {
        #[command(subcommand)]
        command: LayoutCommand,
    },
    /// Check a value against an expectation.
    Evaluate(EvaluateArgs),
    Result {
        #[command(subcommand)]
        command: ResultCommand,
    },
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    Blob {
        #[command(subcommand)]
        command: BlobCommand,
    },
}

#[derive(Clone, Copy)]
struct LogFlags {
    quiet: bool,
    verbose: u8,
    trace: bool,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError::usage("invalid command line arguments")
                    .with_detail("error", &err.to_string()));
            }
        },
    };
    let output_mode = OutputMode { json: cli.json };
    if cli.print_config_paths {
        return emit_config_paths(output_mode);
    }

    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    if let Commands::Completion { shell } = command {
        print_completion(shell);
        return Ok(());
    }

    let config = CommtestConfig::discover().map_err(|e| CliError::usage(&e.to_string()))?;
    init_tracing(
        &config,
        LogFlags {
            quiet: cli.quiet,
            verbose: cli.verbose,
            trace: cli.trace,
        },
    );

    match command {
        Commands::Completion { .. } => Ok(()),
        Commands::Test { command } => actions::run_test_command(command, &config, output_mode),
        Commands::Layout { command } => actions::run_layout_command(command, &config, output_mode),
        Commands::Evaluate(args) => actions::run_evaluate(&args, output_mode),
        Commands::Result { command } => actions::run_result_command(command, &config, output_mode),
        Commands::Catalog { command } => {
            actions::run_catalog_command(command, &config, output_mode)
        }
        Commands::Blob { command } => actions::run_blob_command(command, &config, output_mode),
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

fn log_filter(config: &CommtestConfig, flags: LogFlags) -> EnvFilter {
    let level = if flags.trace {
        Some("trace".to_string())
    } else if flags.verbose > 0 {
        Some("debug".to_string())
    } else if flags.quiet {
        Some("error".to_string())
    } else {
        None
    };
    if let Some(level) = level {
        return EnvFilter::new(level);
    }
    EnvFilter::try_from_env(ENV_COMMTEST_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_deref().unwrap_or("info")))
}

// Logs go to stderr; stdout carries command output.
fn init_tracing(config: &CommtestConfig, flags: LogFlags) {
    let filter = log_filter(config, flags);
    let log_json = env_flag(ENV_COMMTEST_LOG_JSON).unwrap_or(config.log_json);
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

fn emit_config_paths(output_mode: OutputMode) -> Result<(), CliError> {
    let payload = json!({
        "env_config": std::env::var(ENV_COMMTEST_CONFIG).ok(),
        "user_config": resolve_config_path(ConfigPathScope::User),
        "workspace_config": resolve_config_path(ConfigPathScope::Workspace),
        "data_dir": CommtestConfig::discover().unwrap_or_default().data_dir(),
    });
    helpers::emit_ok(output_mode, &payload)
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    pub(crate) fn validation(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new("validation_error", message),
        }
    }

    pub(crate) fn dependency(message: &str) -> Self {
        Self {
            exit_code: ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", message),
        }
    }

    pub(crate) fn internal(err: impl Display) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &err.to_string()),
        }
    }

    #[must_use]
    pub(crate) fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }

}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (key, value) in &error.machine.details {
            eprintln!("  {key}: {value}");
        }
    }
}
