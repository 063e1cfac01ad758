pub mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use fusion_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "fusion",
    about = "FusionDesk operator CLI",
    long_about = "Route support tickets, inspect history, run evaluations and data-quality checks, \
                  and operate FusionDesk migrations and configuration.",
    after_help = "Examples:\n  fusion migrate\n  fusion process --id 11 --customer 1001 --message \"How do I reset password?\"\n  fusion history --customer 1001 --limit 5\n  fusion doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic customer profile fixtures")]
    Seed,
    #[command(about = "Route one ticket and print the decision")]
    Process(ProcessArgs),
    #[command(about = "List stored tickets for a customer, newest first")]
    History {
        #[arg(long, help = "Customer identifier")]
        customer: String,
        #[arg(long, help = "Maximum number of tickets (defaults to support.history_limit)")]
        limit: Option<u32>,
    },
    #[command(about = "Replay the gold ticket set and report intent accuracy")]
    Evaluate,
    #[command(about = "Score a JSON file of ticket payloads for missing values and store the run")]
    Quality {
        #[arg(long, help = "Path to a JSON array of ticket payloads")]
        file: PathBuf,
        #[arg(long, help = "Dataset name recorded with the run (defaults to the file name)")]
        dataset: Option<String>,
        #[arg(long, default_value = "cli", help = "Operator recorded as the uploader")]
        uploaded_by: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, knowledge base and model readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Default, Args)]
pub struct ProcessArgs {
    #[arg(
        long,
        help = "Path to a JSON ticket payload",
        conflicts_with_all = ["id", "customer", "message"]
    )]
    pub file: Option<PathBuf>,
    #[arg(long, help = "Ticket identifier")]
    pub id: Option<String>,
    #[arg(long, help = "Customer identifier")]
    pub customer: Option<String>,
    #[arg(long, help = "Ticket message text")]
    pub message: Option<String>,
    #[arg(long, help = "Channel: email, chat, phone, ticket or web")]
    pub channel: Option<String>,
    #[arg(long, help = "Explicit priority: low, medium or high")]
    pub priority: Option<String>,
    #[arg(long, help = "Product or plan name")]
    pub product: Option<String>,
    #[arg(long, help = "SLA hours hint")]
    pub sla_hours: Option<u32>,
}

/// Runtime warnings go to stderr so stdout carries only the command payload.
fn init_logging(logging: &LoggingConfig) {
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("fusion: logging disabled: {error}");
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Commands report config failures themselves; logging falls back to defaults.
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Process(args) => commands::process::run(args),
        Command::History { customer, limit } => commands::history::run(&customer, limit),
        Command::Evaluate => commands::evaluate::run(),
        Command::Quality { file, dataset, uploaded_by } => {
            commands::quality::run(&file, dataset.as_deref(), &uploaded_by)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn process_accepts_inline_ticket_fields() {
        let cli = Cli::try_parse_from([
            "fusion",
            "process",
            "--id",
            "11",
            "--customer",
            "1001",
            "--message",
            "How do I reset password?",
            "--sla-hours",
            "24",
        ])
        .expect("parse");

        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.id.as_deref(), Some("11"));
                assert_eq!(args.sla_hours, Some(24));
                assert!(args.file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn process_rejects_file_combined_with_inline_fields() {
        let result = Cli::try_parse_from([
            "fusion", "process", "--file", "ticket.json", "--message", "hello",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quality_defaults_uploader() {
        let cli = Cli::try_parse_from(["fusion", "quality", "--file", "rows.json"]).expect("parse");
        match cli.command {
            Command::Quality { uploaded_by, dataset, .. } => {
                assert_eq!(uploaded_by, "cli");
                assert!(dataset.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
