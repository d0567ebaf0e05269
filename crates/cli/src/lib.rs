pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "partsdesk",
    about = "Partsdesk operator CLI",
    long_about = "Talk to the parts assistant, inspect the catalog and configuration, and run readiness checks.",
    after_help = "Examples:\n  partsdesk chat --message \"Is PS11752778 compatible with WDT780SAEM1?\"\n  partsdesk classify \"my ice maker is broken\"\n  partsdesk doctor --json\n  partsdesk smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Send one message through the agent pipeline and print the response")]
    Chat {
        #[arg(long, short, help = "Customer message")]
        message: String,
        #[arg(long, help = "Continue an existing conversation id")]
        conversation_id: Option<String>,
    },
    #[command(about = "Classify a message into an intent with extracted entities")]
    Classify {
        #[arg(help = "Message to classify")]
        message: String,
    },
    #[command(about = "Summarize the loaded product catalog and troubleshooting guides")]
    Catalog,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog loading, and LLM client readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run offline end-to-end checks with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { message, conversation_id } => {
            commands::chat::run(&message, conversation_id.as_deref())
        }
        Command::Classify { message } => commands::classify::run(&message),
        Command::Catalog => commands::catalog::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Smoke => commands::smoke::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
