pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "smartflow",
    about = "SmartFlow operator CLI",
    long_about = "Inspect configuration, preview plans, and run the agent pipeline in-process.",
    after_help = "Examples:\n  smartflow config\n  smartflow plan \"book a meeting room\"\n  smartflow chat \"submit my timesheet\" --user-id u1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Show the plan the rule planner produces for a message")]
    Plan {
        #[arg(help = "Message to plan")]
        message: String,
    },
    #[command(about = "Run the full plan, dispatch and reply pipeline for one message")]
    Chat {
        #[arg(help = "Message to send")]
        message: String,
        #[arg(long, help = "Identity propagated to every tool call")]
        user_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Plan { message } => commands::plan::run(&message),
        Command::Chat { message, user_id } => commands::chat::run(&message, &user_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
