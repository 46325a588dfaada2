//! Skyglow Demo CLI
//!
//! Command-line interface for sending notifications through a Skyglow relay
//! and reading back feedback.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "skyglow-demo")]
#[command(about = "Skyglow Demo CLI - Send end-to-end encrypted notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Relay base URL; skips DNS bootstrap
    #[arg(long, global = true, env = "SKYGLOW_RELAY_URL")]
    relay_url: Option<String>,

    /// Server name to bootstrap from (`_sgn.<server>` TXT record)
    #[arg(long, global = true, env = "SKYGLOW_SERVER")]
    server: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the relay address and routing key of a device token
    Inspect {
        /// Device token (base64 or 64 hex characters)
        token: String,
    },

    /// Send a notification to a device
    Send {
        /// Device token (base64 or 64 hex characters)
        token: String,

        /// Notification text
        #[arg(short, long)]
        message: String,

        /// Sound file bundled with the app
        #[arg(short, long)]
        sound: Option<String>,

        /// Badge number (0 clears the badge)
        #[arg(short, long)]
        badge: Option<i32>,

        /// Lock screen slider action
        #[arg(short, long, value_enum, default_value = "view")]
        action: ActionArg,

        /// Send without end-to-end encryption
        #[arg(long)]
        plaintext: bool,
    },

    /// Send a raw JSON payload, sealed for the device
    SendPayload {
        /// Device token (base64 or 64 hex characters)
        token: String,

        /// JSON object to seal
        payload: String,
    },

    /// Register a device token for feedback
    RegisterFeedback {
        /// Device token (base64 or 64 hex characters)
        token: String,

        /// Application feedback key (hex)
        #[arg(short, long)]
        feedback_key: String,
    },

    /// Fetch feedback for a feedback key
    Feedback {
        /// Application feedback key (hex)
        #[arg(short, long)]
        feedback_key: String,

        /// Only records after this RFC 3339 time (default: last 24 hours)
        #[arg(short, long)]
        after: Option<String>,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a random feedback key
    GenFeedbackKey {
        /// Key length in bytes
        #[arg(short, long, default_value = "32")]
        len: usize,
    },

    /// Resolve a server's relay from DNS
    Resolve {
        /// Server name (e.g., d.preloading.dev)
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    View,
    Open,
}

impl From<ActionArg> for skyglow_lib::AlertAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::View => Self::View,
            ActionArg::Open => Self::Open,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("skyglow_demo_cli=debug,skyglow_lib=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("skyglow_demo_cli=info,skyglow_lib=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let relay = commands::RelayArgs {
        relay_url: cli.relay_url,
        server: cli.server,
        timeout_secs: cli.timeout,
    };

    match cli.command {
        Commands::Inspect { token } => {
            commands::inspect::run(&token, cli.verbose)?;
        }
        Commands::Send {
            token,
            message,
            sound,
            badge,
            action,
            plaintext,
        } => {
            let options = commands::send::SendOptions {
                message,
                sound,
                badge,
                action: action.into(),
                plaintext,
            };
            commands::send::run(&relay, &token, options, cli.verbose).await?;
        }
        Commands::SendPayload { token, payload } => {
            commands::send::run_payload(&relay, &token, &payload, cli.verbose).await?;
        }
        Commands::RegisterFeedback {
            token,
            feedback_key,
        } => {
            commands::feedback::register(&relay, &token, &feedback_key, cli.verbose).await?;
        }
        Commands::Feedback {
            feedback_key,
            after,
            json,
        } => {
            commands::feedback::fetch(&relay, &feedback_key, after.as_deref(), json, cli.verbose)
                .await?;
        }
        Commands::GenFeedbackKey { len } => {
            commands::feedback::generate_key(len)?;
        }
        Commands::Resolve { name } => {
            commands::resolve::run(&name, cli.timeout, cli.verbose).await?;
        }
    }

    Ok(())
}
