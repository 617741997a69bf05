//! Orderly CLI - Migrations, reports and queue tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! orderly-cli migrate
//!
//! # Build today's report (what the nightly cron runs)
//! orderly-cli report generate
//!
//! # Rebuild or inspect a given day
//! orderly-cli report generate --date 2025-01-31
//! orderly-cli report show --date 2025-01-31
//!
//! # Queue a command for orderly-worker
//! orderly-cli send product '{"product_name": "Widget", "quantity": 5}'
//! orderly-cli send order '{"user_id": 1, "items": [{"product_id": 1, "quantity": 3}]}'
//! orderly-cli send product '{"action": "out_of_stock", "id": 1}'
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (`migrate`, `report`)
//! - `REDIS_URL` - Redis connection string (`send`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

use orderly_server::worker::Channel;

mod commands;

#[derive(Parser)]
#[command(name = "orderly-cli")]
#[command(author, version, about = "Orderly CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
    },
    /// Build or inspect daily order reports
    Report {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
        database_url: Option<String>,

        #[command(subcommand)]
        action: ReportAction,
    },
    /// Push a JSON command onto a worker queue
    Send {
        /// Target queue
        queue: Queue,

        /// Command payload, e.g. `{"action": "update", "id": 1, "quantity": 4}`
        payload: String,

        #[arg(long, env = "REDIS_URL", hide_env_values = true)]
        redis_url: String,
    },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Rebuild the report rows for a day (default: today)
    Generate {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the report rows for a day (default: today)
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Queue {
    Order,
    Product,
}

impl From<Queue> for Channel {
    fn from(queue: Queue) -> Self {
        match queue {
            Queue::Order => Self::Order,
            Queue::Product => Self::Product,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate { database_url } => {
            commands::migrate::run(&SecretString::from(database_url)).await?;
        }
        Commands::Report {
            database_url,
            action,
        } => {
            let database_url = database_url
                .map(SecretString::from)
                .ok_or(commands::CliError::MissingEnvVar("DATABASE_URL"))?;
            match action {
                ReportAction::Generate { date } => {
                    commands::report::generate(&database_url, date.unwrap_or_else(today)).await?;
                }
                ReportAction::Show { date } => {
                    commands::report::show(&database_url, date.unwrap_or_else(today)).await?;
                }
            }
        }
        Commands::Send {
            queue,
            payload,
            redis_url,
        } => {
            commands::send::push(&SecretString::from(redis_url), queue.into(), &payload).await?;
        }
    }
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
