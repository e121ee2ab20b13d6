//! Nellore Market CLI - Database migrations, seeding and account tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply the embedded schema migrations
//! nm-cli migrate
//!
//! # Load demo categories, listings and accounts
//! nm-cli seed --file crates/cli/seed/nellore.yaml --clear
//!
//! # Create an account directly
//! nm-cli user create -n "Admin" -e admin@example.com -p 'long-passphrase' -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Load a YAML seed file
//! - `user create` - Create a customer, vendor or admin account
//!
//! The database comes from `MARKET_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nm-cli")]
#[command(author, version, about = "Nellore Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long)]
        file: String,

        /// Delete all marketplace data before seeding
        #[arg(long)]
        clear: bool,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Role (`customer`, `vendor`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => {
            commands::seed::from_file(&file, clear).await?;
        }
        Commands::User { action } => match action {
            UserAction::Create {
                name,
                email,
                password,
                role,
            } => {
                commands::user::create(&name, &email, &password, &role).await?;
            }
        },
    }
    Ok(())
}
