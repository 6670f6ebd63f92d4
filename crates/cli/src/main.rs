//! Studio Nullbyte CLI - admin role management and configuration checks.
//!
//! # Usage
//!
//! ```bash
//! # Grant the admin role to an existing account
//! nb-cli admin promote ada@example.com
//!
//! # Revoke it again
//! nb-cli admin demote ada@example.com
//!
//! # Verify configuration and Supabase connectivity
//! nb-cli check
//! ```
//!
//! # Commands
//!
//! - `admin promote|demote` - Set `user_profiles.role` (needs the service role key)
//! - `check` - Load the storefront configuration and reach Supabase

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nb-cli")]
#[command(author, version, about = "Studio Nullbyte CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the admin role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Check configuration and Supabase connectivity
    Check,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an account the admin role
    Promote {
        /// Account email address
        email: String,
    },
    /// Return an account to the user role
    Demote {
        /// Account email address
        email: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

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
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::demote(&email).await?;
            }
        },
        Commands::Check => commands::check::run().await?,
    }
    Ok(())
}
