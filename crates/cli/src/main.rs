//! Bookaholic CLI - Database migrations, seeding, and user management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bookaholic-cli migrate
//!
//! # Load fixtures from a directory of JSON files
//! bookaholic-cli seed import ./_data
//!
//! # Delete all data
//! bookaholic-cli seed destroy
//!
//! # Create a user of any role
//! bookaholic-cli user create -e admin@example.com -n "Admin Name" -p s3cret! -r admin
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookaholic-cli")]
#[command(author, version, about = "Bookaholic CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Load or delete fixture data
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Insert users, stores, books, and reviews from JSON files
    Import {
        /// Directory containing users.json, stores.json, books.json, reviews.json
        #[arg(default_value = "./_data")]
        dir: String,
    },
    /// Delete all users, stores, books, and reviews
    Destroy,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`user`, `storeowner`, `admin`)
        #[arg(short, long, default_value = "admin")]
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
        Commands::Seed { action } => match action {
            SeedAction::Import { dir } => commands::seed::import(&dir).await?,
            SeedAction::Destroy => commands::seed::destroy().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                role,
            } => commands::user::create(&email, &name, &password, &role).await?,
        },
    }
    Ok(())
}
