//! # SchoolHub CLI
//!
//! Operator tool for the SchoolHub data-access layer. Wires configuration,
//! logging and the services together.
//!
//! ## Commands
//!
//! - `check`: backend health
//! - `seed-demo`: register the demo accounts and their profiles
//! - `list <entity>`: print an entity table as JSON
//! - `fallback <entity>`: print generated offline data
//! - `sign-in <email>`: sign in and remember the user in the state file
//! - `state show|clear`: inspect or reset the persisted client state
//!
//! Without `SCHOOLHUB_BACKEND_URL` every command runs against an offline
//! in-memory backend, so reads show fallback data.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p schoolhub-cli -- list students
//! SCHOOLHUB_PASSWORD=admin123 cargo run -p schoolhub-cli -- sign-in admin@jollychildren.edu
//! ```

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use schoolhub_shared::config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "schoolhub", version, about = "SchoolHub data-access operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the backend answers
    Check,

    /// Register the demo accounts
    SeedDemo,

    /// Print every row of an entity as JSON
    List {
        #[arg(value_enum)]
        entity: EntityKind,
    },

    /// Print generated offline data as JSON
    Fallback {
        #[arg(value_enum)]
        entity: FallbackKind,

        /// Generator seed (defaults to SCHOOLHUB_FALLBACK_SEED, then entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of rows (ignored for users)
        #[arg(long)]
        count: Option<usize>,
    },

    /// Sign in and store the user in the state file
    SignIn {
        email: String,

        #[arg(long, env = "SCHOOLHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Inspect or reset the persisted client state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntityKind {
    Students,
    Staff,
    Attendance,
    Grades,
    Billing,
    Users,
    Settings,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FallbackKind {
    Students,
    Staff,
    Users,
}

#[derive(Debug, Subcommand)]
enum StateAction {
    Show,
    Clear,
}

fn init_tracing() {
    let json = std::env::var("SCHOOLHUB_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // stdout carries command output, logs go to stderr
    let (plain, structured) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schoolhub=info,schoolhub_shared=info".into()),
        )
        .with(plain)
        .with(structured)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::debug!(
        "SchoolHub CLI v{} (shared v{})",
        env!("CARGO_PKG_VERSION"),
        schoolhub_shared::VERSION
    );

    match cli.command {
        Command::Check => commands::check(&config).await,
        Command::SeedDemo => commands::seed_demo(&config).await,
        Command::List { entity } => commands::list(&config, entity).await,
        Command::Fallback {
            entity,
            seed,
            count,
        } => commands::fallback(&config, entity, seed, count),
        Command::SignIn { email, password } => commands::sign_in(&config, &email, &password).await,
        Command::State { action } => commands::state(&config, action).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fallback_arguments() {
        let cli = Cli::try_parse_from(["schoolhub", "fallback", "staff", "--seed", "7", "--count", "3"])
            .unwrap();
        match cli.command {
            Command::Fallback {
                entity: FallbackKind::Staff,
                seed: Some(7),
                count: Some(3),
            } => {}
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_entity_rejected() {
        assert!(Cli::try_parse_from(["schoolhub", "list", "parents"]).is_err());
    }
}
