//! gobarber - a terminal front-end for the GoBarber scheduling service.
//!
//! Each subcommand plays one page of the app against the shared session
//! core: sign in and out, manage the profile and browse the provider's
//! schedule.

mod app;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Reported};
use gobarber_core::Config;
use ui::Toast;

/// Log file written next to the session storage
const LOG_FILE: &str = "gobarber.log";

#[derive(Parser)]
#[command(name = "gobarber", version, about = "Sign in, manage your profile and check your schedule")]
struct Cli {
    /// API base URL, overriding the config file
    #[arg(long, global = true, env = "GOBARBER_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Resolve a path through the route guard
    Open { path: String },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Request a password recovery email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password from a recovery link
    ResetPassword {
        /// The emailed link, or its `?token=...` query
        link: String,
    },
    /// Update name, email or password
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Prompt for the current and new password
        #[arg(long)]
        change_password: bool,
    },
    /// Upload a new avatar image
    Avatar { file: PathBuf },
    /// List the day's appointments
    Appointments {
        /// Day to show (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the fully booked days of a month
    Availability {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

async fn run(mut app: App, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => app.login(email).await,
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami(),
        Command::Open { path } => app.open(&path),
        Command::Signup { name, email } => app.signup(name, email).await,
        Command::ForgotPassword { email } => app.forgot_password(email).await,
        Command::ResetPassword { link } => app.reset_password(&link).await,
        Command::Profile {
            name,
            email,
            change_password,
        } => app.profile(name, email, change_password).await,
        Command::Avatar { file } => app.avatar(&file).await,
        Command::Appointments { date } => app.appointments(date).await,
        Command::Availability { year, month } => app.availability(year, month).await,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().with_env_overrides();
    if let Some(url) = cli.api_url {
        config.api_base_url = Some(url);
    }

    let _log_guard = init_tracing(config.storage_dir().ok().as_deref());
    info!("gobarber starting");

    let result = match App::new(config) {
        Ok(app) => run(app, cli.command).await,
        Err(e) => Err(e),
    };

    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Reported>() {
                Some(Reported(toast)) => toast.show(),
                None => Toast::error("Error").with_description(format!("{:#}", e)).show(),
            }
            ExitCode::FAILURE
        }
    })
}
