use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use guard::{EmailGuard, FormId};
use miette::{Context, Result};
use tracing::debug;

mod commands;
mod config;
mod logging;
mod storage;

use config::Cfg;
use storage::FileSystemStorage;

#[derive(Parser)]
#[command(name = "formguard", version)]
#[command(about = "Blocks form submissions that use free email providers")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", default_value = "formguard.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Block-list settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Per-form settings
    #[command(subcommand)]
    Form(FormCommand),

    /// Check a single email address against a form
    Check {
        /// Form ID
        #[arg(long)]
        form: String,

        /// Submitted email address
        #[arg(long)]
        email: String,
    },

    /// Validate a submission file (form id plus field values)
    Submit { path: Utf8PathBuf },

    /// List rejected submissions
    Rejections,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the current domains and rejection message
    Show,

    /// Replace the domains and rejection message
    Set {
        /// Comma-separated list of blocked domains
        #[arg(long)]
        domains: String,

        /// Message shown for rejected addresses
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand)]
enum FormCommand {
    /// Store a form definition exported by the host
    Import { path: Utf8PathBuf },

    /// Show a stored form
    Show { id: String },

    /// Turn on blocking of free email providers for a form
    Enable { id: String },

    /// Turn off blocking of free email providers for a form
    Disable { id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cfg = Cfg::load(&cli.config).wrap_err_with(|| format!("loading {}", cli.config))?;
    logging::init(&cfg)?;
    debug!(base_path = %cfg.storage.base_path, "opening storage");

    let storage = Arc::new(FileSystemStorage::new(&cfg.storage.base_path).await?);
    let guard = EmailGuard::new(storage.clone(), storage.clone(), storage.clone())
        .with_defaults(cfg.block_list_defaults());

    match cli.command {
        Command::Settings(SettingsCommand::Show) => commands::show_settings(&guard).await?,
        Command::Settings(SettingsCommand::Set { domains, message }) => {
            commands::save_settings(&guard, &domains, &message).await?
        }
        Command::Form(FormCommand::Import { path }) => {
            commands::import_form(storage.as_ref(), &path).await?
        }
        Command::Form(FormCommand::Show { id }) => {
            commands::show_form(&guard, &FormId::new(id)).await?
        }
        Command::Form(FormCommand::Enable { id }) => {
            commands::toggle_form(&guard, &FormId::new(id), true).await?
        }
        Command::Form(FormCommand::Disable { id }) => {
            commands::toggle_form(&guard, &FormId::new(id), false).await?
        }
        Command::Check { form, email } => {
            return commands::check(&guard, &FormId::new(form), &email).await;
        }
        Command::Submit { path } => return commands::submit(&guard, &path).await,
        Command::Rejections => commands::list_rejections(&guard).await?,
    }

    Ok(ExitCode::SUCCESS)
}
