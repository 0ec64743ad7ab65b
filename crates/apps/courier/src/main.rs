//! Courier - Gmail search, attachment download and send from the command line
//!
//! This is the main entry point for the Courier binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;

use mail::{
    AttachmentStore, GmailAuth, GmailClient, GmailCredentials, MailSearch, OutgoingMessage,
    Settings,
};

mod output;

#[derive(Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search messages and save their attachments
    Search {
        /// Gmail search query (e.g. "from:alice has:attachment")
        query: String,
        /// Follow result pages instead of stopping after the first
        #[arg(long)]
        all_pages: bool,
        /// Root of the attachment tree (overrides settings)
        #[arg(long, value_name = "DIR", env = "COURIER_ATTACHMENTS_DIR")]
        attachments_dir: Option<PathBuf>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a message
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        /// Sender address (overrides settings)
        #[arg(long, env = "COURIER_SENDER")]
        from: Option<String>,
        /// File to attach; repeat for several
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,
    },
    /// Forget the cached Gmail token
    Logout,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;

    match cli.command {
        Commands::Search {
            query,
            all_pages,
            attachments_dir,
            json,
        } => {
            let client = GmailClient::new(gmail_auth()?);
            let store =
                AttachmentStore::new(attachments_dir.unwrap_or(settings.attachments_dir))?;
            info!("Saving attachments under {}", store.root().display());
            let search = MailSearch::new(&client, &store);

            let records = if all_pages {
                search.search_all_pages(&query)?
            } else {
                search.search(&query)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                output::print_records(&records);
            }
        }
        Commands::Send {
            to,
            subject,
            body,
            from,
            attachments,
        } => {
            let client = GmailClient::new(gmail_auth()?);

            let mut message = OutgoingMessage::new(to, subject, body);
            if let Some(sender) = from.or(settings.sender) {
                message = message.sender(sender);
            }
            for path in attachments {
                message = message.attach(path);
            }

            let ack = mail::send(&client, &message)?;
            println!("Sent message {}", ack.id);
        }
        Commands::Logout => {
            let auth = gmail_auth()?;
            auth.logout()?;
            println!("Logged out ({} removed)", auth.token_path().display());
        }
    }

    Ok(())
}

/// Build the OAuth handle from configured credentials
fn gmail_auth() -> Result<GmailAuth> {
    let creds = GmailCredentials::load().inspect_err(|_| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            warn!(
                "To configure Gmail access, either:\n\
                 1. Place your Google OAuth credentials at: {}\n\
                 2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                path.display()
            );
        }
    })?;

    GmailAuth::new(creds.client_id, creds.client_secret).context("Failed to set up Gmail auth")
}
