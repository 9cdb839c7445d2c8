//! services/admin/src/bin/admin.rs
//!
//! Command-line front-end for the Pay Jobber administration backend.

use admin_lib::{
    config::Config,
    error::AdminError,
    flows::{
        AppState, LoginFlow, Navigator, PolicyHistoryView, UploadFlow, UploadHistoryView,
        UploadOutcome,
    },
};
use clap::{Parser, Subcommand};
use payjobber_admin_core::domain::{DocumentType, MessageKind, StatusMessage};
use payjobber_admin_core::guard::{
    GuardDecision, POLICY_HISTORY_PATH, UPLOAD_LOG_PATH, UPLOAD_PATH,
};
use payjobber_admin_core::upload::format_bytes;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// payjobber-admin - operator console for availability uploads and history
#[derive(Parser, Debug)]
#[command(name = "payjobber-admin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend base URL (overrides ADMIN_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store the session locally
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the stored session
    Logout,

    /// Show the stored session
    Whoami,

    /// Check whether a route can be opened with the current session
    Open {
        /// Route path, e.g. /retiros/log
        path: String,
    },

    /// Upload an availability spreadsheet (.xlsx or .xls, up to 10 MB)
    Upload {
        file: PathBuf,
    },

    /// List past availability uploads
    History,

    /// Download the annotated spreadsheet of an upload
    Download {
        upload_id: String,
        /// Directory to save into (overrides DOWNLOAD_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show policy acceptance events for a document holder
    Policies {
        /// DNI or CE
        #[arg(long, default_value = "DNI", value_parser = parse_document_type)]
        doc_type: DocumentType,
        #[arg(long)]
        doc_number: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(api_url = %config.api_url, "Configuration loaded");

    // --- 2. Build the Shared AppState ---
    let state = match AppState::from_config(Arc::new(config)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    // --- 3. Run the Command ---
    match run(cli.command, &state).await {
        Ok(code) => code,
        Err(e) => {
            print_message(&StatusMessage::error(e.user_message()));
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, AdminError> {
    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    if let Commands::Download { out: Some(out), .. } = &cli.command {
        config.download_dir = out.clone();
    }
    Ok(config)
}

async fn run(command: Commands, state: &AppState) -> Result<ExitCode, AdminError> {
    let navigator = Navigator::new(state);

    match command {
        Commands::Login { username, password } => {
            match LoginFlow::new(state).submit(&username, &password).await {
                Ok(outcome) => {
                    print_message(&outcome.message);
                    println!("Next page: {}", outcome.landing_page);
                }
                Err(message) => {
                    print_message(&message);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Commands::Logout => {
            let next = LoginFlow::new(state).logout();
            println!("Logged out. Next page: {}", next);
        }

        Commands::Whoami => {
            let snapshot = state.session.snapshot();
            if !snapshot.is_authenticated() {
                println!("Not logged in");
                return Ok(ExitCode::FAILURE);
            }
            println!(
                "{} (role: {}, token type: {})",
                snapshot.username.as_deref().unwrap_or("?"),
                snapshot.role.as_deref().unwrap_or("none"),
                snapshot.token_type.as_deref().unwrap_or("?"),
            );
        }

        Commands::Open { path } => match navigator.navigate(&path) {
            GuardDecision::Allow => println!("Allowed: {}", path),
            GuardDecision::RedirectTo(redirect) => {
                println!("Redirected to {}", redirect.path());
                return Ok(ExitCode::FAILURE);
            }
        },

        Commands::Upload { file } => {
            if !enter(&navigator, UPLOAD_PATH) {
                return Ok(ExitCode::FAILURE);
            }
            return upload(state, file).await;
        }

        Commands::History => {
            if !enter(&navigator, UPLOAD_LOG_PATH) {
                return Ok(ExitCode::FAILURE);
            }
            let history = UploadHistoryView::new(state).load().await?;
            println!(
                "Uploads for {}: {}",
                history.username.as_deref().unwrap_or("current operator"),
                history.total_uploads
            );
            for log in &history.entries {
                println!(
                    "{:<10} {} {} {:<32} {:<11} processed={} errors={}{}",
                    log.upload_id,
                    log.date,
                    log.time,
                    log.filename,
                    log.status.label(),
                    log.records_processed,
                    log.records_error,
                    log.error_message
                        .as_deref()
                        .map(|m| format!(" ({})", m))
                        .unwrap_or_default(),
                );
            }
        }

        Commands::Download { upload_id, .. } => {
            if !enter(&navigator, UPLOAD_LOG_PATH) {
                return Ok(ExitCode::FAILURE);
            }
            let path = UploadHistoryView::new(state).download(&upload_id).await?;
            print_message(&StatusMessage::success(format!("Saved {}", path.display())));
        }

        Commands::Policies { doc_type, doc_number } => {
            if !enter(&navigator, POLICY_HISTORY_PATH) {
                return Ok(ExitCode::FAILURE);
            }
            let result = PolicyHistoryView::new(state)
                .query(doc_type, &doc_number)
                .await?;
            if let Some(message) = &result.message {
                print_message(message);
            }
            for record in &result.records {
                println!(
                    "{} {} version={} accepted={} ip={} agent={}",
                    record.log_id,
                    record.display_timestamp(),
                    record.policy_version,
                    if record.accepted { "yes" } else { "no" },
                    record.ip_address.as_deref().unwrap_or("-"),
                    record.user_agent.as_deref().unwrap_or("-"),
                );
                for (key, value) in &record.extra {
                    println!("    {}: {}", key, value);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    DocumentType::parse(raw).ok_or_else(|| format!("unknown document type '{}'; use DNI or CE", raw))
}

/// Applies the route guard; prints the redirect when entry is denied.
fn enter(navigator: &Navigator, path: &str) -> bool {
    match navigator.navigate(path) {
        GuardDecision::Allow => true,
        GuardDecision::RedirectTo(redirect) => {
            println!("Redirected to {}", redirect.path());
            false
        }
    }
}

async fn upload(state: &AppState, file: PathBuf) -> Result<ExitCode, AdminError> {
    let mut flow = UploadFlow::new(state);
    if let Err(e) = flow.select_path(&file).await {
        print_message(&StatusMessage::error(e.user_message()));
        return Ok(ExitCode::FAILURE);
    }
    if let Some(selected) = flow.selected() {
        println!("Uploading {} ({})", selected.name, format_bytes(selected.size()));
    }

    let mut progress = flow.subscribe_progress();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let pct = *progress.borrow_and_update();
            eprint!("\r{:>3}%", pct);
        }
    });

    let outcome = flow.upload().await;
    // The flow keeps the channel open until it is dropped, so stop the printer here.
    printer.abort();
    let _ = printer.await;
    eprintln!();

    // Report before settling; a success waits out the clear delay there.
    let code = match &outcome {
        UploadOutcome::Succeeded(message) => {
            print_message(message);
            ExitCode::SUCCESS
        }
        UploadOutcome::Failed(message) => {
            print_message(message);
            ExitCode::FAILURE
        }
        UploadOutcome::Skipped => ExitCode::FAILURE,
    };
    flow.settle().await;
    Ok(code)
}

fn print_message(message: &StatusMessage) {
    match message.kind {
        MessageKind::Error => eprintln!("✗ {}", message),
        MessageKind::Success => println!("✓ {}", message),
        MessageKind::Info => println!("{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policies(doc_type: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from([
            "payjobber-admin",
            "policies",
            "--doc-type",
            doc_type,
            "--doc-number",
            "12345678",
        ])
    }

    #[test]
    fn document_type_is_parsed_case_insensitively() {
        let cli = policies("ce").unwrap();
        assert!(matches!(
            cli.command,
            Commands::Policies { doc_type: DocumentType::Ce, .. }
        ));
    }

    #[test]
    fn unknown_document_type_is_a_usage_error() {
        let err = policies("passport").unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("use DNI or CE"));
    }

    #[test]
    fn document_type_defaults_to_dni() {
        let cli = Cli::try_parse_from(["payjobber-admin", "policies", "--doc-number", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Policies { doc_type: DocumentType::Dni, .. }
        ));
    }
}
