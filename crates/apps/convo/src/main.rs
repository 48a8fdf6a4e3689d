//! convo - command line front end for conversation connectors
//!
//! Registers Gmail client secrets, walks an account through OAuth and
//! prints pages of normalized messages as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use connectors::{
    AppConfig, ConnectorId, ConversationConnector, FileStateStore, GmailClientSecrets,
    GmailConnector, GmailConnectorCredential, StateStore,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

mod callback;

#[derive(Parser)]
#[command(name = "convo", version, about = "Load conversations from connected accounts")]
struct Cli {
    /// App the connections belong to
    #[arg(long, default_value = "default", global = true)]
    app_id: String,

    /// State file (defaults to ~/.config/convo/state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register Gmail OAuth client secrets for the app
    ImportCredentials {
        /// Google Cloud Console client secrets JSON
        #[arg(long)]
        file: Option<PathBuf>,
        /// Gmail API developer key (falls back to GMAIL_DEVELOPER_KEY)
        #[arg(long)]
        developer_key: Option<String>,
    },
    /// Authorize a Gmail account
    Authorize {
        #[arg(long)]
        account: String,
        /// Authorization code from the OAuth redirect
        #[arg(long)]
        code: Option<String>,
        /// Print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Print one page of messages as JSON
    Load {
        #[arg(long)]
        account: String,
        /// Only messages after this Unix timestamp (defaults to 24 hours ago)
        #[arg(long)]
        since: Option<String>,
        /// Cursor returned by the previous page
        #[arg(long)]
        cursor: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store: Arc<dyn StateStore> = match cli.state {
        Some(path) => Arc::new(FileStateStore::new(path)),
        None => {
            config::init()?;
            Arc::new(FileStateStore::open_default()?)
        }
    };
    let app = AppConfig::new(cli.app_id);

    match cli.command {
        Command::ImportCredentials {
            file,
            developer_key,
        } => import_credentials(store.as_ref(), &app, file, developer_key),
        Command::Authorize {
            account,
            code,
            no_browser,
        } => authorize(
            &GmailConnector::new(app, store),
            &account,
            code.as_deref(),
            no_browser,
        ),
        Command::Load {
            account,
            since,
            cursor,
        } => {
            let connector = GmailConnector::new(app, store);
            let page = connector.load_messages(&account, since.as_deref(), cursor.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
    }
}

fn import_credentials(
    store: &dyn StateStore,
    app: &AppConfig,
    file: Option<PathBuf>,
    developer_key: Option<String>,
) -> Result<()> {
    let secrets = match &file {
        Some(path) => GmailClientSecrets::from_file(path)?,
        None => GmailClientSecrets::load().with_context(|| {
            let default = GmailClientSecrets::default_credentials_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            format!(
                "No client secrets found; pass --file, place them at {} or set GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                default
            )
        })?,
    };

    if let Err(e) = secrets.redirect_uri() {
        warn!("{}; authorization will fail until one is added", e);
    }

    let developer_key = developer_key
        .or_else(connectors::config::developer_key_from_env)
        .unwrap_or_default();
    let credential = GmailConnectorCredential::new(secrets, developer_key);
    store.set_connector_credential(ConnectorId::Gmail, app, credential.to_value()?)?;

    info!("Stored Gmail client secrets for app {}", app.app_id);
    Ok(())
}

fn authorize(
    connector: &GmailConnector,
    account: &str,
    code: Option<&str>,
    no_browser: bool,
) -> Result<()> {
    let metadata = serde_json::json!({});

    if let Some(code) = code {
        return finish_authorize(connector, account, code, &metadata);
    }

    let redirect_uri = connector.oauth()?.redirect_uri().to_string();
    let listener = if callback::is_local(&redirect_uri) {
        Some(callback::bind(&redirect_uri)?)
    } else {
        None
    };

    let result = connector.authorize(account, None, &metadata)?;
    let auth_url = result
        .auth_url
        .context("Connector returned neither a connection nor a consent URL")?;

    println!("Visit this URL to grant access:\n{}", auth_url);
    if !no_browser && let Err(e) = open::that(&auth_url) {
        warn!("Failed to open browser: {}. Please open the URL manually.", e);
    }

    match listener {
        Some(listener) => {
            info!("Waiting for authorization on {}", redirect_uri);
            let code = callback::wait_for_code(listener)?;
            finish_authorize(connector, account, &code, &metadata)
        }
        None => {
            println!("Then rerun with --code <CODE> from the redirect.");
            Ok(())
        }
    }
}

fn finish_authorize(
    connector: &GmailConnector,
    account: &str,
    code: &str,
    metadata: &serde_json::Value,
) -> Result<()> {
    let result = connector.authorize(account, Some(code), metadata)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
