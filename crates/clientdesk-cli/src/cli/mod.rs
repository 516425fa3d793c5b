//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use clientdesk_core::api::ApiClient;
use clientdesk_core::config;
use clientdesk_core::logging;
use clientdesk_core::session::SessionStore;
use clientdesk_types::ClientDraft;

mod commands;

#[derive(Parser)]
#[command(name = "clientdesk")]
#[command(version)]
#[command(about = "Manage your client registry from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the client registry service (overrides config)
    #[arg(long, global = true, env = "CLIENTDESK_API_URL", value_name = "URL")]
    api_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and show your clients
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage client records
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ClientCommands {
    /// Lists registered clients
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Registers a new client
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        company: String,
    },
    /// Changes fields of an existing client
    Edit {
        /// The ID of the client to edit
        #[arg(value_name = "ID")]
        id: String,
        #[command(flatten)]
        changes: commands::clients::FieldChanges,
    },
    /// Removes a client
    Delete {
        /// The ID of the client to delete
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Save the service base URL to the config file
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config)?;

    let Cli { command, api_url } = cli;
    let api = || ApiClient::from_config(&config, api_url.as_deref());
    let session = SessionStore::on_disk();

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(api()?, session, email, password).await
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(api()?, session, name, email, password).await,
        Commands::Logout => commands::auth::logout(&session),
        Commands::Whoami => {
            commands::auth::whoami(&session);
            Ok(())
        }

        Commands::Clients { command } => match command {
            ClientCommands::List { json } => commands::clients::list(api()?, session, json).await,
            ClientCommands::Create {
                name,
                email,
                phone,
                company,
            } => {
                let draft = ClientDraft {
                    name,
                    email,
                    phone,
                    company,
                };
                commands::clients::create(api()?, session, draft).await
            }
            ClientCommands::Edit { id, changes } => {
                commands::clients::edit(api()?, session, &id, changes).await
            }
            ClientCommands::Delete { id } => commands::clients::delete(api()?, session, &id).await,
        },

        Commands::Config { command } => {
            let config_path = config::paths::config_path();
            match command {
                ConfigCommands::Path => {
                    commands::config::path(&config_path);
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(&config_path),
                ConfigCommands::Generate => commands::config::generate(),
                ConfigCommands::SetUrl { url } => {
                    commands::config::set_url(&config_path, &url, api_url.as_deref())
                }
            }
        }
    }
}
