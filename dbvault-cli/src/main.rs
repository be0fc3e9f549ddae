//! `dbvault` CLI - Command-line interface for the `dbvault` credential store
//!
//! Provides commands for inspecting the secret backend, storing, reading and
//! removing connection credentials, and importing legacy plaintext secrets.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dbvault_core::config::{AppSettings, ConfigManager, SecretBackendType};
use dbvault_core::migration::{migrate_legacy, JsonFileSource};
use dbvault_core::progress::LogProgressReporter;
use dbvault_core::secret::{create_backend, BackendCapability, PlatformInfo};
use dbvault_core::store::CredentialStore;
use dbvault_core::CredentialBundle;
use tracing_subscriber::EnvFilter;

/// `dbvault` command-line interface for managing connection credentials
#[derive(Parser)]
#[command(name = "dbvault")]
#[command(author, version, about = "dbvault credential store command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Secret backend to use instead of the configured one
    /// (`libsecret`, `keyring`, `memory`, `none`)
    #[arg(short, long, global = true)]
    pub backend: Option<SecretBackendType>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the platform and secret backend status
    #[command(about = "Show platform and secret backend status")]
    Status,

    /// Verify the backend with a store/read/delete round trip
    #[command(about = "Run a secret backend health check")]
    Health,

    /// Store credentials for a connection
    #[command(about = "Store credentials for a connection")]
    Set {
        /// Connection identifier
        id: String,

        /// Database password
        #[arg(short, long)]
        password: Option<String>,

        /// SSH tunnel password
        #[arg(long)]
        ssh_password: Option<String>,

        /// File holding the SSH private key
        #[arg(long)]
        ssh_key_file: Option<PathBuf>,
    },

    /// Show stored credentials for a connection
    #[command(about = "Show stored credentials for a connection")]
    Get {
        /// Connection identifier
        id: String,

        /// Print secret values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Remove stored credentials for a connection
    #[command(about = "Remove stored credentials for a connection")]
    Remove {
        /// Connection identifier
        id: String,
    },

    /// Import legacy plaintext credentials from a JSON file
    #[command(about = "Import legacy plaintext credentials")]
    Migrate {
        /// JSON array of legacy credential records
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref(), cli.backend)?;
    init_tracing(&settings);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))?;

    let backend = create_backend(&settings.secrets);
    tracing::debug!(backend = backend.backend_id(), "Secret backend selected");
    let store = CredentialStore::new(backend, &settings.secrets);

    runtime.block_on(async {
        match cli.command {
            Commands::Status => cmd_status(&store, &settings).await,
            Commands::Health => cmd_health(&store).await,
            Commands::Set {
                id,
                password,
                ssh_password,
                ssh_key_file,
            } => cmd_set(&store, &id, password, ssh_password, ssh_key_file.as_deref()).await,
            Commands::Get { id, reveal } => cmd_get(&store, &id, reveal).await,
            Commands::Remove { id } => cmd_remove(&store, &id).await,
            Commands::Migrate { file } => cmd_migrate(&store, &file).await,
        }
    })
}

/// Loads settings and applies command-line overrides
fn load_settings(
    config_dir: Option<&Path>,
    backend: Option<SecretBackendType>,
) -> Result<AppSettings, CliError> {
    let manager = match config_dir {
        Some(dir) => ConfigManager::with_config_dir(dir),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}")))?,
    };

    let mut settings = manager
        .load_settings()
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;

    if let Some(backend) = backend {
        settings.secrets.backend = backend;
    }
    Ok(settings)
}

/// Logs go to stderr; `RUST_LOG` overrides the configured level
fn init_tracing(settings: &AppSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Status command handler
async fn cmd_status(store: &CredentialStore, settings: &AppSettings) -> Result<(), CliError> {
    let info = PlatformInfo::detect(&settings.secrets.service_name);

    println!("Platform:        {}", info.platform);
    println!("Service:         {}", info.service);
    println!("Native store:    {}", info.backend);
    println!("Supported:       {}", if info.supported { "yes" } else { "no" });
    if let Some(path) = &info.secret_tool_path {
        println!("secret-tool:     {}", path.display());
    }
    if let Some(hint) = info.install_hint {
        println!("Install hint:    {hint}");
    }
    println!("Notes:           {}", info.notes);
    println!();
    println!(
        "Backend:         {} ({})",
        store.backend_name(),
        store.backend_id()
    );

    match store.backend_status().await {
        BackendCapability::Available => println!("Status:          available"),
        BackendCapability::Unavailable(reason) => {
            println!("Status:          unavailable ({reason})");
            println!("Credentials will be kept in memory only");
        }
    }
    Ok(())
}

/// Health command handler
async fn cmd_health(store: &CredentialStore) -> Result<(), CliError> {
    store
        .health_check()
        .await
        .map_err(|e| CliError::Backend(e.to_string()))?;
    println!("Secret backend '{}' is healthy", store.backend_id());
    Ok(())
}

/// Set command handler
async fn cmd_set(
    store: &CredentialStore,
    id: &str,
    password: Option<String>,
    ssh_password: Option<String>,
    ssh_key_file: Option<&Path>,
) -> Result<(), CliError> {
    let bundle = build_bundle(password, ssh_password, ssh_key_file)?;
    if bundle.is_empty() {
        return Err(CliError::Usage(
            "nothing to store: pass --password, --ssh-password or --ssh-key-file".to_string(),
        ));
    }

    if let BackendCapability::Unavailable(reason) = store.backend_status().await {
        return Err(CliError::Backend(format!(
            "credentials would not outlive this process: {reason}"
        )));
    }

    store
        .set_credentials(id, bundle)
        .await
        .map_err(|e| CliError::Usage(e.to_string()))?;

    println!("Stored credentials for '{id}'");
    Ok(())
}

fn build_bundle(
    password: Option<String>,
    ssh_password: Option<String>,
    ssh_key_file: Option<&Path>,
) -> Result<CredentialBundle, CliError> {
    let mut bundle = CredentialBundle::empty();
    if let Some(password) = password {
        bundle = bundle.password(password);
    }
    if let Some(password) = ssh_password {
        bundle = bundle.ssh_password(password);
    }
    if let Some(path) = ssh_key_file {
        let key = std::fs::read_to_string(path)?;
        bundle = bundle.ssh_private_key(key);
    }
    Ok(bundle)
}

/// Get command handler
async fn cmd_get(store: &CredentialStore, id: &str, reveal: bool) -> Result<(), CliError> {
    let bundle = store
        .get_credentials(id)
        .await
        .map_err(|e| CliError::Usage(e.to_string()))?
        .ok_or_else(|| CliError::NotFound(id.to_string()))?;

    let show = |value: Option<&str>| match value {
        Some(v) if reveal => v.to_string(),
        Some(_) => "********".to_string(),
        None => "-".to_string(),
    };

    println!("Connection:      {id}");
    println!("Password:        {}", show(bundle.expose_password()));
    println!("SSH password:    {}", show(bundle.expose_ssh_password()));
    println!(
        "SSH private key: {}",
        if reveal {
            show(bundle.expose_ssh_private_key())
        } else {
            mask_key(bundle.expose_ssh_private_key())
        }
    );
    Ok(())
}

fn mask_key(key: Option<&str>) -> String {
    key.map_or_else(
        || "-".to_string(),
        |k| format!("present ({} bytes)", k.len()),
    )
}

/// Remove command handler
async fn cmd_remove(store: &CredentialStore, id: &str) -> Result<(), CliError> {
    store
        .remove_credentials(id)
        .await
        .map_err(|e| CliError::Usage(e.to_string()))?;
    println!("Removed credentials for '{id}'");
    Ok(())
}

/// Migrate command handler
async fn cmd_migrate(store: &CredentialStore, file: &Path) -> Result<(), CliError> {
    if let BackendCapability::Unavailable(reason) = store.backend_status().await {
        return Err(CliError::Backend(format!(
            "refusing to migrate without a secret backend: {reason}"
        )));
    }

    let source = JsonFileSource::new(file);
    let report = migrate_legacy(store, &source, &LogProgressReporter)
        .await
        .map_err(|e| CliError::Migration(e.to_string()))?;

    println!("{}", report.summary());
    for skipped in &report.skipped {
        println!("  skipped '{}': {}", skipped.connection_id, skipped.reason);
    }
    Ok(())
}

/// Exit codes for CLI operations
pub mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - configuration, usage, migration or I/O errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Backend failure - no usable secret backend or no stored credentials
    pub const BACKEND_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    Usage(String),

    /// No credentials stored for the connection
    #[error("No credentials stored for '{0}'")]
    NotFound(String),

    /// Secret backend missing or failing
    #[error("Secret backend error: {0}")]
    Backend(String),

    /// Legacy migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns the exit code for this error type
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Backend(_) | Self::NotFound(_) => exit_codes::BACKEND_FAILURE,
            Self::Config(_) | Self::Usage(_) | Self::Migration(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
