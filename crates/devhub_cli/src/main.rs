use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devhub_core::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod replay;
mod settings;

#[derive(Parser)]
#[command(name = "devhub")]
#[command(about = "DevHub client: session and workspace tooling")]
#[command(version)]
struct Cli {
    /// Override the API base URL from the config file
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Override where the token pair is persisted
    #[arg(long, global = true)]
    token_store: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG still wins)
    #[arg(long, short, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the token pair
    Login {
        username: String,
        /// Read from DEVHUB_PASSWORD, prompted for when absent
        #[arg(long, env = "DEVHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        remember_me: bool,
    },
    /// Create an account (does not sign in)
    Register {
        username: String,
        email: String,
        #[arg(long, env = "DEVHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Defaults to the password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Clear the local session and notify the server
    Logout,
    /// Verify the persisted session and show the signed-in user
    Whoami,
    /// Rotate the token pair
    Refresh,
    /// List the signed-in user's permissions and roles
    Permissions,
    /// Apply a JSON script of workspace commands and print the result
    Replay {
        script: PathBuf,
        /// Print the final workspace state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to ~/.devhub/config.json
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_file(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::new();
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    if let Some(path) = &cli.token_store {
        config.token_store_path = Some(path.clone());
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli);
    tracing::debug!("Using API base URL {}", config.api_base_url());

    match cli.command {
        Commands::Login {
            username,
            password,
            remember_me,
        } => auth::login(&config, &username, password, remember_me).await,
        Commands::Register {
            username,
            email,
            password,
            confirm_password,
        } => auth::register(&config, &username, &email, password, confirm_password).await,
        Commands::Logout => auth::logout(&config).await,
        Commands::Whoami => auth::whoami(&config).await,
        Commands::Refresh => auth::refresh(&config).await,
        Commands::Permissions => auth::permissions(&config).await,
        Commands::Replay { script, json } => replay::run(&config, &script, json),
        Commands::Config { action } => match action {
            ConfigAction::Show => settings::show(&config),
            ConfigAction::Init { force } => settings::init(&config, force),
        },
    }
}
