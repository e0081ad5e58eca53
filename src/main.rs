use clap::{Parser, Subcommand};
use std::future::pending;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use postdesk::{
    AppState, Config,
    auth::{UserDatabase, issue_token},
    create_router, startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Overrides `app.log_level` from the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the API server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage API users
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// List all users
    List,
    /// Add a new user
    Add {
        /// Username (will be converted to lowercase)
        username: String,
        /// Email address
        email: String,
    },
    /// Remove a user
    Remove {
        /// Username to remove
        username: String,
    },
    /// Print an API token for a user
    Token {
        /// Username or email address
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Parsed before logging is up so the config can pick the level
    let (config, config_found) = load_config(&cli.config)?;
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.app.log_level.clone());

    // RUST_LOG wins over both the flag and the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_lowercase()));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if config_found {
        info!("Configuration loaded from: {:?}", cli.config);
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    match cli.command {
        Some(Commands::User(user_cmd)) => handle_user_command(&config, user_cmd).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => run_server(config, None, None, None).await,
    }
}

fn load_config(config_path: &Path) -> Result<(Config, bool), Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok((toml_edit::de::from_str::<Config>(&config_content)?, true))
    } else {
        Ok((Config::default(), false))
    }
}

async fn handle_user_command(
    config: &Config,
    cmd: UserCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.users.database.as_path();
    let mut db = if db_path.exists() {
        UserDatabase::read(db_path).await?
    } else {
        UserDatabase::new()
    };

    match cmd {
        UserCommands::List => {
            if db.is_empty() {
                println!("No users in database");
            } else {
                println!("Users in database:");
                for (username, user) in db.iter() {
                    println!("  {} <{}>", username, user.email);
                }
            }
        }
        UserCommands::Add { username, email } => {
            let Some(username) = UserDatabase::normalize_username(&username) else {
                eprintln!("Error: Username must be non-empty and may not contain ':'");
                std::process::exit(1);
            };
            let email = email.trim().to_string();
            if !db.insert(username.clone(), email.clone()) {
                eprintln!("Error: User '{}' already exists", username);
                std::process::exit(1);
            }

            if !db_path.exists() {
                println!("Creating new user database at: {}", db_path.display());
            }
            db.write(db_path).await?;
            println!("Added user '{}' with email '{}'", username, email);
        }
        UserCommands::Remove { username } => {
            let username = username.trim().to_lowercase();
            if db.remove(&username).is_some() {
                db.write(db_path).await?;
                println!("Removed user '{}'", username);
            } else {
                eprintln!("Error: User '{}' not found", username);
                std::process::exit(1);
            }
        }
        UserCommands::Token { user } => {
            let identifier = user.trim().to_lowercase();
            let Some((username, _)) = db.find(&identifier) else {
                eprintln!("Error: User '{}' not found", identifier);
                std::process::exit(1);
            };

            let token = issue_token(&config.app.auth_secret, username)
                .map_err(|e| format!("Failed to sign token: {}", e))?;
            println!("{}", token);
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("User database: {:?}", config.users.database);

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => {}
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app_state = AppState::from_config(config).await?;
    info!("Serving {} posts", app_state.store.count().await);
    let app = create_router(app_state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, SIGTERM, or once the `--quit-after` timer runs out.
async fn shutdown_signal(quit_after: Option<u64>) {
    if let Some(seconds) = quit_after {
        info!("Server will shut down after {} seconds", seconds);
    }

    let reason = tokio::select! {
        _ = interrupt() => "Ctrl+C",
        _ = terminate() => "SIGTERM",
        _ = quit_timer(quit_after) => "quit timer expired",
    };
    info!("Shutting down: {}", reason);
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    pending::<()>().await;
}

async fn quit_timer(quit_after: Option<u64>) {
    match quit_after {
        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
        None => pending::<()>().await,
    }
}
