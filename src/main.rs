use repo_bot::db::{SqlKvStore, init_db};
use repo_bot::error::BotError;
use repo_bot::events::default_registry;
use repo_bot::github::GitHubClient;
use repo_bot::handler::Collaborators;
use repo_bot::logging::setup_logging;
use repo_bot::telegram::TelegramClient;
use repo_bot::{AppState, load_config};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "bot_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BotError> {
    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("BOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)?;
    let _log_guard = setup_logging(config.log_directory.as_deref())?;

    if config.webhook_secret().is_none() {
        warn!("No webhook secret configured; deliveries will not be verified");
    }

    let pool = init_db(&config.database_path).await?;
    let clients = Collaborators {
        github: Arc::new(GitHubClient::new(&config.github)?),
        kv: Arc::new(SqlKvStore::new(pool)),
        messenger: Arc::new(TelegramClient::new(&config.telegram)?),
    };

    let registry = default_registry();
    info!("Registered handlers: {:?}", registry.keys());
    info!("Using config at {:?}", config_path);

    let state = Arc::new(AppState::new(config, registry, clients));
    let app = repo_bot::api::router(state);

    info!("Listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
