use std::sync::Arc;

use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use anyhow::Context;

use exchange_server::auth_token::TokenSigner;
use exchange_server::config::ServerConfig;
use exchange_server::db::{Database, TokenRepository};
use exchange_server::handlers;
use exchange_server::middleware::AccessPolicy;
use exchange_server::session::{ExpirySweeper, TokenService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting exchange server...");

    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "server/config/exchange.toml".to_string());

    let mut config = match ServerConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            log::warn!(
                "Failed to load configuration from '{}': {}. Falling back to defaults.",
                config_path,
                err
            );
            ServerConfig::default()
        }
    };
    config.apply_env_overrides()?;
    config.validate()?;

    let db = Database::connect(&config.storage)
        .await
        .context("Failed to connect to storage")?;
    db.migrate().await.context("Failed to initialize schema")?;

    let signer = TokenSigner::new(
        config.auth.signing_key.clone().into_bytes(),
        config.auth.token_ttl(),
    )?;
    let token_repo: Arc<dyn TokenRepository> = Arc::new(db.tokens());
    let token_service = TokenService::new(signer, token_repo.clone());
    let access_policy = AccessPolicy::new(config.auth.admin_prefixes.clone());

    log::info!(
        "Token validity window set to {} hours",
        config.auth.token_ttl_hours
    );

    let sweeper = ExpirySweeper::new(token_repo, config.auth.sweep_interval()).spawn();

    let bind_addr = (config.listen.host.clone(), config.listen.port);
    log::info!("Starting HTTP server at {}:{}...", bind_addr.0, bind_addr.1);

    let db_data = web::Data::new(db);
    let tokens_data = web::Data::new(token_service);
    let policy_data = web::Data::new(access_policy);

    let http_result = HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(tokens_data.clone())
            .app_data(policy_data.clone())
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await;

    sweeper.abort();
    log::info!("Exchange server stopped");

    http_result.map_err(Into::into)
}
