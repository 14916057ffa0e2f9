// relay-server/src/main.rs
use actix::Actor;
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use std::sync::Arc;

use relay_server::actors::sweeper_actor::SweeperActor;
use relay_server::rate_limiter::RateLimiter;
use relay_server::session_registry::SessionRegistry;
use relay_server::{api, routing};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    // Shared state: the session store and the session-create limiter
    let registry = Arc::new(SessionRegistry::new(config.max_sessions));
    let limiter = Arc::new(RateLimiter::session_create());

    // Start the expiration sweeper
    SweeperActor::new(registry.clone(), limiter.clone()).start();

    tracing::info!(
        "Starting relay server on {} (max {} sessions)",
        bind_addr,
        config.max_sessions
    );

    // Create data references
    let registry_data = web::Data::from(registry.clone());
    let limiter_data = web::Data::from(limiter.clone());
    let config_data = web::Data::new(config);

    // Start HTTP server; the same listener carries REST and the WS upgrade
    HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(limiter_data.clone())
            .app_data(config_data.clone())
            .configure(api::configure)
            .configure(routing::routes)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    // Listener is down; tell surviving connections the relay is going away
    registry.close_all();
    tracing::info!("Relay server stopped");

    Ok(())
}
