use std::sync::Arc;

use squeakbot::api;
use squeakbot::config::Config;
use squeakbot::db::Database;
use squeakbot::engine::game::GameEngine;
use squeakbot::engine::ledger::UserLedger;
use squeakbot::engine::server::SqueakServer;
use squeakbot::metrics;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    let ledger = UserLedger::load(&db)
        .await
        .expect("Failed to load user records");
    let engine = GameEngine::new(config.game.clone(), ledger);
    let server = Arc::new(SqueakServer::new(engine, db, config.persist_timeout));

    let app = api::router(server);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("SqueakBot listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
