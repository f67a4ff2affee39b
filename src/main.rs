use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashcard_quiz::{config, db, handlers};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flashcard_quiz=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_path = config::load_database_path();
  tracing::info!("Using database at {}", db_path.display());
  let pool = db::init_db(&db_path).expect("Failed to initialize database");

  let app = handlers::router(handlers::AppState::new(pool));

  let bind_addr = config::server_bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", config::server_port());

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
