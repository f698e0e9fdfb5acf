use std::net::SocketAddr;
use std::sync::Arc;
use strikeforge::persistence::{InMemoryLogSource, InMemoryMatchStore, MatchLogSource, MatchStore};
use strikeforge::pipeline::{Coordinator, CoordinatorConfig};
use strikeforge::player::EloRankFunction;
use strikeforge::server::{build_router, shutdown_signal, AppState};
use strikeforge::session::{
    AllowAllAuthenticator, Authenticator, ConnectionRegistry, JwtAuthenticator, SessionRouter,
};
use strikeforge::store::{InMemoryStore, StateStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            "debug".to_string()
        }
        #[cfg(not(debug_assertions))]
        {
            "info".to_string()
        }
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_level))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting strikeforge coordinator");

    // State store: Redis when compiled with the `redis` feature and
    // REDIS_URL is set, in-memory otherwise.
    let store: Arc<dyn StateStore> = build_state_store().await;

    // Relational store: Postgres when compiled with the `postgres`
    // feature and DATABASE_URL is set, in-memory otherwise.
    let matches: Arc<dyn MatchStore> = build_match_store().await;

    // The external match-log table is a read collaborator; without a
    // configured backend the in-memory source keeps validation alive for
    // local play.
    let logs: Arc<dyn MatchLogSource> = Arc::new(InMemoryLogSource::new());

    let auth: Arc<dyn Authenticator> = match std::env::var("AUTH_SECRET") {
        Ok(secret) if !secret.is_empty() => Arc::new(JwtAuthenticator::new(secret)),
        _ => {
            tracing::warn!("AUTH_SECRET not set; accepting all tokens (development mode)");
            Arc::new(AllowAllAuthenticator)
        }
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let coordinator = Coordinator::new(
        CoordinatorConfig::default(),
        store,
        matches.clone(),
        logs,
        Arc::new(EloRankFunction::default()),
        registry.clone(),
    );
    coordinator.clone().start().await;

    let session_router = Arc::new(SessionRouter::new(
        coordinator.clone(),
        registry,
        matches,
        auth,
    ));

    let cors = match std::env::var("FRONTEND_URL") {
        Ok(frontend) => match frontend.parse() {
            Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)),
            Err(_) => {
                tracing::warn!(frontend, "unparseable FRONTEND_URL; CORS left closed");
                CorsLayer::new()
            }
        },
        Err(_) => CorsLayer::new(),
    };

    let app = build_router(AppState {
        router: session_router,
    })
    .layer(TraceLayer::new_for_http())
    .layer(cors);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Coordinator listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_coordinator = coordinator.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_coordinator.shutdown().await;
        })
        .await?;

    tracing::info!("Coordinator stopped");
    Ok(())
}

async fn build_state_store() -> Arc<dyn StateStore> {
    #[cfg(feature = "redis")]
    if let Ok(url) = std::env::var("REDIS_URL") {
        match strikeforge::store::RedisStore::new(&url).await {
            Ok(store) => {
                tracing::info!("State store: redis");
                return Arc::new(store);
            }
            Err(e) => {
                tracing::error!(error = %e, "redis unavailable, falling back to memory");
            }
        }
    }
    tracing::info!("State store: in-memory");
    Arc::new(InMemoryStore::new())
}

async fn build_match_store() -> Arc<dyn MatchStore> {
    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        match strikeforge::persistence::PostgresStore::new(&url).await {
            Ok(store) => {
                tracing::info!("Relational store: postgres");
                return Arc::new(store);
            }
            Err(e) => {
                tracing::error!(error = %e, "postgres unavailable, falling back to memory");
            }
        }
    }
    tracing::info!("Relational store: in-memory");
    Arc::new(InMemoryMatchStore::new())
}
