//! crossfed worker entry point.
//!
//! Composition root: wires the protocol registry, entity store, object
//! cache and receive pipeline together, then runs the queue worker
//! that re-dispatches stored activities through the pipeline.

use std::sync::Arc;

use apalis::prelude::*;
use crossfed_common::Config;
use crossfed_core::{ObjectCache, ObjectLoader, ProtocolRegistry, ReceivePipeline, TargetResolver};
use crossfed_db::repositories::{FollowerRepository, ObjectRepository, UserRepository};
use crossfed_db::store::{FollowerStore, ObjectStore, UserStore};
use crossfed_federation::{ActivityPubProtocol, AtprotoProtocol, FederationClient, WebProtocol};
use crossfed_queue::workers::{ReceiveContext, receive_worker};
use crossfed_queue::ReceiveJob;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crossfed=debug".into()),
        )
        .init();

    info!("Starting crossfed worker...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = crossfed_db::init(&config).await?;
    info!("Connected to database");
    crossfed_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis job queue
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let redis_storage = apalis_redis::RedisStorage::<ReceiveJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // Entity store
    let db = Arc::new(db);
    let objects: Arc<dyn ObjectStore> = Arc::new(ObjectRepository::new(Arc::clone(&db)));
    let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(Arc::clone(&db)));
    let followers: Arc<dyn FollowerStore> = Arc::new(FollowerRepository::new(Arc::clone(&db)));

    // Protocol registry
    let user_agent = config
        .federation
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("crossfed/0.1.0 (+https://{})", config.bridge.domain));
    let client = FederationClient::new(user_agent);

    let mut registry = ProtocolRegistry::new(&config.bridge);
    registry.register(Arc::new(ActivityPubProtocol::new(
        client.clone(),
        objects.clone(),
        &config.bridge.domain,
    )))?;
    registry.register(Arc::new(WebProtocol::new(
        client.clone(),
        &config.bridge.domain,
    )))?;
    registry.register(Arc::new(AtprotoProtocol::new(client)))?;
    let registry = Arc::new(registry);
    info!(domain = %config.bridge.domain, "Registered protocols");

    // Relay core
    let loader = ObjectLoader::new(
        registry.clone(),
        objects.clone(),
        users.clone(),
        ObjectCache::new(),
    );
    let resolver = TargetResolver::new(
        registry.clone(),
        loader.clone(),
        objects.clone(),
        users.clone(),
        followers.clone(),
    );
    let pipeline = Arc::new(ReceivePipeline::new(
        loader,
        resolver,
        objects.clone(),
        users,
        followers,
    ));

    if !config.federation.enabled {
        info!("Federation disabled, not starting workers");
        shutdown_signal().await;
        return Ok(());
    }

    // Receive worker
    let receive_ctx = ReceiveContext::new(pipeline, registry, objects);
    let monitor = Monitor::new().register({
        WorkerBuilder::new("receive")
            .data(receive_ctx)
            .backend(redis_storage)
            .build_fn(receive_worker)
    });

    info!("Receive worker started");
    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Receive worker failed");
            }
        }
        () = shutdown_signal() => {}
    }

    info!("Worker shutdown complete");
    Ok(())
}
