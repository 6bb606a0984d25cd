// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tenant_identity::{
    api::router,
    clock::SystemClock,
    config::{AppConfig, LogFormat, LOG_FORMAT_ENV},
    models::Tenant,
    state::{AppState, Stores},
    storage::{InMemoryStore, LruCacheStore},
};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    if let Some(domain) = &config.seed_tenant_domain {
        let tenant = store.insert_tenant(Tenant::new(domain.clone(), domain.clone()));
        tracing::info!(tenant_id = %tenant.id, domain = %tenant.domain, "Seeded tenant");
    }
    let stores = Stores {
        tenants: store.clone(),
        users: store.clone(),
        features: store,
        cache: Arc::new(LruCacheStore::new(config.cache_capacity)),
    };

    let addr = config.bind_address();
    let state = match AppState::new(config, stores, Arc::new(SystemClock)) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialise services");
            std::process::exit(1);
        }
    };
    let app = router(state);

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %addr, "Tenant identity service listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
    tracing::info!("Server stopped");
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|value| LogFormat::parse(&value))
        .unwrap_or_default()
        == LogFormat::Json;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
    token.cancel();
}
