use crate::config::{RecordConfig, StoreBackend};
use crate::handlers;
use crate::services::{InMemoryRecordGateway, MongoRecordGateway, RecordGateway};
use axum::{
    error_handling::HandleErrorLayer,
    middleware::from_fn,
    routing::{get, post},
    BoxError, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    make_request_span, metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Per-request context. The gateway is the only handle on the store.
#[derive(Clone)]
pub struct AppState {
    pub config: RecordConfig,
    pub gateway: Arc<dyn RecordGateway>,
}

pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.common.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/records",
            post(handlers::create_record).get(handlers::list_records),
        )
        .route(
            "/records/:id",
            get(handlers::get_record)
                .put(handlers::replace_record)
                .patch(handlers::patch_record)
                .delete(handlers::delete_record),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Render timeouts (and any other layer failure) with the JSON error body.
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded the configured timeout");
        AppError::Timeout(anyhow::anyhow!("no response within the request timeout"))
    } else {
        AppError::InternalError(anyhow::anyhow!("Unhandled middleware error: {}", err))
    }
}

/// Connect the gateway selected by configuration.
pub async fn connect_gateway(config: &RecordConfig) -> Result<Arc<dyn RecordGateway>, AppError> {
    match config.store.backend {
        StoreBackend::Mongodb => {
            let mongo_config = config.store.mongodb.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "MongoDB settings are required for the mongodb backend"
                ))
            })?;

            let gateway = MongoRecordGateway::connect(mongo_config).await?;
            gateway.health_check().await.map_err(|e| {
                tracing::error!("MongoDB is not reachable: {}", e);
                e
            })?;
            tracing::info!("Connected to MongoDB");

            Ok(Arc::new(gateway))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on restart");
            Ok(Arc::new(InMemoryRecordGateway::new()))
        }
    }
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: RecordConfig) -> Result<Self, AppError> {
        let gateway = connect_gateway(&config).await?;
        Self::build_with_gateway(config, gateway).await
    }

    pub async fn build_with_gateway(
        config: RecordConfig,
        gateway: Arc<dyn RecordGateway>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            state: AppState { config, gateway },
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn gateway(&self) -> Arc<dyn RecordGateway> {
        self.state.gateway.clone()
    }

    /// Serve until Ctrl+C / SIGTERM, then release the store.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let gateway = self.state.gateway.clone();
        let router = build_router(self.state);

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        gateway.shutdown().await;
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
