//! HTTP server for the chaos sidecar.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding (or echo) fallback
//! - Wire up middleware (chaos, timeout, tracing)
//! - Expose the active policy at `GET /_chaos/policy`
//! - Apply hot-reloaded policies while serving
//! - Shut down gracefully on signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::chaos::{ChaosEngine, ChaosPolicy, PolicyError};
use crate::config::{ChaosConfig, ServerConfig};
use crate::http::layer::ChaosLayer;

/// Path of the policy introspection endpoint.
pub const POLICY_PATH: &str = "/_chaos/policy";

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid chaos policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid upstream '{0}'")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where forwarded requests go.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Parse an upstream base URL. Only scheme and authority are used.
    pub fn parse(url: &str) -> Result<Self, ServerError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| ServerError::Upstream(url.to_string()))?;
        match (uri.scheme().cloned(), uri.authority().cloned()) {
            (Some(scheme), Some(authority)) => Ok(Self { scheme, authority }),
            _ => Err(ServerError::Upstream(url.to_string())),
        }
    }

    fn rewrite(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChaosEngine>,
    pub upstream: Option<Upstream>,
    pub client: Client<HttpConnector, Body>,
}

/// Chaos sidecar: forwards to an upstream (or echoes) through the chaos layer.
pub struct HttpServer {
    router: Router,
    config: ChaosConfig,
    engine: Arc<ChaosEngine>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ChaosConfig) -> Result<Self, ServerError> {
        let engine = Arc::new(ChaosEngine::new(ChaosPolicy::compile(&config)?));
        let upstream = config
            .server
            .upstream
            .as_deref()
            .map(Upstream::parse)
            .transpose()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            engine: engine.clone(),
            upstream,
            client,
        };

        let router = Self::build_router(&config.server, state);
        Ok(Self {
            router,
            config,
            engine,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(server: &ServerConfig, state: AppState) -> Router {
        let chaotic = Router::new()
            .fallback(handle_request)
            .layer(ChaosLayer::from_engine(state.engine.clone()))
            .with_state(state.clone());

        Router::new()
            .route(POLICY_PATH, get(get_policy))
            .with_state(state)
            .merge(chaotic)
            .layer(TimeoutLayer::new(Duration::from_secs(
                server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs received on `config_updates` replace the chaos policy. The
    /// `server` section is only read at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ChaosConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = ?self.config.server.upstream,
            "Chaos sidecar starting"
        );

        let engine = self.engine.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match ChaosPolicy::compile(&config) {
                    Ok(policy) => engine.update(policy),
                    Err(e) => tracing::error!(error = %e, "Rejected chaos policy update"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Chaos sidecar stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Engine shared with the chaos layer.
    pub fn engine(&self) -> Arc<ChaosEngine> {
        self.engine.clone()
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Active policy as reported by the introspection endpoint.
#[derive(Debug, Serialize)]
pub struct PolicySnapshot {
    pub environment: String,
    pub environment_active: bool,
    pub policy: ChaosConfig,
}

async fn get_policy(State(state): State<AppState>) -> Json<PolicySnapshot> {
    let policy = state.engine.policy();
    Json(PolicySnapshot {
        environment: policy.environment.clone(),
        environment_active: policy.is_active_environment(),
        policy: policy.source().clone(),
    })
}

/// Fallback handler: forward upstream if configured, echo otherwise.
async fn handle_request(State(state): State<AppState>, request: Request<Body>) -> Response {
    match &state.upstream {
        Some(upstream) => forward(&state.client, upstream, request).await,
        None => echo(request),
    }
}

fn echo(request: Request<Body>) -> Response {
    Json(serde_json::json!({
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "query": request.uri().query(),
    }))
    .into_response()
}

async fn forward(
    client: &Client<HttpConnector, Body>,
    upstream: &Upstream,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    parts.uri = match upstream.rewrite(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };
    if let Ok(host) = HeaderValue::from_str(upstream.authority.as_str()) {
        parts.headers.insert(header::HOST, host);
    }

    let method = parts.method.clone();
    let uri = parts.uri.clone();

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            tracing::debug!(method = %method, uri = %uri, status = %response.status(), "Upstream responded");
            response.map(Body::new).into_response()
        }
        Err(e) => {
            tracing::error!(method = %method, uri = %uri, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
