//! Chaos interceptor for any tower-based HTTP pipeline.
//!
//! Wrap a router or service with `ChaosLayer` and every request is run
//! through the decision engine before it reaches the inner service:
//!
//! - `Pass`: forwarded unchanged
//! - delay only: sleep, then forward; response tagged with the delay
//! - error (with or without delay): sleep if needed, then answer with a
//!   synthetic error. The inner service is never called.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, Response},
};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::chaos::{ChaosDecision, ChaosEngine, ChaosPolicy, RequestFacts};
use crate::http::response::{error_response, mark_delayed};

/// Layer that installs the chaos interceptor.
#[derive(Debug, Clone)]
pub struct ChaosLayer {
    engine: Arc<ChaosEngine>,
}

impl ChaosLayer {
    /// Create a layer with its own engine.
    pub fn new(policy: ChaosPolicy) -> Self {
        Self {
            engine: Arc::new(ChaosEngine::new(policy)),
        }
    }

    /// Create a layer sharing an existing engine (e.g. one that is hot reloaded).
    pub fn from_engine(engine: Arc<ChaosEngine>) -> Self {
        Self { engine }
    }

    /// Handle for swapping the policy at runtime.
    pub fn engine(&self) -> Arc<ChaosEngine> {
        self.engine.clone()
    }
}

impl<S> Layer<S> for ChaosLayer {
    type Service = ChaosService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ChaosService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

/// Service that applies chaos decisions to each request.
#[derive(Debug, Clone)]
pub struct ChaosService<S> {
    inner: S,
    engine: Arc<ChaosEngine>,
}

impl<S, B> Service<Request<B>> for ChaosService<S>
where
    S: Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let policy = self.engine.policy();
        let facts = RequestFacts::from_request(&request, &policy);
        let decision = crate::chaos::decide(&policy, &facts, &mut rand::thread_rng());

        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let injection = match decision {
                ChaosDecision::Pass(reason) => {
                    tracing::debug!(
                        method = %facts.method,
                        path = %facts.path,
                        reason = %reason,
                        "Chaos skipped"
                    );
                    return inner.call(request).await;
                }
                ChaosDecision::Inject(injection) => injection,
            };

            tracing::info!(
                method = %facts.method,
                path = %facts.path,
                delay_ms = injection.delay.map(|d| d.as_millis() as u64),
                status = injection.error.as_ref().map(|e| e.status.as_u16()),
                "Chaos injected"
            );

            if let Some(delay) = injection.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(error) = &injection.error {
                return Ok(error_response(error, injection.delay));
            }

            let mut response = inner.call(request).await?;
            if let Some(delay) = injection.delay {
                mark_delayed(&mut response, delay);
            }
            Ok(response)
        })
    }
}
