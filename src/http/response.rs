//! Synthetic chaos responses.
//!
//! # Responsibilities
//! - Build the error response returned in place of the real handler
//! - Tag every response chaos touched with `x-chaos-*` headers
//!
//! # Design Decisions
//! - Body is JSON and carries `"chaos": true` so clients can tell it apart
//! - Each injected error gets a fresh incident ID for log correlation

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Response},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::chaos::InjectedError;

/// Set on every response chaos altered: `error` or `latency`.
pub const X_CHAOS_INJECTED: HeaderName = HeaderName::from_static("x-chaos-injected");

/// Injected delay in milliseconds, when one was applied.
pub const X_CHAOS_DELAY_MS: HeaderName = HeaderName::from_static("x-chaos-delay-ms");

/// JSON body of a synthetic error.
#[derive(Debug, Serialize)]
pub struct ChaosErrorBody {
    pub error: String,
    pub status: u16,
    pub chaos: bool,
    pub incident_id: Uuid,
}

/// Build the response returned for an injected error.
pub fn error_response(error: &InjectedError, delay: Option<Duration>) -> Response<Body> {
    let body = ChaosErrorBody {
        error: error.message.clone(),
        status: error.status.as_u16(),
        chaos: true,
        incident_id: Uuid::new_v4(),
    };

    let mut response = (error.status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(X_CHAOS_INJECTED, HeaderValue::from_static("error"));
    if let Some(delay) = delay {
        response
            .headers_mut()
            .insert(X_CHAOS_DELAY_MS, delay_header(delay));
    }
    response
}

/// Mark a real response that was delayed before reaching the handler.
pub fn mark_delayed<B>(response: &mut Response<B>, delay: Duration) {
    let headers = response.headers_mut();
    headers.insert(X_CHAOS_INJECTED, HeaderValue::from_static("latency"));
    headers.insert(X_CHAOS_DELAY_MS, delay_header(delay));
}

fn delay_header(delay: Duration) -> HeaderValue {
    HeaderValue::from(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    fn injected(status: StatusCode) -> InjectedError {
        InjectedError {
            status,
            message: "Chaos injected failure".into(),
        }
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = error_response(&injected(StatusCode::SERVICE_UNAVAILABLE), None);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[&X_CHAOS_INJECTED], "error");
        assert!(response.headers().get(&X_CHAOS_DELAY_MS).is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], 503);
        assert_eq!(json["chaos"], true);
        assert_eq!(json["error"], "Chaos injected failure");
        assert!(Uuid::parse_str(json["incident_id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_error_response_reports_delay() {
        let response = error_response(
            &injected(StatusCode::INTERNAL_SERVER_ERROR),
            Some(Duration::from_millis(125)),
        );
        assert_eq!(response.headers()[&X_CHAOS_DELAY_MS], "125");
    }

    #[test]
    fn test_mark_delayed() {
        let mut response = Response::new(());
        mark_delayed(&mut response, Duration::from_millis(80));
        assert_eq!(response.headers()[&X_CHAOS_INJECTED], "latency");
        assert_eq!(response.headers()[&X_CHAOS_DELAY_MS], "80");
    }
}
