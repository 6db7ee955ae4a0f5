//! HTTP middleware for the Foreman server.
//!
//! Builds the Tower middleware pipeline applied to all HTTP requests.
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::{RequestBodyLimitLayer, ResponseBody as LimitResponseBody};
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::handlers::AppState;
use super::shutdown::HealthState;
use crate::tenancy::error::FailBody;

/// The composed Tower layer type produced by [`build_http_layers`].
///
/// This type alias keeps the function signature readable. Each layer
/// wraps the next in a `Stack`, from outermost (first applied) to
/// innermost (last applied).
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            RequestBodyLimitLayer,
            tower::layer::util::Stack<
                MapResponseBodyLayer<NormalizeBodyFn>,
                tower::layer::util::Stack<
                    CorsLayer,
                    tower::layer::util::Stack<
                        CompressionLayer,
                        tower::layer::util::Stack<
                            TraceLayer<
                                tower_http::classify::SharedClassifier<
                                    tower_http::classify::ServerErrorsAsFailures,
                                >,
                            >,
                            tower::layer::util::Stack<
                                SetRequestIdLayer<MakeRequestUuid>,
                                tower::layer::util::Identity,
                            >,
                        >,
                    >,
                >,
            >,
        >,
    >,
>;

/// Function-pointer type used by the body-normalizing map layer.
///
/// `RequestBodyLimit` yields a `ResponseBody<Body>` that does not implement
/// `Default`, which `CorsLayer` (applied outside it) requires for its rejection
/// response. This maps that body back to `axum::body::Body` without changing
/// any observable behavior.
type NormalizeBodyFn = fn(LimitResponseBody<axum::body::Body>) -> axum::body::Body;

/// Rewraps the request-body-limit response body as a plain `axum::body::Body`.
fn normalize_response_body(body: LimitResponseBody<axum::body::Body>) -> axum::body::Body {
    axum::body::Body::new(body)
}

/// Builds the HTTP-level Tower middleware stack from the network configuration.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every incoming request
/// 2. `Tracing` -- logs request/response with structured trace spans
/// 3. `Compression` -- gzip response compression
/// 4. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 5. `RequestBodyLimit` -- caps accepted body size
/// 6. `Timeout` -- enforces a maximum request processing duration
/// 7. `PropagateRequestId` -- copies `X-Request-Id` from the request to the response
///
/// Tenancy resolution is not part of this stack: it applies per route group
/// (tenant routes vs admin routes), not to the whole server.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    let cors = build_cors_layer(&config.cors_origins);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(MapResponseBodyLayer::new(
            normalize_response_body as NormalizeBodyFn,
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` in the origins list allows any origin. Otherwise,
/// each origin string is parsed and added to an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Admits a request only while the server is not draining, and holds an
/// in-flight guard for its whole lifetime so shutdown can wait for it.
pub async fn track_in_flight(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.shutdown.health_state() {
        HealthState::Draining | HealthState::Stopped => {
            let body = FailBody {
                status_text: "FAIL",
                status_value: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                message: "Server is shutting down".to_string(),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
        HealthState::Starting | HealthState::Ready => {
            let _guard = state.shutdown.in_flight_guard();
            next.run(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn build_http_layers_does_not_panic_with_defaults() {
        let config = NetworkConfig::default();
        let _layers = build_http_layers(&config);
    }

    #[test]
    fn build_cors_layer_wildcard() {
        let origins = vec!["*".to_string()];
        let _cors = build_cors_layer(&origins);
    }

    #[test]
    fn build_cors_layer_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://facilities.example.com".to_string(),
        ];
        let _cors = build_cors_layer(&origins);
    }

    #[test]
    fn build_http_layers_with_custom_timeout() {
        let config = NetworkConfig {
            request_timeout: Duration::from_secs(5),
            ..NetworkConfig::default()
        };
        let _layers = build_http_layers(&config);
    }
}
