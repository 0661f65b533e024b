use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use super::handlers;
use crate::auth::require_innlogget_bruker;
use crate::config::CorsConfig;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1/innsyn";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport limits applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub body_limit: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            // Room for the 10 MB of files plus multipart overhead.
            body_limit: 12 * 1024 * 1024,
        }
    }
}

fn innsyn_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(handlers::session_metadata))
        .route("/sessionMetadata", get(handlers::session_metadata))
        .route("/tilgang", get(handlers::tilgang))
        .route("/saker", get(handlers::alle_saker))
        .route("/saksDetaljer", get(handlers::saks_detaljer))
        .route("/utbetalinger", get(handlers::utbetalinger))
        .route("/utbetalinger/nye", get(handlers::nye_utbetalinger))
        .route("/utbetalinger/tidligere", get(handlers::tidligere_utbetalinger))
        .route("/{id}/soknadsStatus", get(handlers::soknads_status))
        .route("/{id}/saksStatus", get(handlers::saks_status))
        .route("/{id}/forelopigSvar", get(handlers::forelopig_svar))
        .route("/{id}/hendelser", get(handlers::hendelser))
        .route("/{id}/oppgaver", get(handlers::oppgaver))
        .route("/{id}/oppgaver/{oppgave_id}", get(handlers::oppgaver_med_id))
        .route("/{id}/vilkar", get(handlers::vilkar))
        .route("/{id}/dokumentasjonkrav", get(handlers::dokumentasjonkrav))
        .route(
            "/{id}/dokumentasjonkrav/{dokumentasjonkrav_id}",
            get(handlers::dokumentasjonkrav_med_id),
        )
        .route(
            "/{id}/harLeverteDokumentasjonkrav",
            get(handlers::har_levert_dokumentasjonkrav),
        )
        .route("/{id}/vedlegg", get(handlers::hent_vedlegg).post(handlers::send_vedlegg))
        .route("/{id}/kommune", get(handlers::kommune))
        .route("/{id}/utbetalinger", get(handlers::utbetalinger_for_sak))
        .route("/{id}/klage", get(handlers::hent_klager).post(handlers::opprett_klage))
        .route("/{id}/klage/send", post(handlers::send_klage))
        .route(
            "/{id}/klage/{klage_id}",
            get(handlers::hent_klage_utkast).put(handlers::oppdater_klage),
        )
}

fn build_cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("xsrf-token-innsyn-api"),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

/// Builds the full HTTP surface: the authenticated innsyn api plus the
/// unauthenticated liveness probes.
///
/// Layers are registered innermost first; at runtime a request passes
/// `SetRequestId` → `PropagateRequestId` → Trace → Timeout → `BodyLimit` →
/// CORS → Auth → handler.
pub fn router(state: AppState, limits: HttpLimits) -> Router {
    let api = innsyn_routes().layer(middleware::from_fn_with_state(
        state.auth.clone(),
        require_innlogget_bruker,
    ));
    let cors = build_cors_layer(&state.cfg.cors);

    let mut router = Router::new()
        .nest(API_PREFIX, api)
        .route("/internal/isAlive", get(handlers::is_alive))
        .route("/internal/isReady", get(handlers::is_ready))
        .with_state(state);

    router = router.layer(cors);
    router = router.layer(RequestBodyLimitLayer::new(limits.body_limit));
    router = router.layer(DefaultBodyLimit::max(limits.body_limit));
    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        limits.request_timeout,
    ));
    router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<axum::body::Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &http::Response<axum::body::Body>, latency: Duration, span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                },
            ),
    );

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
    router.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}
