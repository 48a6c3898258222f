//! Axum-based HTTP server: login, status panel and JSON control API

use crate::auth::{SessionStore, session_token};
use crate::controller::{CycleTrigger, SharedController};
use crate::engine::{PowerState, Thresholds};
use crate::error::{HeatgateError, Result};
use axum::extract::{Form, Request, State};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Redirect;
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
#[cfg(feature = "openapi")]
use utoipa::OpenApi;
#[cfg(feature = "openapi")]
use utoipa_swagger_ui::SwaggerUi;

pub mod logs;
pub mod pages;

#[derive(Clone)]
pub struct AppState {
    pub controller: SharedController,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginBody {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ThresholdsBody {
    pub start_price: f64,
    pub stop_price: f64,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OverrideBody {
    pub state: PowerState,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Rejects requests without a live session: 401 JSON for the API,
/// a redirect to the login form for pages
pub async fn require_login(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.sessions.is_authenticated(request.headers()) {
        return next.run(request).await;
    }
    if request.uri().path().starts_with("/api/") {
        json_error(StatusCode::UNAUTHORIZED, "Login required")
    } else {
        Redirect::to("/login").into_response()
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
)))]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.sessions.is_authenticated(&headers) {
        return Redirect::to("/").into_response();
    }
    pages::render(&pages::LoginTemplate {
        error: None,
        login_enabled: state.sessions.login_enabled(),
    })
}

/// Checks the password on the blocking pool since bcrypt is CPU bound
async fn try_login(sessions: Arc<SessionStore>, password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || sessions.login(&password))
        .await
        .map_err(|e| HeatgateError::auth(format!("Login task failed: {}", e)))?
}

pub async fn login_form(State(state): State<AppState>, Form(body): Form<LoginBody>) -> Response {
    match try_login(state.sessions.clone(), body.password).await {
        Ok(token) => (
            [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
            Redirect::to("/"),
        )
            .into_response(),
        Err(_) => {
            let page = pages::render(&pages::LoginTemplate {
                error: Some("Invalid password"),
                login_enabled: state.sessions.login_enabled(),
            });
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/login", request_body = LoginBody, responses(
    (status = 200, description = "Logged in, session cookie set"),
    (status = 401, description = "Invalid password")
)))]
pub async fn login_json(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    match try_login(state.sessions.clone(), body.password).await {
        Ok(token) => (
            [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
            Json(serde_json::json!({ "ok": true })),
        )
            .into_response(),
        Err(_) => json_error(StatusCode::UNAUTHORIZED, "Invalid password"),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(&token);
    }
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

pub async fn index(State(state): State<AppState>) -> Response {
    let page = {
        let ctl = state.controller.lock().await;
        let cfg = ctl.config();
        pages::StatusTemplate::new(
            ctl.zone(),
            ctl.thresholds(),
            (cfg.temperatures.default_temp, cfg.temperatures.min_temp),
            ctl.manual_override(),
            ctl.last_commanded(),
            ctl.last_report(),
        )
    };
    pages::render(&page)
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/status", responses(
    (status = 200, description = "Controller and device status")
)))]
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let ctl = state.controller.lock().await;
    let cfg = ctl.config();
    let device = ctl.device_client();
    let mut root = serde_json::json!({
        "version": env!("APP_VERSION"),
        "zone": ctl.zone().code(),
        "thresholds": ctl.thresholds(),
        "default_temp": cfg.temperatures.default_temp,
        "min_temp": cfg.temperatures.min_temp,
        "automation_enabled": cfg.automation.enabled,
        "poll_interval_seconds": cfg.automation.poll_interval_seconds,
        "manual_override": ctl.manual_override(),
        "last_commanded": ctl.last_commanded(),
        "total_cycles": ctl.total_cycles(),
        "last_report": ctl.last_report(),
    });
    drop(ctl);

    // Sensibo can be slow; cycles and overrides must not wait on this read
    match device.read_state().await {
        Ok(device) => root["device"] = serde_json::json!(device),
        Err(e) => root["device_error"] = serde_json::json!(e.to_string()),
    }

    Json(root)
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/price", responses(
    (status = 200, description = "Current price; a decision cycle was run"),
    (status = 502, description = "Price feed unavailable")
)))]
pub async fn price(State(state): State<AppState>) -> Response {
    let mut ctl = state.controller.lock().await;
    let report = ctl.run_cycle(CycleTrigger::Request).await;
    match &report.price {
        Some(p) => Json(serde_json::json!({
            "price": p.ore_per_kwh,
            "sek_per_kwh": p.sek_per_kwh,
            "valid_from": p.valid_from,
            "valid_until": p.valid_until,
            "zone": ctl.zone().code(),
            "report": report,
        }))
        .into_response(),
        None => json_error(StatusCode::BAD_GATEWAY, "Failed to fetch electricity price"),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/cycle", responses(
    (status = 200, description = "Cycle report")
)))]
pub async fn run_cycle(State(state): State<AppState>) -> impl IntoResponse {
    let mut ctl = state.controller.lock().await;
    Json(ctl.run_cycle(CycleTrigger::Request).await)
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/thresholds", responses((status = 200))))]
pub async fn get_thresholds(State(state): State<AppState>) -> impl IntoResponse {
    let ctl = state.controller.lock().await;
    Json(ctl.thresholds())
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/api/thresholds", request_body = ThresholdsBody, responses(
    (status = 200, description = "Thresholds updated"),
    (status = 400, description = "Invalid thresholds")
)))]
pub async fn put_thresholds(
    State(state): State<AppState>,
    Json(body): Json<ThresholdsBody>,
) -> Response {
    let thresholds = match Thresholds::new(body.start_price, body.stop_price) {
        Ok(t) => t,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let mut ctl = state.controller.lock().await;
    match ctl.set_thresholds(thresholds) {
        Ok(()) => Json(ctl.thresholds()).into_response(),
        Err(e) => json_error(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/override", request_body = OverrideBody, responses(
    (status = 200, description = "Override applied to the device"),
    (status = 502, description = "Override held but the device write failed")
)))]
pub async fn set_override(
    State(state): State<AppState>,
    Json(body): Json<OverrideBody>,
) -> Response {
    let mut ctl = state.controller.lock().await;
    let report = ctl.apply_override(body.state).await;
    if report.command_sent {
        Json(serde_json::json!({
            "ok": true,
            "state": body.state,
            "report": report,
        }))
        .into_response()
    } else {
        let message = format!("Failed to turn {} heat pump", body.state.as_str());
        (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": message,
                "report": report,
            })),
        )
            .into_response()
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/api/override", responses((status = 200))))]
pub async fn clear_override(State(state): State<AppState>) -> impl IntoResponse {
    let mut ctl = state.controller.lock().await;
    let previous = ctl.clear_override();
    Json(serde_json::json!({
        "ok": true,
        "cleared": previous.map(|o| o.state),
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config", responses((status = 200))))]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let ctl = state.controller.lock().await;
    Json(ctl.config().redacted())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config/schema", responses((status = 200))))]
pub async fn get_config_schema() -> impl IntoResponse {
    let schema = schemars::schema_for!(crate::config::Config);
    Json(serde_json::to_value(&schema).unwrap_or(serde_json::json!({"error":"schema"})))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/events", responses((status = 200))))]
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let rx = {
        let ctl = state.controller.lock().await;
        ctl.subscribe_reports()
    };
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok::<Event, std::convert::Infallible>(
            Event::default().event("cycle").data(payload),
        )),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(feature = "openapi")]
#[derive(OpenApi)]
#[openapi(
    paths(
        health, login_json, status, price, run_cycle,
        get_thresholds, put_thresholds, set_override, clear_override,
        get_config, get_config_schema, events, logs::logs_tail,
    ),
    components(schemas(LoginBody, ThresholdsBody, OverrideBody, PowerState)),
    tags((name = "heatgate", description = "Heatgate heat pump control API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/price", get(price))
        .route("/api/cycle", post(run_cycle))
        .route("/api/thresholds", get(get_thresholds).put(put_thresholds))
        .route("/api/override", post(set_override).delete(clear_override))
        .route("/api/config", get(get_config))
        .route("/api/config/schema", get(get_config_schema))
        .route("/api/events", get(events))
        .merge(logs::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let router = Router::new()
        .route("/login", get(login_page).post(login_form))
        .route("/logout", post(logout))
        .route("/api/login", post(login_json))
        .route("/api/health", get(health))
        .merge(protected);

    #[cfg(feature = "openapi")]
    let router = router.merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    #[cfg(feature = "compression")]
    let router = router.layer(tower_http::compression::CompressionLayer::new());

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(
    controller: SharedController,
    sessions: Arc<SessionStore>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let state = AppState {
        controller,
        sessions,
    };
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok): (SocketAddr, bool) = match host.parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    };
    if !parsed_ok {
        logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
