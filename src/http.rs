use std::{net::SocketAddr, time::Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    addon::{self, CatalogResponse, MetaPreview, MetaResponse, StreamResponse},
    app_state::AppState,
    logging::logger,
};

const LANDING_PAGE: &str = include_str!("landing.html");

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn extract_client_ip(headers: &HeaderMap, remote: Option<&SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = extract_request_id(request.headers());
    let method = request.method().clone();
    let raw_url = request.uri().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| &info.0);
    let client_ip = extract_client_ip(request.headers(), remote);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let started_at = Instant::now();

    logger().debug(
        "request.received",
        json!({
            "requestId": request_id,
            "method": method.as_str(),
            "rawUrl": raw_url,
            "clientIp": client_ip,
            "userAgent": user_agent,
        }),
    );

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = started_at.elapsed().as_secs_f64() * 1000.0;

    logger().info(
        "request.completed",
        json!({
            "requestId": request_id,
            "method": method.as_str(),
            "rawUrl": raw_url,
            "statusCode": status,
            "durationMs": duration_ms,
            "clientIp": client_ip,
            "userAgent": user_agent,
        }),
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static("x-request-id"), value);
    }

    response
}

/// Stremio clients fetch add-on resources cross-origin from anywhere.
fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

fn json_response<T>(status: StatusCode, payload: T) -> Response
where
    T: Serialize,
{
    (status, Json(payload)).into_response()
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogQuery {
    search: Option<String>,
}

impl CatalogQuery {
    fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/healthz", get(healthz))
        .route("/manifest.json", get(manifest))
        .route("/catalog/{kind}/{catalog}", get(catalog))
        .route("/catalog/{kind}/{catalog}/{extra}", get(catalog_with_extra))
        .route("/meta/{kind}/{id}", get(meta))
        .route("/stream/{kind}/{id}", get(stream))
        .fallback(not_found)
        .with_state(state)
        .layer(build_cors())
        .layer(middleware::from_fn(log_requests))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    logger().info(
        "server.listening",
        json!({
            "address": addr.to_string()
        }),
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn healthz() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn manifest() -> Response {
    json_response(StatusCode::OK, addon::manifest())
}

async fn catalog(
    State(state): State<AppState>,
    Path((_kind, _catalog)): Path<(String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Response {
    catalog_response(&state, query.search()).await
}

async fn catalog_with_extra(
    State(state): State<AppState>,
    Path((_kind, _catalog, extra)): Path<(String, String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Response {
    let search = query
        .search()
        .or_else(|| addon::search_from_extra(strip_json(&extra)));
    catalog_response(&state, search).await
}

async fn catalog_response(state: &AppState, search: Option<String>) -> Response {
    let limit = state.catalog_limit();
    let stations = match search {
        Some(query) => state.aggregator.search(&query, limit).await,
        None => state.aggregator.get_top(limit).await,
    };
    json_response(StatusCode::OK, CatalogResponse::from_stations(&stations))
}

async fn meta(
    State(state): State<AppState>,
    Path((_kind, id)): Path<(String, String)>,
) -> Response {
    let station_id = addon::station_id(strip_json(&id));
    let station = state.aggregator.get_by_id(station_id).await;
    json_response(
        StatusCode::OK,
        MetaResponse {
            meta: MetaPreview::from_station(&station),
        },
    )
}

async fn stream(
    State(state): State<AppState>,
    Path((_kind, id)): Path<(String, String)>,
) -> Response {
    let station_id = addon::station_id(strip_json(&id));
    let station = state.aggregator.get_by_id(station_id).await;
    json_response(StatusCode::OK, StreamResponse::from_station(&station))
}

async fn landing_page(headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .filter(|value| *value == "https" || *value == "http")
        .unwrap_or("http");

    let page = LANDING_PAGE
        .replace("{{BASE_URL}}", &escape_html(&format!("{scheme}://{host}")))
        .replace("{{HOST}}", &escape_html(host));
    let mut response = Html(page).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not Found" }))
}

fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                logger().warn(
                    "shutdown.sigterm_unavailable",
                    json!({ "error": error.to_string() }),
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            logger().info("shutdown.ctrl_c", json!({ "message": "Received Ctrl+C" }));
        }
        _ = terminate => {
            logger().info("shutdown.terminate", json!({ "message": "Received SIGTERM" }));
        }
    }
}
