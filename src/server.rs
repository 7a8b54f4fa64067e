//! ==============================================================================
//! server.rs - dashboard web server
//! ==============================================================================
//!
//! routes:
//!     GET /        html dashboard (alert banner + one svg chart per signal)
//!     GET /api     current RenderPayload as json
//!     GET /health  tick counter and last update time
//!
//! the server only ever reads AppState; the poll loop is the single writer.
//!
//! ==============================================================================

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::domain::{AlertSeverity, AppState, RenderPayload, Signal};
use crate::series::PreparedSeries;

#[derive(Clone)]
pub struct ServerState {
    pub app: Arc<RwLock<AppState>>,
    pub title: Arc<str>,
    /// browser reload period, kept in step with the poll interval
    pub refresh_seconds: u64,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api", get(api_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(bind_addr: &str, state: ServerState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("[STARTUP] ✓ Dashboard live at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn dashboard_handler(State(state): State<ServerState>) -> Html<String> {
    let app = state.app.read().await;
    Html(render_dashboard(&state.title, state.refresh_seconds, &app.payload))
}

/// json api endpoint for programmatic access
async fn api_handler(State(state): State<ServerState>) -> Json<RenderPayload> {
    let app = state.app.read().await;
    Json(app.payload.clone())
}

async fn health_handler(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "ticks": app.ticks,
        "last_update": app.last_update,
    }))
}

// ==============================================================================
// html rendering
// ==============================================================================

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 220.0;
const CHART_PAD: f64 = 40.0;

pub fn render_dashboard(title: &str, refresh_seconds: u64, payload: &RenderPayload) -> String {
    let title = html_escape(title);

    let (alert_color, alert_body) = match payload.alert_severity {
        AlertSeverity::Nominal => ("#4CAF50", "Optimal conditions.".to_string()),
        AlertSeverity::Violation => (
            "#F44336",
            payload
                .alert_text
                .iter()
                .map(|m| format!("ALERT: {}", html_escape(m)))
                .collect::<Vec<_>>()
                .join("<br>"),
        ),
    };

    let mut charts = String::new();
    for signal in Signal::PRIORITY {
        charts.push_str(&render_chart(signal, payload.series.get(signal)));
    }

    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh_seconds}">
<title>{title}</title>
</head>
<body style="background-color: #111111; color: #DDDDDD; font-family: sans-serif;">
    <h1 style="text-align: center; padding: 20px;">{title}</h1>
    <div id="alert-message" style="text-align: center; font-size: 20px; font-weight: bold; padding: 10px; color: {alert_color};">{alert_body}</div>
    {charts}
</body>
</html>"#
    )
}

/// one line chart; x is real elapsed time, y spans the observed range
fn render_chart(signal: Signal, series: &PreparedSeries) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<h3 style="text-align: center;">{label}</h3><svg viewBox="0 0 {w} {h}" width="100%" style="background: #222222;">"#,
        label = html_escape(signal.label()),
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
    );

    if series.is_empty() {
        let _ = write!(
            svg,
            r##"<text x="{x}" y="{y}" fill="#888888" text-anchor="middle">no data</text></svg>"##,
            x = CHART_WIDTH / 2.0,
            y = CHART_HEIGHT / 2.0,
        );
        return svg;
    }

    let t0 = series.timestamps[0].timestamp_millis();
    let t1 = series.timestamps[series.len() - 1].timestamp_millis();
    let (mut v0, mut v1) = series
        .values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if v0 == v1 {
        v0 -= 1.0;
        v1 += 1.0;
    }

    let inner_w = CHART_WIDTH - 2.0 * CHART_PAD;
    let inner_h = CHART_HEIGHT - 2.0 * CHART_PAD;

    let points: Vec<String> = series
        .timestamps
        .iter()
        .zip(&series.values)
        .map(|(ts, v)| {
            let x = if t1 > t0 {
                CHART_PAD + (ts.timestamp_millis() - t0) as f64 / (t1 - t0) as f64 * inner_w
            } else {
                CHART_WIDTH / 2.0
            };
            let y = CHART_PAD + (v1 - v) / (v1 - v0) * inner_h;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let _ = write!(
        svg,
        r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{points}"/>"#,
        color = signal.color(),
        points = points.join(" "),
    );

    let first = series.timestamps[0].format("%H:%M:%S");
    let last = series.timestamps[series.len() - 1].format("%H:%M:%S");
    let _ = write!(
        svg,
        r##"<text x="{pad}" y="{bottom}" fill="#DDDDDD" font-size="12">{first}</text><text x="{right}" y="{bottom}" fill="#DDDDDD" font-size="12" text-anchor="end">{last}</text><text x="4" y="{top}" fill="#DDDDDD" font-size="12">{v1}</text><text x="4" y="{low}" fill="#DDDDDD" font-size="12">{v0}</text></svg>"##,
        pad = CHART_PAD,
        right = CHART_WIDTH - CHART_PAD,
        bottom = CHART_HEIGHT - 10.0,
        top = CHART_PAD,
        low = CHART_HEIGHT - CHART_PAD,
    );

    svg
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
