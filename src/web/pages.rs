//! Server-rendered HTML for the login form and the status panel

use crate::controller::CycleReport;
use crate::engine::{ManualOverride, PowerState, Thresholds};
use crate::price::PriceZone;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

#[derive(Debug, Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub error: Option<&'a str>,
    pub login_enabled: bool,
}

/// Last cycle as shown below the status table
#[derive(Debug)]
pub struct CycleView {
    pub timestamp: String,
    pub summary: String,
    pub errors: Vec<String>,
}

impl From<&CycleReport> for CycleView {
    fn from(report: &CycleReport) -> Self {
        Self {
            timestamp: report.timestamp.to_rfc3339(),
            summary: report.summary(),
            errors: report.errors.iter().map(|e| e.message.clone()).collect(),
        }
    }
}

#[derive(Debug, Template)]
#[template(path = "status.html")]
pub struct StatusTemplate {
    pub zone: String,
    pub start_price: String,
    pub stop_price: String,
    pub default_temp: i32,
    pub min_temp: i32,
    pub manual_override: String,
    pub last_commanded: String,
    pub last_cycle: Option<CycleView>,
}

impl StatusTemplate {
    pub fn new(
        zone: PriceZone,
        thresholds: Thresholds,
        (default_temp, min_temp): (i32, i32),
        manual_override: Option<&ManualOverride>,
        last_commanded: Option<PowerState>,
        last_report: Option<&CycleReport>,
    ) -> Self {
        Self {
            zone: zone.code().to_string(),
            start_price: format!("{:.2}", thresholds.start_price),
            stop_price: format!("{:.2}", thresholds.stop_price),
            default_temp,
            min_temp,
            manual_override: manual_override
                .map(|o| format!("{} since {}", o.state.as_str(), o.set_at.to_rfc3339()))
                .unwrap_or_else(|| "none".to_string()),
            last_commanded: last_commanded
                .map(PowerState::as_str)
                .unwrap_or("unknown")
                .to_string(),
            last_cycle: last_report.map(CycleView::from),
        }
    }
}

/// Renders a page, falling back to a plain 500 page when the template fails
pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            crate::logging::get_logger("web").error(&format!("Template render error: {}", e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<html><body><h1>Error</h1><p>Failed to render page</p></body></html>"),
            )
                .into_response()
        }
    }
}
