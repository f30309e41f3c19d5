use crate::error::AppError;
use axum::{
    extract::State,
    http::header,
    response::{
        IntoResponse,
        Response,
    },
    routing::get,
    Router,
};
use tirex_exporter_collector::MetricSet;

#[derive(Clone)]
pub struct AppState {
    pub metrics: MetricSet,
}

pub fn create_router(metrics: MetricSet) -> Router {
    let state = AppState { metrics };

    Router::new()
        .route("/metrics", get(scrape))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn scrape(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, MetricSet::CONTENT_TYPE)], body).into_response())
}

async fn healthz() -> &'static str {
    "ok"
}
