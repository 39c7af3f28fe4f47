use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/course/:day", get(handlers::lesson))
        .route("/course/:day/toggle", post(handlers::toggle_lesson))
        .route("/progress/reset", post(handlers::reset_progress))
        .route("/analytics", get(handlers::analytics_panel))
        .route("/analytics/clear", post(handlers::clear_analytics))
        .route("/api/progress", get(handlers::get_progress))
        .route(
            "/api/progress/:day",
            get(handlers::get_day_status).post(handlers::set_day_completion),
        )
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/visits", post(handlers::track_visit))
        .with_state(state)
}
