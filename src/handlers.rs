use crate::content::{self, PHASES};
use crate::errors::AppError;
use crate::models::{
    AnalyticsSummary, CompletionRequest, DayStatusResponse, PhaseProgressEntry, ProgressResponse,
    VisitContext, VisitRequest,
};
use crate::progress::ProgressStore;
use crate::session::ensure_session;
use crate::state::AppState;
use crate::ui::{self, PhaseView};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, Redirect},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub phase: Option<u8>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Html<String>) {
    let jar = record_visit(&state, "/", jar, &headers).await;
    let progress = state.progress.lock().await;
    let phases = phase_views(&progress, query.phase);
    (jar, Html(ui::render_home(&phases)))
}

pub async fn lesson(
    State(state): State<AppState>,
    Path(raw_day): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Html<String>), AppError> {
    let day = parse_day(&raw_day)?;
    let lesson = state
        .content
        .lesson(day)?
        .ok_or_else(|| AppError::not_found(format!("no lesson for day {day}")))?;

    let jar = record_visit(&state, &format!("/course/{day}"), jar, &headers).await;

    let mut progress = state.progress.lock().await;
    progress.set_current_day(day);
    let status = progress.status(day);
    let phases = phase_views(&progress, Some(lesson.phase));
    let html = ui::render_lesson(&lesson, status, content::adjacent_days(day), &phases);
    Ok((jar, Html(html)))
}

pub async fn toggle_lesson(
    State(state): State<AppState>,
    Path(raw_day): Path<String>,
) -> Result<Redirect, AppError> {
    let day = parse_day(&raw_day)?;
    let status = state.progress.lock().await.toggle(day);
    info!(day, status = status.as_str(), "lesson toggled");
    Ok(Redirect::to(&format!("/course/{day}")))
}

pub async fn reset_progress(State(state): State<AppState>) -> Redirect {
    state.progress.lock().await.reset();
    Redirect::to("/")
}

pub async fn analytics_panel(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Html<String>) {
    let jar = record_visit(&state, "/analytics", jar, &headers).await;
    let summary = state.analytics.lock().await.summary();
    (jar, Html(ui::render_analytics(&summary)))
}

pub async fn clear_analytics(State(state): State<AppState>) -> Redirect {
    state.analytics.lock().await.clear();
    Redirect::to("/analytics")
}

pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    let progress = state.progress.lock().await;
    let phases = PHASES
        .iter()
        .map(|phase| PhaseProgressEntry {
            phase: phase.id,
            title: phase.title,
            progress: progress.phase_progress(&phase.day_numbers()),
        })
        .collect();

    Json(ProgressResponse {
        progress: progress.progress().clone(),
        phases,
    })
}

pub async fn get_day_status(
    State(state): State<AppState>,
    Path(raw_day): Path<String>,
) -> Result<Json<DayStatusResponse>, AppError> {
    let day = parse_day(&raw_day)?;
    let status = state.progress.lock().await.status(day);
    Ok(Json(DayStatusResponse { day, status }))
}

pub async fn set_day_completion(
    State(state): State<AppState>,
    Path(raw_day): Path<String>,
    Json(payload): Json<CompletionRequest>,
) -> Result<Json<DayStatusResponse>, AppError> {
    let day = parse_day(&raw_day)?;
    let mut progress = state.progress.lock().await;
    if payload.completed {
        progress.mark_completed(day);
    } else {
        progress.mark_incomplete(day);
    }
    Ok(Json(DayStatusResponse {
        day,
        status: progress.status(day),
    }))
}

pub async fn get_analytics(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(state.analytics.lock().await.summary())
}

pub async fn track_visit(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<VisitRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let path = payload.path.trim();
    if !path.starts_with('/') {
        return Err(AppError::bad_request("path must start with '/'"));
    }
    let jar = record_visit(&state, path, jar, &headers).await;
    Ok((jar, StatusCode::NO_CONTENT))
}

/// Records a visit under the browser's session cookie, minting the cookie on
/// first contact. The returned jar carries it back to the browser.
async fn record_visit(
    state: &AppState,
    path: &str,
    jar: CookieJar,
    headers: &HeaderMap,
) -> CookieJar {
    let (jar, session_id) = ensure_session(jar, Utc::now());
    let context = visit_context(session_id, headers);
    state.analytics.lock().await.track_visit(path, context);
    jar
}

fn visit_context(session_id: String, headers: &HeaderMap) -> VisitContext {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    VisitContext {
        session_id,
        user_agent: header_text(header::USER_AGENT),
        referrer: header_text(header::REFERER),
    }
}

/// Lesson routes only accept days inside the course; anything else is a 404.
fn parse_day(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .ok()
        .filter(|day| content::is_valid_day(*day))
        .ok_or_else(|| AppError::not_found(format!("no lesson for day {raw:?}")))
}

fn phase_views(progress: &ProgressStore, expanded: Option<u8>) -> Vec<PhaseView> {
    PHASES
        .iter()
        .map(|phase| {
            let days = phase.day_numbers();
            PhaseView {
                phase,
                progress: progress.phase_progress(&days),
                days: days.iter().map(|day| (*day, progress.status(*day))).collect(),
                expanded: expanded == Some(phase.id),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_course_range_only() {
        assert_eq!(parse_day("1").unwrap(), 1);
        assert_eq!(parse_day("90").unwrap(), 90);
        assert_eq!(parse_day("0").unwrap_err().status, StatusCode::NOT_FOUND);
        assert_eq!(parse_day("91").unwrap_err().status, StatusCode::NOT_FOUND);
        assert_eq!(parse_day("abc").unwrap_err().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn visit_context_reads_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "curl/8".parse().unwrap());
        headers.insert(header::REFERER, "http://localhost/".parse().unwrap());
        let context = visit_context("abc".to_string(), &headers);
        assert_eq!(context.session_id, "abc");
        assert_eq!(context.user_agent, "curl/8");
        assert_eq!(context.referrer, "http://localhost/");

        let empty = visit_context(String::new(), &HeaderMap::new());
        assert!(empty.user_agent.is_empty());
    }
}
