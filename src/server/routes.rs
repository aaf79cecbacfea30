use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ApiError;
use super::state::AppState;
use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpId, RsvpInput};
use crate::services::{FilterCriteria, RsvpError};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub type AppStateRef = State<Arc<AppState>>;

/// First `X-Forwarded-For` hop, else the peer address.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn submit_rsvp_handler(
    State(state): AppStateRef,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let client = client_identifier(&headers, peer.map(|ConnectInfo(addr)| addr));
    state.rate_limiter.check_rate_limit(&client).await?;

    let input: RsvpInput =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;

    let submission = state.submissions.submit(input).await?;
    debug!(client = %client, rsvp_id = submission.record.id, "Submission accepted");

    Ok(Json(json!({
        "success": true,
        "message": "RSVP submitted successfully",
        "data": submission.record,
        "stored_in": submission.stored_in,
    })))
}

pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn summary_handler(State(state): AppStateRef) -> Result<Json<Value>, ApiError> {
    let summary = state.aggregator.current().await?;
    Ok(Json(json!({
        "boy_count": summary.boy_count,
        "girl_count": summary.girl_count,
        "total": summary.total(),
        "boy_percentage": summary.boy_percentage(),
        "updated_at": summary.updated_at,
    })))
}

pub async fn event_handler(State(state): AppStateRef) -> Json<Value> {
    let event = &state.config.event;
    Json(json!({
        "event": event,
        "countdown": event.countdown(Utc::now()),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminFilterParams {
    pub attendance: Option<String>,
    pub gender: Option<String>,
    pub search: Option<String>,
}

impl AdminFilterParams {
    /// Empty values and `all` mean no filter on that column.
    pub fn criteria(&self) -> Result<FilterCriteria, ApiError> {
        fn choice<T: std::str::FromStr>(raw: Option<&str>) -> Result<Option<T>, ApiError>
        where
            T::Err: std::fmt::Display,
        {
            match raw.map(str::trim) {
                None | Some("") | Some("all") => Ok(None),
                Some(value) => value
                    .parse()
                    .map(Some)
                    .map_err(|e: T::Err| ApiError::MalformedPayload(e.to_string())),
            }
        }

        Ok(FilterCriteria {
            attendance: choice::<Attendance>(self.attendance.as_deref())?,
            gender_prediction: choice::<GenderPrediction>(self.gender.as_deref())?,
            search: self.search.clone(),
        })
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let supplied = headers
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());
    if state.admin_authorized(supplied) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

pub async fn admin_list_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Query(params): Query<AdminFilterParams>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let criteria = params.criteria()?;
    let view = state.admin_view.filter(&criteria);
    let loaded_at = state.admin_view.snapshot().loaded_at;

    Ok(Json(json!({
        "records": view.records,
        "stats": view.stats,
        "loaded_at": loaded_at,
    })))
}

pub async fn admin_reload_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let records = state.admin_view.load_all().await?;
    info!(records = records.len(), "Admin view reloaded on request");

    let snapshot = state.admin_view.snapshot();
    Ok(Json(json!({
        "records": snapshot.records,
        "stats": snapshot.stats,
        "loaded_at": snapshot.loaded_at,
    })))
}

pub async fn admin_update_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path(id): Path<RsvpId>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut input: RsvpInput =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
    input.apply_attendance_rules(&state.submissions.validator().rules().attending_only);
    let fields = state
        .submissions
        .validator()
        .normalize(&input)
        .map_err(RsvpError::Validation)?;

    let record = state.editor.update(id, fields).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

pub async fn admin_delete_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path(id): Path<RsvpId>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    state.editor.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn admin_export_csv_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Query(params): Query<AdminFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let csv = state.exports.export_to_csv(&params.criteria()?)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"rsvp_responses.csv\""),
        ],
        csv,
    ))
}

pub async fn admin_export_json_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Query(params): Query<AdminFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let json = state.exports.export_to_json(&params.criteria()?)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"rsvp_responses.json\""),
        ],
        json,
    ))
}
