use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::models::ActivityEvent;

#[derive(Deserialize)]
pub struct ActivityQuery {
    date: Option<String>,
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub date: NaiveDate,
    pub events: Vec<ActivityEvent>,
}

pub async fn activities_list(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<ActivityResponse>> {
    // An empty date means today, same as no date at all.
    let date = match query.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("'{}' is not a YYYY-MM-DD date", raw)))?,
        None => state.service.today(),
    };

    let events = state.service.activity_for(date).await?;
    Ok(Json(ActivityResponse { date, events }))
}
