use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::{models::TeamMember, services::IdNamespace};

#[derive(Deserialize)]
pub struct NextIdQuery {
    category: String,
}

#[derive(Serialize)]
pub struct NextIdResponse {
    pub category: String,
    pub id: String,
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
}

impl From<TeamMember> for MemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            id: member.id,
            name: member.name,
        }
    }
}

pub async fn locations(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.service.observed_locations().await?))
}

/// Preview of the id the next create in a category (or the plasmid namespace) would get.
pub async fn next_id(
    State(state): State<AppState>,
    Query(query): Query<NextIdQuery>,
) -> ApiResult<Json<NextIdResponse>> {
    let namespace = query
        .category
        .parse::<IdNamespace>()
        .map_err(ApiError::BadRequest)?;
    let code = state.service.preview_next_id(namespace).await?;
    Ok(Json(NextIdResponse {
        category: query.category,
        id: code.to_string(),
    }))
}

pub async fn members(State(state): State<AppState>) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state
        .service
        .list_members()
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();
    Ok(Json(members))
}
