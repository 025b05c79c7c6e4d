use axum::{
    Json,
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::AppResult,
    utils::{Claims, success_to_api_response},
};

use super::model::{CreateListRequest, List, UpdateListRequest};

#[derive(Debug, Deserialize)]
pub struct ListIdQuery {
    pub list_id: String,
}

#[axum::debug_handler]
pub async fn get_lists(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let lists = List::for_user(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(lists))
}

#[axum::debug_handler]
pub async fn get_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListIdQuery>,
) -> AppResult<impl IntoResponse> {
    let list = List::get_for_user(&state.pool, &claims.sub, &query.list_id).await?;

    Ok(success_to_api_response(list))
}

#[axum::debug_handler]
pub async fn create_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListRequest>,
) -> AppResult<impl IntoResponse> {
    let id = List::create_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({ "id": id })))
}

#[axum::debug_handler]
pub async fn update_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateListRequest>,
) -> AppResult<impl IntoResponse> {
    List::update_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn delete_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ListIdQuery>,
) -> AppResult<impl IntoResponse> {
    List::delete_for_user(&state.pool, &claims.sub, &req.list_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}
