use axum::{
    extract::{Extension, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppResult,
    utils::{Claims, success_to_api_response},
};

use super::model;

#[axum::debug_handler]
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let feed = model::get_feed_for_user(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(feed))
}
