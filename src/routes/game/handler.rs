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

use super::model::{
    CreateGameRequest, Game, GameInviteRequest, GameStateFilter, JoinGameRequest,
    SetGameListRequest, UpdateGameMemberRequest, UpdateGameRequest,
};

#[derive(Debug, Deserialize)]
pub struct GameIdQuery {
    pub game_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MyGamesQuery {
    pub state: Option<GameStateFilter>,
}

#[axum::debug_handler]
pub async fn create_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGameRequest>,
) -> AppResult<impl IntoResponse> {
    let id = Game::create_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({ "id": id })))
}

#[axum::debug_handler]
pub async fn get_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GameIdQuery>,
) -> AppResult<impl IntoResponse> {
    let game = Game::get_for_user(&state.pool, &claims.sub, &query.game_id).await?;

    Ok(success_to_api_response(game))
}

#[axum::debug_handler]
pub async fn get_my_games(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MyGamesQuery>,
) -> AppResult<impl IntoResponse> {
    let games = Game::user_games(&state.pool, &claims.sub, query.state).await?;

    Ok(success_to_api_response(games))
}

#[axum::debug_handler]
pub async fn update_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGameRequest>,
) -> AppResult<impl IntoResponse> {
    Game::update_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn delete_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameIdQuery>,
) -> AppResult<impl IntoResponse> {
    Game::delete_for_user(&state.pool, &claims.sub, &req.game_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn join_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinGameRequest>,
) -> AppResult<impl IntoResponse> {
    Game::join_by_code_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn leave_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameIdQuery>,
) -> AppResult<impl IntoResponse> {
    Game::leave_for_user(&state.pool, &claims.sub, &req.game_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn set_game_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetGameListRequest>,
) -> AppResult<impl IntoResponse> {
    Game::set_list_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn invite_to_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameInviteRequest>,
) -> AppResult<impl IntoResponse> {
    Game::invite(&state.pool, &claims.sub, &req.game_id, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn cancel_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameInviteRequest>,
) -> AppResult<impl IntoResponse> {
    Game::cancel_invite(&state.pool, &claims.sub, &req.game_id, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameIdQuery>,
) -> AppResult<impl IntoResponse> {
    Game::accept_invite_for_user(&state.pool, &claims.sub, &req.game_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn decline_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GameIdQuery>,
) -> AppResult<impl IntoResponse> {
    Game::decline_invite_for_user(&state.pool, &claims.sub, &req.game_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn get_game_invites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let invites = Game::invites_for_user(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(invites))
}

#[axum::debug_handler]
pub async fn update_game_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGameMemberRequest>,
) -> AppResult<impl IntoResponse> {
    Game::update_member(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}
