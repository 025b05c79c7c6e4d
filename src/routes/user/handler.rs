use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{LoginRequest, LoginResponse, RequestCodeRequest, UpdateUserRequest, User};

/// Issues a login code for the address. The code is handed to the delivery
/// layer; here it only reaches the structured log.
#[axum::debug_handler]
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeRequest>,
) -> AppResult<impl IntoResponse> {
    let cleared =
        User::clear_stale_login_codes(&state.pool, state.config.login_code_ttl()).await?;
    if cleared > 0 {
        tracing::debug!("Cleared {} expired login codes", cleared);
    }

    let code = User::create_login_code(&state.pool, &req.email).await?;
    tracing::info!("Login code issued for {}: {}", req.email, code);

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    User::use_login_code(
        &state.pool,
        &req.email,
        &req.code,
        state.config.login_code_ttl(),
    )
    .await?;

    let user = User::login_with_email(&state.pool, &req.email).await?;

    let (token, expires_at) =
        generate_token(&user.id, &state.config).map_err(|_| AppError::Unauthorized)?;

    Ok(success_to_api_response(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let user = User::find_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    Ok(success_to_api_response(user))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    User::update(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}
