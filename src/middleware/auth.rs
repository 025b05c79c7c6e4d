use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError, utils::verify_token};

/// Verifies the bearer token and stores the decoded claims as a request
/// extension. Handlers read the caller's identity with `Extension<Claims>`
/// and trust it unconditionally.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer
        .as_ref()
        .and_then(|TypedHeader(Authorization(bearer))| {
            verify_token(bearer.token(), &state.config).ok()
        })
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
