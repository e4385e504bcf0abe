use crate::errors::{ApiError, ServerResult};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use folio_core::{time::timestamp_to_local_str, AuthClaims, FolioError, TokenService};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AuthState {
    tokens: TokenService,
}

impl AuthState {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

/// Identity attached to a request by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub issued: String,
    pub expires: String,
}

impl From<&AuthClaims> for AuthUser {
    fn from(claims: &AuthClaims) -> Self {
        Self {
            user_id: claims.user_id.clone(),
            issued: timestamp_to_local_str(claims.iat).unwrap_or_default(),
            expires: timestamp_to_local_str(claims.exp).unwrap_or_default(),
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header missing"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid authorization header"))?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(scheme), Some(_)) => Err(ApiError::unauthorized(format!(
            "Unsupported authorization scheme: {}",
            scheme
        ))),
        _ => Err(ApiError::unauthorized("Token missing from authorization header")),
    }
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> ServerResult<Response> {
    let token = bearer_token(req.headers())?;

    let claims = match state.auth.tokens().validate_auth_token(token) {
        Ok(claims) => claims,
        Err(FolioError::TokenExpired) => {
            info!("Token has expired");
            return Err(ApiError::unauthorized("Token expired").into());
        }
        Err(e) => {
            warn!(%e, "Token verification failed");
            return Err(ApiError::unauthorized("Invalid token").into());
        }
    };

    if claims.user_id.is_empty() {
        return Err(ApiError::unauthorized("userId missing").into());
    }

    debug!(user_id = %claims.user_id, "Authenticated request");
    req.extensions_mut().insert(AuthUser::from(&claims));
    Ok(next.run(req).await)
}
