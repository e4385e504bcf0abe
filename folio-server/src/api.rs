use crate::{
    auth::{bearer_token, AuthUser},
    errors::{ApiError, ServerError, ServerResult},
    mail::verification_link,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::Html,
    Extension, Json,
};
use folio_core::{
    is_valid_id,
    password::{hash_password, verify_password},
    time::now_local_str,
    Article, FolioError, TokenService, User, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Deserialize)]
pub struct ArticleRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    password_confirm: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    user_id: String,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    user_id: String,
    auth_token: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    user_id: String,
    email: String,
    auth_token: String,
    /// Milliseconds since the epoch.
    issued: i64,
    expires: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfoResponse {
    auth_token: AuthUser,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Non-blank value, trimmed.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_id(id: &str, message: &str) -> Result<(), ApiError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ApiError::bad_request(message))
    }
}

fn ensure_self(user: &AuthUser, id: &str) -> Result<(), ApiError> {
    if user.user_id == id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Access denied"))
    }
}

fn strip_newlines(title: &str) -> String {
    title.replace("\r\n", "").replace(['\r', '\n'], "")
}

// Articles

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ServerResult<Json<Vec<Article>>> {
    let db = state.store.read().await?;
    Ok(Json(db.articles_for(&user.user_id)))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<Json<Article>> {
    check_id(&id, "Invalid Article Id")?;
    let db = state.store.read().await?;
    let article = db
        .articles
        .into_iter()
        .find(|a| a.id == id && a.is_owned_by(&user.user_id))
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(article))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ArticleRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Article>)> {
    let req = body(payload)?;
    let (Some(title), Some(content)) = (present(req.title), present(req.content)) else {
        return Err(ApiError::bad_request("Invalid article data").into());
    };

    let article = state
        .store
        .update(|db| {
            let now = now_local_str();
            let article = Article {
                id: db.next_article_id(),
                title,
                content,
                created: now.clone(),
                modified: now,
                user_id: user.user_id.clone(),
            };
            db.articles.push(article.clone());
            Ok(article)
        })
        .await?;

    info!(article_id = %article.id, user_id = %user.user_id, "Created article");
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<ArticleRequest>, JsonRejection>,
) -> ServerResult<Json<Article>> {
    check_id(&id, "Invalid Article Id")?;
    let req = body(payload)?;
    let title = present(req.title.as_deref().map(strip_newlines));
    let (Some(title), Some(content)) = (title, present(req.content)) else {
        return Err(ApiError::bad_request("Invalid article data").into());
    };

    let article = state
        .store
        .update(|db| {
            let article = db
                .articles
                .iter_mut()
                .find(|a| a.id == id && a.is_owned_by(&user.user_id))
                .ok_or_else(|| FolioError::ArticleNotFound(id.clone()))?;
            article.title = title;
            article.content = content;
            article.modified = now_local_str();
            Ok(article.clone())
        })
        .await?;

    info!(article_id = %article.id, "Updated article");
    Ok(Json(article))
}

/// Responds with the caller's remaining articles.
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<Article>>> {
    check_id(&id, "Invalid Article Id")?;

    let remaining = state
        .store
        .update(|db| {
            let index = db
                .articles
                .iter()
                .position(|a| a.id == id && a.is_owned_by(&user.user_id))
                .ok_or_else(|| FolioError::ArticleNotFound(id.clone()))?;
            db.articles.remove(index);
            Ok(db.articles_for(&user.user_id))
        })
        .await?;

    info!(article_id = %id, "Deleted article");
    Ok(Json(remaining))
}

// Users

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<Json<UserProfile>> {
    check_id(&id, "Invalid User Id")?;
    ensure_self(&user, &id)?;
    let db = state.store.read().await?;
    let found = db
        .find_user(&id)
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserProfile::from(found)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UserUpdateRequest>, JsonRejection>,
) -> ServerResult<Json<UserProfile>> {
    check_id(&id, "Invalid User Id")?;
    ensure_self(&user, &id)?;
    let req = body(payload)?;
    let (Some(first_name), Some(email)) = (present(req.first_name), present(req.email)) else {
        return Err(ApiError::bad_request("Invalid user data").into());
    };
    let last_name = req.last_name.map(|v| v.trim().to_string());

    let profile = state
        .store
        .update(|db| {
            if db.email_in_use(&email, Some(&id)) {
                return Err(FolioError::EmailTaken(email.clone()));
            }
            let stored = db
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| FolioError::UserNotFound(id.clone()))?;
            stored.first_name = first_name;
            if let Some(last_name) = last_name {
                stored.last_name = last_name;
            }
            stored.email = email;
            stored.modified = now_local_str();
            Ok(UserProfile::from(&*stored))
        })
        .await?;

    info!(user_id = %profile.id, "Updated user");
    Ok(Json(profile))
}

// Account

pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<RegisterResponse>)> {
    let req = body(payload)?;
    let (Some(first_name), Some(last_name), Some(email), Some(password), Some(password_confirm)) = (
        present(req.first_name),
        present(req.last_name),
        present(req.email),
        req.password.filter(|p| !p.is_empty()),
        req.password_confirm.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Invalid user data").into());
    };

    if password != password_confirm {
        return Err(ApiError::bad_request("Passwords not equal").into());
    }

    // Checked again inside the write; this only avoids mailing a duplicate.
    if state.store.read().await?.email_in_use(&email, None) {
        return Err(FolioError::EmailTaken(email).into());
    }

    let digest = hash_password(&password)?;
    let verify_token = state.auth.tokens().generate_verify_token(&email)?;

    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(&state.config.public_url);
    let link = verification_link(origin, &verify_token);

    state
        .mailer
        .send_verification(&email, &link)
        .await
        .map_err(|e| {
            error!(%e, %email, "Failed to send verification email");
            ServerError::from(e)
        })?;

    let user_id = state
        .store
        .update(|db| {
            if db.email_in_use(&email, None) {
                return Err(FolioError::EmailTaken(email.clone()));
            }
            let now = now_local_str();
            let user = User {
                id: db.next_user_id(),
                first_name,
                last_name,
                email: email.clone(),
                email_verified: false,
                password: digest.hash,
                salt: digest.salt,
                created: now.clone(),
                modified: now,
            };
            let id = user.id.clone();
            db.users.push(user);
            Ok(id)
        })
        .await?;

    info!(%user_id, %email, "Registered user");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> ServerResult<Json<VerifyResponse>> {
    let token = present(query.token).ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    let claims = state.auth.tokens().validate_verify_token(&token).map_err(|e| {
        warn!(%e, "Verify token rejected");
        e
    })?;

    let user_id = state
        .store
        .update(|db| {
            let user = db
                .users
                .iter_mut()
                .find(|u| u.email == claims.email)
                .ok_or_else(|| FolioError::UserNotFound(claims.email.clone()))?;
            user.email_verified = true;
            Ok(user.id.clone())
        })
        .await?;

    let issued = state.auth.tokens().generate_auth_token(&user_id)?;
    info!(%user_id, "Email verified");
    Ok(Json(VerifyResponse {
        user_id,
        auth_token: issued.token,
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ServerResult<Json<LoginResponse>> {
    let req = body(payload)?;
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Invalid user data").into());
    };

    let db = state.store.read().await?;
    let user = db
        .find_user_by_email(&email)
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&password, &user.password, &user.salt)? {
        warn!(user_id = %user.id, "Password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials").into());
    }

    let issued = state.auth.tokens().generate_auth_token(&user.id)?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        user_id: user.id.clone(),
        email: user.email.clone(),
        auth_token: issued.token,
        issued: issued.claims.iat * 1000,
        expires: issued.claims.exp * 1000,
    }))
}

/// Shows what the presented token says. Signature and expiry are not checked.
pub async fn token(headers: HeaderMap) -> ServerResult<Json<TokenInfoResponse>> {
    let token = bearer_token(&headers)?;
    let claims = TokenService::read_auth_token(token).map_err(|e| {
        warn!(%e, "Token read failed");
        ApiError::unauthorized("Invalid token")
    })?;
    let auth_token = AuthUser::from(&claims);
    info!(
        user_id = %auth_token.user_id,
        issued = %auth_token.issued,
        expires = %auth_token.expires,
        "Token data"
    );
    Ok(Json(TokenInfoResponse { auth_token }))
}

// Front end

pub async fn index_html(State(state): State<Arc<AppState>>) -> ServerResult<Html<String>> {
    let path = state.config.index_html_path();
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html.replace("{{CSS_PATH}}", &state.config.css_path))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(path = %path.display(), "Couldn't find index.html");
            Err(ApiError::not_found("index.html not found").into())
        }
        Err(e) => {
            error!(%e, path = %path.display(), "Error reading index.html");
            Err(ApiError::internal("Error reading index.html").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_newlines() {
        assert_eq!(strip_newlines("a\r\nb\rc\nd"), "abcd");
        assert_eq!(strip_newlines("plain"), "plain");
    }

    #[test]
    fn test_present() {
        assert_eq!(present(Some("  x ".to_string())).as_deref(), Some("x"));
        assert_eq!(present(Some("   ".to_string())), None);
        assert_eq!(present(None), None);
    }

    #[test]
    fn test_check_id() {
        assert!(check_id("12", "bad").is_ok());
        assert!(matches!(check_id("abc", "bad"), Err(ApiError::BadRequest(m)) if m == "bad"));
    }
}
