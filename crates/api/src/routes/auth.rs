//! Account routes: registration, login and the caller's own profile.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::users::ProfileUpdate;
use crate::error::{AppError, Result};
use crate::extract::JsonBody;
use crate::middleware::RequireAuth;
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me).put(update_me))
        .route("/password", put(change_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    #[serde(default, alias = "current_password")]
    pub current_password: String,
    #[serde(default, alias = "new_password")]
    pub new_password: String,
}

#[instrument(skip(state, body), fields(email = %body.email))]
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let (user, token) = AuthService::new(state.pool(), state.signer())
        .register(Registration {
            name: &body.name,
            email: &body.email,
            phone: body.phone.as_deref(),
            password: &body.password,
            role: body.role.as_deref(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "token": token,
            "user": user,
        })),
    ))
}

#[instrument(skip(state, body), fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<Value>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let (user, token) = AuthService::new(state.pool(), state.signer())
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

async fn me(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Value>> {
    let business = AuthService::new(state.pool(), state.signer())
        .profile(&user)
        .await?;
    Ok(Json(json!({ "user": user, "business": business })))
}

async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<ProfileRequest>,
) -> Result<Json<Value>> {
    let update = ProfileUpdate {
        name: body.name,
        phone: body.phone,
        address: body.address,
        city: body.city,
    };
    let user = AuthService::new(state.pool(), state.signer())
        .update_profile(&user, update)
        .await?;
    Ok(Json(json!({ "message": "Profile updated", "user": user })))
}

async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<PasswordRequest>,
) -> Result<Json<Value>> {
    AuthService::new(state.pool(), state.signer())
        .change_password(&user, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Current password is incorrect".to_string())
            }
            other => other.into(),
        })?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
