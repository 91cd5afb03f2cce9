/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - register new user
/// - `POST /v1/auth/login` - login and get tokens
/// - `POST /v1/auth/refresh` - refresh access token
///
/// Registration creates only the user account; teams are created
/// explicitly afterwards and auto-enroll their creator as admin.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use tallybook_shared::auth::{jwt, password};
use tallybook_shared::models::user::CreateUser;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated for strength before hashing)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Register / login response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: i64,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn validation_errors(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

fn issue_tokens(state: &AppState, user_id: i64, superadmin: bool) -> ApiResult<(String, String)> {
    let access_claims = jwt::Claims::new(user_id, superadmin, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user_id, superadmin, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;
    Ok((access_token, refresh_token))
}

/// Register a new user
///
/// # Errors
///
/// - `409 Conflict`: email already exists
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate().map_err(validation_errors)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = state
        .store
        .create_user(CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        })
        .await?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.superadmin)?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
    }))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: invalid credentials or inactive account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate().map_err(validation_errors)?;

    let user = state
        .store
        .user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.active {
        return Err(ApiError::Unauthorized("Account is inactive".to_string()));
    }

    state.store.touch_last_login(user.id).await?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.superadmin)?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    // The user must still exist and be active
    let user = state
        .store
        .user_by_id(claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::Unauthorized("Account is no longer active".to_string()))?;

    let access_claims = jwt::Claims::new(user.id, user.superadmin, jwt::TokenType::Access);
    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
