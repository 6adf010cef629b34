use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use cpeevent_db::models::{CreateUserOutcome, UserRow};
use cpeevent_types::api::{LoginRequest, LoginResponse, RefreshRequest, SignupRequest, TokenPairResponse};

use crate::credentials::{self, TokenError};
use crate::error::ApiError;
use crate::extract::{ApiJson, ok_with};
use crate::middleware::{STUDENT, bearer_token};
use crate::state::{AppState, blocking};

const MIN_PASSWORD_LEN: usize = 6;
const BAD_LOGIN: &str = "Login or Password is incorrect";
const BAD_REFRESH: &str = "Invalid refresh token";

pub(crate) fn require_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", name)));
    }
    Ok(())
}

/// Loose shape check: something@domain.tld
pub(crate) fn require_email(email: &str) -> Result<(), ApiError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.split('.').count() >= 2
            && domain.split('.').all(|part| !part.is_empty())
    });
    if !valid {
        return Err(ApiError::validation("email is not a valid address"));
    }
    Ok(())
}

pub(crate) fn require_year(year: i32) -> Result<(), ApiError> {
    if year <= 0 {
        return Err(ApiError::validation("year must be greater than 0"));
    }
    Ok(())
}

fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    require_field("studentID", &req.student_id)?;
    require_field("firstName", &req.first_name)?;
    require_field("lastName", &req.last_name)?;
    require_field("phoneNumber", &req.phone_number)?;
    require_field("username", &req.username)?;
    require_email(&req.email)?;
    require_year(req.year)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req)?;

    let pair = blocking(&state, move |s| {
        let pair = s.tokens.issue_pair(&req.student_id, STUDENT)?;
        let now = Utc::now().to_rfc3339();
        let user = UserRow {
            student_id: req.student_id,
            first_name: req.first_name,
            last_name: req.last_name,
            year: req.year,
            email: req.email,
            password: credentials::hash_password(&req.password)?,
            phone_number: req.phone_number,
            username: req.username,
            access: STUDENT,
            token: Some(pair.access.clone()),
            refresh_token: Some(pair.refresh.clone()),
            created_at: now.clone(),
            updated_at: now,
        };

        match s.db.create_user(&user)? {
            CreateUserOutcome::Created => {
                info!(student_id = %user.student_id, "User signed up");
                Ok(pair)
            }
            CreateUserOutcome::StudentIdTaken => Err(ApiError::conflict("studentID already existed")),
            CreateUserOutcome::EmailTaken => Err(ApiError::conflict("email already existed")),
        }
    })
    .await?;

    Ok(ok_with(
        TokenPairResponse {
            token: pair.access,
            refresh_token: pair.refresh,
        },
        "user signup success",
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(&state, move |s| {
        let user = s
            .db
            .get_user(&req.student_id)?
            .ok_or_else(|| ApiError::Unauthorized(BAD_LOGIN.into()))?;

        if !credentials::verify_password(&user.password, &req.password) {
            return Err(ApiError::Unauthorized(BAD_LOGIN.into()));
        }

        let pair = s.tokens.issue_pair(&user.student_id, user.access)?;
        credentials::persist_token_pair(&s.db, &user.student_id, &pair)?;

        info!(student_id = %user.student_id, "User logged in");
        Ok(LoginResponse {
            user: user.student_id,
            access: user.access,
            token: pair.access,
            refresh_token: pair.refresh,
        })
    })
    .await?;

    Ok(ok_with(response, "Login successful"))
}

/// Clear the stored pair. The access token itself stays valid until it
/// expires; only refresh is cut off.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.tokens.validate(bearer_token(&headers)?)?;
    let student_id = claims.student_id.ok_or(TokenError::Malformed)?;

    blocking(&state, move |s| {
        if !s.db.update_tokens(&student_id, None, None)? {
            return Err(ApiError::not_found("User not found"));
        }
        info!(%student_id, "User logged out");
        Ok(())
    })
    .await?;

    Ok(ok_with((), "Logged out successfully"))
}

/// Swap a refresh token for a new pair. The refresh token carries no
/// identity, so the caller names the user and the token must match the one
/// stored for them.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = headers
        .get("refresh_token")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("No refresh token provided"))?
        .to_string();

    state.tokens.validate(&presented)?;

    let pair = blocking(&state, move |s| {
        let user = s
            .db
            .get_user(&req.user_id)?
            .ok_or_else(|| ApiError::Unauthorized(BAD_REFRESH.into()))?;

        if user.refresh_token.as_deref() != Some(presented.as_str()) {
            return Err(ApiError::Unauthorized(BAD_REFRESH.into()));
        }

        let pair = s.tokens.issue_pair(&user.student_id, user.access)?;
        credentials::persist_token_pair(&s.db, &user.student_id, &pair)?;
        Ok(pair)
    })
    .await?;

    Ok(ok_with(
        TokenPairResponse {
            token: pair.access,
            refresh_token: pair.refresh,
        },
        "Token refreshed",
    ))
}
