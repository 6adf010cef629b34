use axum::{Extension, extract::State, response::IntoResponse};

use cpeevent_db::models::{AccountRow, UpdateInfoOutcome};
use cpeevent_types::api::{Profile, UpdateInfoRequest};
use cpeevent_types::models::AccountInfo;

use crate::auth::{require_email, require_field, require_year};
use crate::error::ApiError;
use crate::extract::{ApiJson, ok, ok_with};
use crate::middleware::AuthContext;
use crate::rows;
use crate::state::{AppState, blocking};

pub async fn get_info(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let info = blocking(&state, move |s| {
        let user = s
            .db
            .get_user(&ctx.student_id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Ok(rows::account_info(&user))
    })
    .await?;

    Ok(ok(info))
}

pub async fn update_info(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateInfoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("firstName", &req.first_name)?;
    require_field("lastName", &req.last_name)?;
    require_field("phoneNumber", &req.phone_number)?;
    require_email(&req.email)?;
    require_year(req.year)?;

    let info = blocking(&state, move |s| {
        let row = AccountRow {
            first_name: req.first_name,
            last_name: req.last_name,
            year: req.year,
            email: req.email,
            phone_number: req.phone_number,
        };

        match s.db.update_account_info(&ctx.student_id, &row)? {
            UpdateInfoOutcome::Updated => Ok(AccountInfo {
                student_id: ctx.student_id,
                first_name: row.first_name,
                last_name: row.last_name,
                year: row.year,
                email: row.email,
                phone_number: row.phone_number,
            }),
            UpdateInfoOutcome::UserNotFound => Err(ApiError::not_found("User not found")),
            UpdateInfoOutcome::EmailTaken => Err(ApiError::conflict("email already existed")),
        }
    })
    .await?;

    Ok(ok_with(info, "Account info updated successfully"))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = blocking(&state, move |s| {
        let user = s
            .db
            .get_user(&ctx.student_id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Ok(Profile {
            username: user.username,
        })
    })
    .await?;

    Ok(ok(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<Profile>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("username", &req.username)?;

    let profile = blocking(&state, move |s| {
        if !s.db.update_username(&ctx.student_id, &req.username)? {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(req)
    })
    .await?;

    Ok(ok_with(profile, "Profile updated successfully"))
}
