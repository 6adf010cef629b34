use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use cpeevent_types::api::{SubmitAnswerRequest, UserAnswerQuery};

use crate::aggregator::PostAggregator;
use crate::error::ApiError;
use crate::extract::{ApiJson, ok, ok_with, parse_id};
use crate::middleware::AuthContext;
use crate::state::{AppState, blocking};

pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = blocking(&state, move |s| {
        PostAggregator::new(&s.db).submit_answer(&ctx.student_id, req)
    })
    .await?;

    Ok(ok_with(answer, "answer submitted"))
}

/// The caller's own answer, or any student's for organizers.
pub async fn user_answer(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(post_id): Path<String>,
    Query(query): Query<UserAnswerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&post_id, "postID")?;
    let student_id = query.student_id.unwrap_or_else(|| ctx.student_id.clone());
    if student_id != ctx.student_id && !ctx.is_organizer() {
        return Err(ApiError::Forbidden("Insufficient access level".into()));
    }

    let answer = blocking(&state, move |s| {
        PostAggregator::new(&s.db).user_answer(post_id, &student_id)
    })
    .await?;

    Ok(match answer {
        Some(answer) => ok(Some(answer)),
        None => ok_with(None, "No answer submitted"),
    })
}

pub async fn summary(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&post_id, "postID")?;
    let summary = blocking(&state, move |s| PostAggregator::new(&s.db).summarize(post_id)).await?;
    Ok(ok(summary))
}
