use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use cpeevent_types::api::{CreatePostRequest, DeletePostRequest, UpdatePostRequest};
use cpeevent_types::models::PostView;

use crate::aggregator::PostAggregator;
use crate::auth::require_field;
use crate::error::ApiError;
use crate::extract::{ApiJson, ok, ok_with, parse_id};
use crate::middleware::AuthContext;
use crate::state::{AppState, blocking};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("title", &req.post.title)?;

    let post = blocking(&state, move |s| {
        PostAggregator::new(&s.db).create_post(req.event_id, &ctx.student_id, req.post)
    })
    .await?;

    Ok(ok_with(post, "Post created successfully"))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&post_id, "postID")?;
    let post = blocking(&state, move |s| PostAggregator::new(&s.db).post(post_id)).await?;

    Ok(ok(PostView {
        time_up: post.is_time_up(Utc::now()),
        post,
    }))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("title", &req.post.title)?;

    let post = blocking(&state, move |s| {
        PostAggregator::new(&s.db).update_post(req.post_id, &ctx, req.post)
    })
    .await?;

    Ok(ok_with(post, "Post updated successfully"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<DeletePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = req.post_id;
    blocking(&state, move |s| {
        let posts = PostAggregator::new(&s.db);
        posts.editable_post(req.post_id, &ctx)?;
        posts.delete_post(req.event_id, req.post_id)
    })
    .await?;

    Ok(ok_with(post_id, "Post deleted successfully"))
}
