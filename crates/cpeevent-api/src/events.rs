use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use cpeevent_types::api::{AssignStaffRoleRequest, EventIdRequest, JoinEventRequest, SearchQuery, UpdateEventRequest};
use cpeevent_types::models::{Event, EventDetails};

use crate::aggregator::PostAggregator;
use crate::auth::require_field;
use crate::error::ApiError;
use crate::extract::{ApiJson, ok, ok_with, parse_id};
use crate::membership::{Joined, MembershipManager};
use crate::middleware::AuthContext;
use crate::rows;
use crate::state::{AppState, AppStateInner, blocking};

fn load_event(s: &AppStateInner, event_id: Uuid) -> Result<Event, ApiError> {
    s.db
        .get_event(&event_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Event not found"))
        .and_then(rows::event_from_row)
}

fn validate_details(details: &EventDetails) -> Result<(), ApiError> {
    require_field("eventName", &details.event_name)?;
    if let (Some(start), Some(end)) = (details.start_date, details.end_date) {
        if end < start {
            return Err(ApiError::validation("endDate must not be before startDate"));
        }
    }
    Ok(())
}

// -- Public --

pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let events = blocking(&state, |s| {
        s.db.list_events()?
            .into_iter()
            .map(rows::event_from_row)
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(ok(events))
}

pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let name = query
        .name
        .ok_or_else(|| ApiError::validation("Missing the name parameter"))?;

    let events = blocking(&state, move |s| {
        s.db.search_events(&name)?
            .into_iter()
            .map(rows::event_from_row)
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(ok(events))
}

// -- Members --

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_id(&event_id, "eventID")?;
    let event = blocking(&state, move |s| load_event(s, event_id)).await?;
    Ok(ok(event))
}

pub async fn event_roles(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_id(&event_id, "eventID")?;
    let event = blocking(&state, move |s| load_event(s, event_id)).await?;
    Ok(ok(event.role))
}

pub async fn event_members(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_id(&event_id, "eventID")?;
    let members = blocking(&state, move |s| MembershipManager::new(&s.db).list_members(event_id)).await?;
    Ok(ok(members))
}

pub async fn event_posts(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_id(&event_id, "eventID")?;
    let posts = blocking(&state, move |s| {
        PostAggregator::new(&s.db).visible_posts(event_id, &ctx.student_id)
    })
    .await?;
    Ok(ok(posts))
}

pub async fn join_event(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<JoinEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = req.event_id;
    let joined = blocking(&state, move |s| {
        MembershipManager::new(&s.db).join(&ctx.student_id, event_id, &req.role)
    })
    .await?;

    let message = match joined {
        Joined::New => "Joined event successfully",
        Joined::AlreadyMember => "User already in event",
    };
    Ok(ok_with(event_id, message))
}

pub async fn leave_event(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(req): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = blocking(&state, move |s| {
        MembershipManager::new(&s.db).leave(&ctx.student_id, req.event_id)
    })
    .await?;

    Ok(ok_with(role, "Left event successfully"))
}

// -- Organizers --

pub async fn create_event(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(details): ApiJson<EventDetails>,
) -> Result<impl IntoResponse, ApiError> {
    validate_details(&details)?;

    let event = blocking(&state, move |s| {
        let event_id = Uuid::new_v4();
        s.db.insert_event(&event_id.to_string(), &rows::event_fields(&details)?)?;
        info!(%event_id, created_by = %ctx.student_id, "Event created");
        load_event(s, event_id)
    })
    .await?;

    Ok(ok_with(event, "Event created successfully"))
}

pub async fn update_event(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_details(&req.details)?;

    let event = blocking(&state, move |s| {
        let fields = rows::event_fields(&req.details)?;
        if !s.db.update_event(&req.event_id.to_string(), &fields)? {
            return Err(ApiError::not_found("Event not found"));
        }
        load_event(s, req.event_id)
    })
    .await?;

    Ok(ok_with(event, "Event updated successfully"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = req.event_id;
    blocking(&state, move |s| PostAggregator::new(&s.db).delete_event(event_id)).await?;
    Ok(ok_with(event_id, "Event deleted successfully"))
}

pub async fn assign_staff_role(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AssignStaffRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| {
        MembershipManager::new(&s.db).assign_staff_role(req.event_id, &req.student_id, &req.role)
    })
    .await?;

    Ok(ok_with((), "Staff role updated"))
}
