use std::time::Duration;

use axum::{
    Json, Router, middleware,
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{AccessGate, ORGANIZER, STUDENT, require_access};
use crate::state::AppState;
use crate::{account, answers, auth, events, posts};

async fn ping() -> &'static str {
    "pong"
}

async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Full application: public routes, student routes (level 1) and organizer
/// routes (level 2), each group behind its own access gate. Requests that
/// run past `request_timeout` are answered with 408.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    let students = AccessGate::new(state.tokens.clone(), STUDENT);
    let organizers = AccessGate::new(state.tokens.clone(), ORGANIZER);

    let public_routes = Router::new()
        .route("/ping", get(ping))
        .route("/healthcheck", get(healthcheck))
        .route("/user/signup", post(auth::signup))
        .route("/user/login", post(auth::login))
        .route("/user/logout", post(auth::logout))
        .route("/user/refresh", post(auth::refresh))
        .route("/events", get(events::list_events))
        .route("/searchEvents", get(events::search_events));

    let student_routes = Router::new()
        .route("/user/info", get(account::get_info).patch(account::update_info))
        .route("/user/profile", get(account::get_profile).patch(account::update_profile))
        .route("/event/join", patch(events::join_event))
        .route("/event/leave", patch(events::leave_event))
        .route("/event/{event_id}", get(events::get_event))
        .route("/event/{event_id}/roles", get(events::event_roles))
        .route("/event/{event_id}/members", get(events::event_members))
        .route("/event/{event_id}/posts", get(events::event_posts))
        .route(
            "/posts",
            post(posts::create_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/submit", post(answers::submit_answer))
        .route("/posts/answer/{post_id}", get(answers::user_answer))
        .route("/posts/summary/{post_id}", get(answers::summary))
        .route("/posts/{post_id}", get(posts::get_post))
        .route_layer(middleware::from_fn_with_state(students, require_access));

    let organizer_routes = Router::new()
        .route(
            "/event",
            post(events::create_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/event/staffRole", patch(events::assign_staff_role))
        .route_layer(middleware::from_fn_with_state(organizers, require_access));

    Router::new()
        .merge(public_routes)
        .merge(student_routes)
        .merge(organizer_routes)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
