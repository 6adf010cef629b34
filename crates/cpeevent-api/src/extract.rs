use axum::{
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use cpeevent_types::api::ApiResponse;

use crate::error::ApiError;

/// `axum::Json` with rejections turned into [`ApiError`], so a bad body is
/// a 400 carrying the usual error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Wrap `data` in the success envelope.
pub fn ok<T: Serialize>(data: T) -> ApiJson<ApiResponse<T>> {
    ApiJson(ApiResponse::ok(data))
}

pub fn ok_with<T: Serialize>(data: T, message: impl Into<String>) -> ApiJson<ApiResponse<T>> {
    ApiJson(ApiResponse::with_message(data, message))
}

/// Parse a path segment as a uuid, naming the field in the error.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("invalid {field} format")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_ids_name_the_field() {
        let err = parse_id("not-a-uuid", "eventID").unwrap_err();
        assert_eq!(err.to_string(), "invalid eventID format");

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "postID").unwrap(), id);
    }
}
