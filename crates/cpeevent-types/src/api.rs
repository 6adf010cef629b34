use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EventDetails, PostContent, QuestionAnswer};

// -- JWT Claims --

/// JWT claims for both tokens of a pair. Access tokens carry the student id
/// and access level; refresh tokens carry only `exp` and a random `jti`, so
/// two refresh tokens never coincide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "studentID", default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub exp: i64,
}

// -- Envelope --

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(rename = "studentID")]
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub year: i32,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "studentID")]
    pub student_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: String,
    pub access: i32,
    pub token: String,
    pub refresh_token: String,
}

// -- Account --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfoRequest {
    pub first_name: String,
    pub last_name: String,
    pub year: i32,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
}

// -- Events --

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    #[serde(flatten)]
    pub details: EventDetails,
}

#[derive(Debug, Deserialize)]
pub struct EventIdRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinEventRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignStaffRoleRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    #[serde(rename = "studentID")]
    pub student_id: String,
    pub role: String,
}

// -- Posts --

/// Fields a post author controls; everything else is assigned server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    #[serde(default)]
    pub assign_to: Vec<String>,
    #[serde(default)]
    pub public: bool,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub content: PostContent,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    pub post: PostDraft,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(rename = "postID")]
    pub post_id: Uuid,
    #[serde(flatten)]
    pub post: PostDraft,
}

#[derive(Debug, Deserialize)]
pub struct DeletePostRequest {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    #[serde(rename = "postID")]
    pub post_id: Uuid,
}

// -- Answers --

/// Raw answer submission. Which field is required depends on the kind of
/// the target post, which is only known after it is loaded.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(rename = "postID")]
    pub post_id: Uuid,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(rename = "answerList", default)]
    pub answer_list: Option<Vec<QuestionAnswer>>,
}

#[derive(Debug, Deserialize)]
pub struct UserAnswerQuery {
    #[serde(rename = "studentID")]
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    pub answer: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteSummary {
    #[serde(rename = "totalVotes")]
    pub total_votes: u64,
    pub results: Vec<VoteTally>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentAnswer {
    #[serde(rename = "studentID")]
    pub student_id: String,
    pub answer: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormQuestionSummary {
    #[serde(rename = "questionIndex")]
    pub question_index: usize,
    #[serde(rename = "type")]
    pub input_type: String,
    pub question: Option<String>,
    pub answers: Vec<StudentAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormSummary {
    #[serde(rename = "postID")]
    pub post_id: Uuid,
    pub results: Vec<FormQuestionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PostSummary {
    Vote(VoteSummary),
    Form(FormSummary),
}
