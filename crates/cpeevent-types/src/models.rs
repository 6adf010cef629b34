use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// -- Users --

/// Account details a user may read and edit about themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(rename = "studentID")]
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub year: i32,
    pub email: String,
    pub phone_number: String,
}

// -- Events --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffMember {
    #[serde(rename = "stdID")]
    pub std_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub event_name: String,
    pub event_description: String,
    pub n_participant: i64,
    pub participants: Vec<String>,
    pub n_staff: i64,
    pub staff: Vec<StaffMember>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub president: String,
    pub kind: String,
    pub role: Vec<String>,
    pub icon: Option<String>,
    pub poster: Option<String>,
    pub post_list: Vec<Uuid>,
}

impl Event {
    pub fn is_participant(&self, student_id: &str) -> bool {
        self.participants.iter().any(|p| p == student_id)
    }

    /// Role label of `student_id` if they are staff of this event.
    pub fn staff_role(&self, student_id: &str) -> Option<&str> {
        self.staff
            .iter()
            .find(|s| s.std_id == student_id)
            .map(|s| s.role.as_str())
    }
}

/// Descriptive event fields, used both to create and to replace an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub event_name: String,
    #[serde(default)]
    pub event_description: String,
    #[serde(default)]
    pub n_participant: i64,
    #[serde(default)]
    pub n_staff: i64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub president: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    #[serde(rename = "stdID")]
    pub std_id: String,
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventMembers {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    pub participants: Vec<MemberInfo>,
    pub staff: Vec<MemberInfo>,
}

/// The two mutually exclusive ways a student can belong to an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Participant,
    Staff,
}

impl FromStr for MemberRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" => Ok(Self::Participant),
            "staff" => Ok(Self::Staff),
            _ => Err(()),
        }
    }
}

// -- Posts --

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Post,
    Vote,
    Form,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Vote => "vote",
            Self::Form => "form",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown post kind: {0}")]
pub struct UnknownPostKind(pub String);

impl FromStr for PostKind {
    type Err = UnknownPostKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "vote" => Ok(Self::Vote),
            "form" => Ok(Self::Form),
            other => Err(UnknownPostKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormQuestion {
    pub question: String,
    pub input_type: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Kind-specific part of a post. The `kind` tag sits next to the common
/// post fields on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PostContent {
    Post {
        #[serde(default)]
        markdown: String,
    },
    Vote {
        #[serde(rename = "voteQuestion")]
        question: VoteQuestion,
    },
    Form {
        #[serde(rename = "formQuestions")]
        questions: Vec<FormQuestion>,
    },
}

impl PostContent {
    pub fn kind(&self) -> PostKind {
        match self {
            Self::Post { .. } => PostKind::Post,
            Self::Vote { .. } => PostKind::Vote,
            Self::Form { .. } => PostKind::Form,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    pub assign_to: Vec<String>,
    pub public: bool,
    pub title: String,
    pub description: String,
    pub post_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub author: String,
    #[serde(flatten)]
    pub content: PostContent,
}

impl Post {
    pub fn kind(&self) -> PostKind {
        self.content.kind()
    }

    /// A post is time-up once its end date has passed.
    pub fn is_time_up(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }
}

/// A post as shown to a reader, with its deadline state resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(rename = "timeUp")]
    pub time_up: bool,
}

// -- Answers --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question_index: usize,
    pub input_type: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnswerPayload {
    Vote {
        answer: String,
    },
    Form {
        #[serde(rename = "answerList")]
        answer_list: Vec<QuestionAnswer>,
    },
}

impl AnswerPayload {
    pub fn kind(&self) -> PostKind {
        match self {
            Self::Vote { .. } => PostKind::Vote,
            Self::Form { .. } => PostKind::Form,
        }
    }
}

/// One student's recorded response to a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "postID")]
    pub post_id: Uuid,
    #[serde(rename = "studentID")]
    pub student_id: String,
    #[serde(flatten)]
    pub payload: AnswerPayload,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_content_is_tagged_by_kind() {
        let content: PostContent = serde_json::from_value(json!({
            "kind": "vote",
            "voteQuestion": { "question": "Lunch?", "options": ["A", "B"] }
        }))
        .unwrap();

        assert_eq!(content.kind(), PostKind::Vote);
        assert!(serde_json::from_value::<PostContent>(json!({ "kind": "raffle" })).is_err());
    }

    #[test]
    fn post_kind_parse_rejects_unknown() {
        assert_eq!("form".parse::<PostKind>().unwrap(), PostKind::Form);
        let err = "raffle".parse::<PostKind>().unwrap_err();
        assert_eq!(err, UnknownPostKind("raffle".into()));
    }

    #[test]
    fn post_view_flattens_kind_payload() {
        let post = Post {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            assign_to: vec!["everyone".into()],
            public: true,
            title: "Welcome".into(),
            description: String::new(),
            post_date: Utc::now(),
            end_date: None,
            author: "001".into(),
            content: PostContent::Post {
                markdown: "# hi".into(),
            },
        };

        let value = serde_json::to_value(PostView {
            post,
            time_up: false,
        })
        .unwrap();

        assert_eq!(value["kind"], "post");
        assert_eq!(value["markdown"], "# hi");
        assert_eq!(value["timeUp"], false);
        assert!(value.get("endDate").is_none());
    }

    #[test]
    fn time_up_only_after_end_date() {
        let now = Utc::now();
        let mut post = Post {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            assign_to: vec![],
            public: false,
            title: String::new(),
            description: String::new(),
            post_date: now,
            end_date: None,
            author: String::new(),
            content: PostContent::Form { questions: vec![] },
        };
        assert!(!post.is_time_up(now));

        post.end_date = Some(now - chrono::Duration::minutes(1));
        assert!(post.is_time_up(now));

        post.end_date = Some(now + chrono::Duration::minutes(1));
        assert!(!post.is_time_up(now));
    }
}
