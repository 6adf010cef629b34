//! Conversions between storage rows and wire models.
//!
//! Rows keep ids and timestamps as text and kind payloads as JSON; a value
//! that does not parse back is a corrupt row and surfaces as an internal
//! error. The one exception is a post kind tag outside post/vote/form,
//! which is reported as `UnknownKind`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cpeevent_db::models::{AnswerRow, EventFieldsRow, EventRow, MemberRow, PostRow, UserRow};
use cpeevent_types::models::{
    AccountInfo, Answer, AnswerPayload, Event, EventDetails, MemberInfo, Post, PostContent,
    PostKind, StaffMember,
};

use crate::error::ApiError;

fn parse_uuid(raw: &str, what: &str) -> anyhow::Result<Uuid> {
    raw.parse()
        .with_context(|| format!("corrupt {} '{}'", what, raw))
}

fn parse_time(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

fn parse_opt_time(raw: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    raw.map(parse_time).transpose()
}

// -- Users --

pub fn account_info(row: &UserRow) -> AccountInfo {
    AccountInfo {
        student_id: row.student_id.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        year: row.year,
        email: row.email.clone(),
        phone_number: row.phone_number.clone(),
    }
}

pub fn member_info(row: MemberRow) -> MemberInfo {
    MemberInfo {
        std_id: row.student_id,
        name: format!("{} {}", row.first_name, row.last_name),
        phone_number: row.phone_number,
        role: row.role,
    }
}

// -- Events --

pub fn event_fields(details: &EventDetails) -> Result<EventFieldsRow, ApiError> {
    Ok(EventFieldsRow {
        name: details.event_name.clone(),
        description: details.event_description.clone(),
        n_participant: details.n_participant,
        n_staff: details.n_staff,
        start_date: details.start_date.map(|t| t.to_rfc3339()),
        end_date: details.end_date.map(|t| t.to_rfc3339()),
        president: details.president.clone(),
        kind: details.kind.clone(),
        roles: serde_json::to_string(&details.role).context("encode event roles")?,
        icon: details.icon.clone(),
        poster: details.poster.clone(),
    })
}

pub fn event_from_row(row: EventRow) -> Result<Event, ApiError> {
    let fields = row.fields;
    let role: Vec<String> = serde_json::from_str(&fields.roles)
        .with_context(|| format!("corrupt roles on event '{}'", row.id))?;
    let post_list = row
        .post_ids
        .iter()
        .map(|id| parse_uuid(id, "post id"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Event {
        id: parse_uuid(&row.id, "event id")?,
        event_name: fields.name,
        event_description: fields.description,
        n_participant: fields.n_participant,
        participants: row.participants,
        n_staff: fields.n_staff,
        staff: row
            .staff
            .into_iter()
            .map(|s| StaffMember {
                std_id: s.student_id,
                role: s.role,
            })
            .collect(),
        start_date: parse_opt_time(fields.start_date.as_deref())?,
        end_date: parse_opt_time(fields.end_date.as_deref())?,
        president: fields.president,
        kind: fields.kind,
        role,
        icon: fields.icon,
        poster: fields.poster,
        post_list,
    })
}

// -- Posts --

pub fn post_to_row(post: &Post) -> Result<PostRow, ApiError> {
    Ok(PostRow {
        id: post.id.to_string(),
        event_id: post.event_id.to_string(),
        kind: post.kind().to_string(),
        assign_to: serde_json::to_string(&post.assign_to).context("encode assignTo")?,
        public: post.public,
        title: post.title.clone(),
        description: post.description.clone(),
        post_date: post.post_date.to_rfc3339(),
        end_date: post.end_date.map(|t| t.to_rfc3339()),
        author: post.author.clone(),
        payload: serde_json::to_string(&post.content).context("encode post payload")?,
    })
}

pub fn post_from_row(row: PostRow) -> Result<Post, ApiError> {
    let kind: PostKind = row.kind.parse().map_err(|_| ApiError::UnknownKind)?;
    let content: PostContent = serde_json::from_str(&row.payload)
        .with_context(|| format!("corrupt payload on post '{}'", row.id))?;
    if content.kind() != kind {
        return Err(anyhow::anyhow!(
            "post '{}' is tagged {} but carries a {} payload",
            row.id,
            kind,
            content.kind()
        )
        .into());
    }

    Ok(Post {
        id: parse_uuid(&row.id, "post id")?,
        event_id: parse_uuid(&row.event_id, "event id")?,
        assign_to: serde_json::from_str(&row.assign_to)
            .with_context(|| format!("corrupt assignTo on post '{}'", row.id))?,
        public: row.public,
        title: row.title,
        description: row.description,
        post_date: parse_time(&row.post_date)?,
        end_date: parse_opt_time(row.end_date.as_deref())?,
        author: row.author,
        content,
    })
}

// -- Answers --

pub fn answer_to_row(answer: &Answer) -> Result<AnswerRow, ApiError> {
    Ok(AnswerRow {
        id: answer.id.to_string(),
        post_id: answer.post_id.to_string(),
        student_id: answer.student_id.clone(),
        kind: answer.payload.kind().to_string(),
        payload: serde_json::to_string(&answer.payload).context("encode answer payload")?,
        created_at: answer.created_at.to_rfc3339(),
    })
}

pub fn answer_from_row(row: AnswerRow) -> Result<Answer, ApiError> {
    let payload: AnswerPayload = serde_json::from_str(&row.payload)
        .with_context(|| format!("corrupt payload on answer '{}'", row.id))?;

    Ok(Answer {
        id: parse_uuid(&row.id, "answer id")?,
        post_id: parse_uuid(&row.post_id, "post id")?,
        student_id: row.student_id,
        payload,
        created_at: parse_time(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpeevent_types::models::VoteQuestion;

    fn vote_post() -> Post {
        Post {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            assign_to: vec!["runner".into()],
            public: false,
            title: "Shirt colour".into(),
            description: String::new(),
            post_date: Utc::now(),
            end_date: None,
            author: "001".into(),
            content: PostContent::Vote {
                question: VoteQuestion {
                    question: "Which?".into(),
                    options: vec!["A".into(), "B".into()],
                },
            },
        }
    }

    #[test]
    fn unknown_kind_tag_is_not_internal() {
        let mut row = post_to_row(&vote_post()).unwrap();
        row.kind = "raffle".into();

        assert!(matches!(post_from_row(row), Err(ApiError::UnknownKind)));
    }

    #[test]
    fn mismatched_payload_is_corrupt() {
        let mut row = post_to_row(&vote_post()).unwrap();
        row.kind = "form".into();

        assert!(matches!(post_from_row(row), Err(ApiError::Internal)));
    }

    #[test]
    fn post_survives_storage() {
        let post = vote_post();
        let back = post_from_row(post_to_row(&post).unwrap()).unwrap();

        assert_eq!(back.content, post.content);
        assert_eq!(back.assign_to, post.assign_to);
        assert_eq!(back.post_date.timestamp(), post.post_date.timestamp());
    }

    #[test]
    fn member_name_joins_first_and_last() {
        let info = member_info(MemberRow {
            student_id: "001".into(),
            first_name: "Somchai".into(),
            last_name: "Jaidee".into(),
            phone_number: "080".into(),
            role: None,
        });
        assert_eq!(info.name, "Somchai Jaidee");
        assert_eq!(info.std_id, "001");
    }
}
