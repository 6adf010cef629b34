use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use cpeevent_db::Database;
use cpeevent_db::models::InsertAnswerOutcome;
use cpeevent_types::api::{
    FormQuestionSummary, FormSummary, PostDraft, PostSummary, StudentAnswer, SubmitAnswerRequest,
    VoteSummary, VoteTally,
};
use cpeevent_types::models::{Answer, AnswerPayload, Post, PostContent, PostView};

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::rows;

/// Staff assigned to this label see a post regardless of their own role.
const EVERYONE: &str = "everyone";

/// Posts, the answers students give to them, and the tallies over those
/// answers.
pub struct PostAggregator<'a> {
    db: &'a Database,
}

impl<'a> PostAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn post(&self, post_id: Uuid) -> Result<Post, ApiError> {
        let row = self
            .db
            .get_post(&post_id.to_string())?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        rows::post_from_row(row)
    }

    pub fn create_post(&self, event_id: Uuid, author: &str, draft: PostDraft) -> Result<Post, ApiError> {
        let post = Post {
            id: Uuid::new_v4(),
            event_id,
            assign_to: draft.assign_to,
            public: draft.public,
            title: draft.title,
            description: draft.description,
            post_date: Utc::now(),
            end_date: draft.end_date,
            author: author.to_string(),
            content: draft.content,
        };

        if !self.db.insert_post(&rows::post_to_row(&post)?)? {
            return Err(ApiError::not_found("Event not found"));
        }
        info!(post_id = %post.id, %event_id, kind = %post.kind(), "Post created");
        Ok(post)
    }

    /// Load a post the caller may modify: its author, or an organizer.
    pub fn editable_post(&self, post_id: Uuid, caller: &AuthContext) -> Result<Post, ApiError> {
        let post = self.post(post_id)?;
        if post.author != caller.student_id && !caller.is_organizer() {
            return Err(ApiError::Forbidden("Only the author can modify this post".into()));
        }
        Ok(post)
    }

    /// Replace the author-controlled fields. The kind is fixed at creation.
    pub fn update_post(&self, post_id: Uuid, caller: &AuthContext, draft: PostDraft) -> Result<Post, ApiError> {
        let mut post = self.editable_post(post_id, caller)?;
        if draft.content.kind() != post.kind() {
            return Err(ApiError::validation("Post kind cannot be changed"));
        }

        post.assign_to = draft.assign_to;
        post.public = draft.public;
        post.title = draft.title;
        post.description = draft.description;
        post.end_date = draft.end_date;
        post.content = draft.content;

        if !self.db.update_post(&rows::post_to_row(&post)?)? {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(post)
    }

    pub fn submit_answer(&self, student_id: &str, req: SubmitAnswerRequest) -> Result<Answer, ApiError> {
        let post = self.post(req.post_id)?;

        let payload = match &post.content {
            PostContent::Vote { question } => {
                let answer = req
                    .answer
                    .ok_or_else(|| ApiError::validation("answer is required for a vote"))?;
                if !question.options.contains(&answer) {
                    return Err(ApiError::validation(format!("'{}' is not an option of this vote", answer)));
                }
                AnswerPayload::Vote { answer }
            }
            PostContent::Form { questions } => {
                let answer_list = req
                    .answer_list
                    .ok_or_else(|| ApiError::validation("answerList is required for a form"))?;
                if let Some(bad) = answer_list.iter().find(|a| a.question_index >= questions.len()) {
                    return Err(ApiError::validation(format!(
                        "questionIndex {} is out of range",
                        bad.question_index
                    )));
                }
                AnswerPayload::Form { answer_list }
            }
            PostContent::Post { .. } => return Err(ApiError::UnknownKind),
        };

        let answer = Answer {
            id: Uuid::new_v4(),
            post_id: post.id,
            student_id: student_id.to_string(),
            payload,
            created_at: Utc::now(),
        };

        match self.db.insert_answer(&rows::answer_to_row(&answer)?)? {
            InsertAnswerOutcome::Inserted => Ok(answer),
            InsertAnswerOutcome::Duplicate => Err(ApiError::conflict("Answer already submitted")),
        }
    }

    /// `None` when the student has not answered; the post itself must exist.
    pub fn user_answer(&self, post_id: Uuid, student_id: &str) -> Result<Option<Answer>, ApiError> {
        let post = self.post(post_id)?;
        self.db
            .get_answer(&post.id.to_string(), student_id)?
            .map(rows::answer_from_row)
            .transpose()
    }

    pub fn summarize(&self, post_id: Uuid) -> Result<PostSummary, ApiError> {
        let post = self.post(post_id)?;
        let id = post.id.to_string();

        match &post.content {
            PostContent::Vote { question } => {
                let counts: HashMap<String, u64> = self.db.vote_counts(&id)?.into_iter().collect();

                // Every declared option shows up, even with no votes, plus any
                // stored choice the options no longer list.
                let choices: BTreeSet<&String> = question.options.iter().chain(counts.keys()).collect();
                let results: Vec<VoteTally> = choices
                    .into_iter()
                    .map(|choice| VoteTally {
                        answer: choice.clone(),
                        count: counts.get(choice).copied().unwrap_or(0),
                    })
                    .collect();

                Ok(PostSummary::Vote(VoteSummary {
                    total_votes: results.iter().map(|r| r.count).sum(),
                    results,
                }))
            }
            PostContent::Form { questions } => {
                let mut grouped: BTreeMap<(usize, String), Vec<StudentAnswer>> = BTreeMap::new();
                for row in self.db.answers_for_post(&id)? {
                    let answer = rows::answer_from_row(row)?;
                    let AnswerPayload::Form { answer_list } = answer.payload else {
                        warn!(answer_id = %answer.id, "Skipping non-form answer on form post");
                        continue;
                    };
                    for qa in answer_list {
                        grouped
                            .entry((qa.question_index, qa.input_type))
                            .or_default()
                            .push(StudentAnswer {
                                student_id: answer.student_id.clone(),
                                answer: qa.answers,
                            });
                    }
                }

                let results = grouped
                    .into_iter()
                    .map(|((question_index, input_type), answers)| FormQuestionSummary {
                        question: questions.get(question_index).map(|q| q.question.clone()),
                        question_index,
                        input_type,
                        answers,
                    })
                    .collect();

                Ok(PostSummary::Form(FormSummary {
                    post_id: post.id,
                    results,
                }))
            }
            PostContent::Post { .. } => Err(ApiError::UnknownKind),
        }
    }

    /// Delete a post of `event_id` and every answer to it.
    pub fn delete_post(&self, event_id: Uuid, post_id: Uuid) -> Result<(), ApiError> {
        if !self
            .db
            .delete_post_cascade(&event_id.to_string(), &post_id.to_string())?
        {
            return Err(ApiError::not_found("Post not found"));
        }
        info!(%post_id, %event_id, "Post deleted");
        Ok(())
    }

    /// Delete an event with its posts, their answers and its membership.
    pub fn delete_event(&self, event_id: Uuid) -> Result<(), ApiError> {
        if !self.db.delete_event_cascade(&event_id.to_string())? {
            return Err(ApiError::not_found("Event not found"));
        }
        info!(%event_id, "Event deleted");
        Ok(())
    }

    /// Posts of an event as `student_id` may see them. Staff see public
    /// posts and those assigned to their role or to everyone; participants
    /// see public posts; anyone else sees nothing.
    pub fn visible_posts(&self, event_id: Uuid, student_id: &str) -> Result<Vec<PostView>, ApiError> {
        let event = self
            .db
            .get_event(&event_id.to_string())?
            .ok_or_else(|| ApiError::not_found("Event not found"))
            .and_then(rows::event_from_row)?;

        let staff_role = event.staff_role(student_id).map(str::to_string);
        if staff_role.is_none() && !event.is_participant(student_id) {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut views = Vec::new();
        for row in self.db.posts_for_event(&event_id.to_string())? {
            let post = match rows::post_from_row(row) {
                Ok(post) => post,
                Err(ApiError::UnknownKind) => {
                    warn!(%event_id, "Skipping post with unknown kind");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let visible = post.public
                || staff_role.as_deref().is_some_and(|role| {
                    post.assign_to.iter().any(|a| a == role || a == EVERYONE)
                });
            if visible {
                views.push(PostView {
                    time_up: post.is_time_up(now),
                    post,
                });
            }
        }
        Ok(views)
    }
}
