use std::collections::HashMap;

use crate::Database;
use crate::models::{
    AccountRow, AnswerRow, CreateUserOutcome, EventFieldsRow, EventMembersRow, EventRow,
    InsertAnswerOutcome, JoinOutcome, LeaveOutcome, MemberRow, PostRow, StaffRow,
    UpdateInfoOutcome, UserRow,
};
use anyhow::Result;
use cpeevent_types::models::MemberRole;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::debug;

const USER_COLUMNS: &str = "student_id, first_name, last_name, year, email, password, \
     phone_number, username, access, token, refresh_token, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, name, description, n_participant, n_staff, start_date, \
     end_date, president, kind, roles, icon, poster";

const POST_COLUMNS: &str = "id, event_id, kind, assign_to, public, title, description, \
     post_date, end_date, author, payload";

const ANSWER_COLUMNS: &str = "id, post_id, student_id, kind, payload, created_at";

impl Database {
    // -- Users --

    /// Insert a user unless the student id or email is already registered.
    pub fn create_user(&self, user: &UserRow) -> Result<CreateUserOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if exists(&tx, "SELECT EXISTS(SELECT 1 FROM users WHERE student_id = ?1)", &[&user.student_id])? {
                return Ok(CreateUserOutcome::StudentIdTaken);
            }
            if exists(&tx, "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)", &[&user.email])? {
                return Ok(CreateUserOutcome::EmailTaken);
            }

            tx.execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                rusqlite::params![
                    user.student_id,
                    user.first_name,
                    user.last_name,
                    user.year,
                    user.email,
                    user.password,
                    user.phone_number,
                    user.username,
                    user.access,
                    user.token,
                    user.refresh_token,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(CreateUserOutcome::Created)
        })
    }

    pub fn get_user(&self, student_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE student_id = ?1"),
                [student_id],
                user_from_row,
            )
            .optional()
        })
    }

    /// Store the last issued token pair. `None` clears a token.
    /// Returns false when no such user exists.
    pub fn update_tokens(
        &self,
        student_id: &str,
        token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<bool> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET token = ?1, refresh_token = ?2, updated_at = ?3
                 WHERE student_id = ?4",
                (token, refresh_token, &updated_at, student_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_account_info(&self, student_id: &str, info: &AccountRow) -> Result<UpdateInfoOutcome> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM users WHERE student_id = ?1)", &[&student_id])? {
                return Ok(UpdateInfoOutcome::UserNotFound);
            }
            if exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND student_id <> ?2)",
                &[&info.email, &student_id],
            )? {
                return Ok(UpdateInfoOutcome::EmailTaken);
            }

            let changed = tx.execute(
                "UPDATE users
                 SET first_name = ?1, last_name = ?2, year = ?3, email = ?4,
                     phone_number = ?5, updated_at = ?6
                 WHERE student_id = ?7",
                rusqlite::params![
                    info.first_name,
                    info.last_name,
                    info.year,
                    info.email,
                    info.phone_number,
                    updated_at,
                    student_id,
                ],
            )?;
            tx.commit()?;

            Ok(if changed > 0 {
                UpdateInfoOutcome::Updated
            } else {
                UpdateInfoOutcome::UserNotFound
            })
        })
    }

    pub fn update_username(&self, student_id: &str, username: &str) -> Result<bool> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET username = ?1, updated_at = ?2 WHERE student_id = ?3",
                (username, &updated_at, student_id),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Events --

    pub fn insert_event(&self, id: &str, fields: &EventFieldsRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                rusqlite::params![
                    id,
                    fields.name,
                    fields.description,
                    fields.n_participant,
                    fields.n_staff,
                    fields.start_date,
                    fields.end_date,
                    fields.president,
                    fields.kind,
                    fields.roles,
                    fields.icon,
                    fields.poster,
                ],
            )?;
            Ok(())
        })
    }

    /// Replace the descriptive fields of an event. Membership and posts are
    /// untouched.
    pub fn update_event(&self, id: &str, fields: &EventFieldsRow) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events
                 SET name = ?2, description = ?3, n_participant = ?4, n_staff = ?5,
                     start_date = ?6, end_date = ?7, president = ?8, kind = ?9,
                     roles = ?10, icon = ?11, poster = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    fields.name,
                    fields.description,
                    fields.n_participant,
                    fields.n_staff,
                    fields.start_date,
                    fields.end_date,
                    fields.president,
                    fields.kind,
                    fields.roles,
                    fields.icon,
                    fields.poster,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let mut rows = query_events(conn, "WHERE id = ?1", &[&id])?;
            Ok(rows.pop())
        })
    }

    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| query_events(conn, "", &[]))
    }

    /// Case-insensitive substring match on the event name.
    pub fn search_events(&self, name: &str) -> Result<Vec<EventRow>> {
        let pattern = format!("%{}%", escape_like(name));
        self.with_conn(|conn| query_events(conn, "WHERE name LIKE ?1 ESCAPE '\\'", &[&pattern]))
    }

    /// Delete an event together with its posts, their answers and the
    /// membership rows. Returns false when the event does not exist.
    pub fn delete_event_cascade(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", &[&id])? {
                return Ok(false);
            }

            let answers = tx.execute(
                "DELETE FROM answers WHERE post_id IN (SELECT id FROM posts WHERE event_id = ?1)",
                [id],
            )?;
            let posts = tx.execute("DELETE FROM posts WHERE event_id = ?1", [id])?;
            tx.execute("DELETE FROM event_participants WHERE event_id = ?1", [id])?;
            tx.execute("DELETE FROM event_staff WHERE event_id = ?1", [id])?;
            tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            tx.commit()?;

            debug!(event_id = id, posts, answers, "Event deleted with cascade");
            Ok(true)
        })
    }

    // -- Membership --

    /// Add a student to the participant or staff set of an event.
    ///
    /// The role-conflict check and the insert share one transaction, so two
    /// concurrent joins cannot both pass the check.
    pub fn join_event(&self, event_id: &str, student_id: &str, role: MemberRole) -> Result<JoinOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", &[&event_id])? {
                return Ok(JoinOutcome::EventNotFound);
            }

            let (other_table, own_insert) = match role {
                MemberRole::Participant => (
                    "event_staff",
                    "INSERT OR IGNORE INTO event_participants (event_id, student_id) VALUES (?1, ?2)",
                ),
                MemberRole::Staff => (
                    "event_participants",
                    "INSERT OR IGNORE INTO event_staff (event_id, student_id, role) VALUES (?1, ?2, '')",
                ),
            };

            let conflict = exists(
                &tx,
                &format!("SELECT EXISTS(SELECT 1 FROM {other_table} WHERE event_id = ?1 AND student_id = ?2)"),
                &[&event_id, &student_id],
            )?;
            if conflict {
                return Ok(JoinOutcome::RoleConflict);
            }

            let inserted = tx.execute(own_insert, (event_id, student_id))?;
            tx.commit()?;

            Ok(if inserted > 0 {
                JoinOutcome::Joined
            } else {
                JoinOutcome::AlreadyMember
            })
        })
    }

    /// Remove a student from whichever membership set holds them.
    pub fn leave_event(&self, event_id: &str, student_id: &str) -> Result<LeaveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", &[&event_id])? {
                return Ok(LeaveOutcome::EventNotFound);
            }

            let staff = tx.execute(
                "DELETE FROM event_staff WHERE event_id = ?1 AND student_id = ?2",
                (event_id, student_id),
            )?;
            let participants = tx.execute(
                "DELETE FROM event_participants WHERE event_id = ?1 AND student_id = ?2",
                (event_id, student_id),
            )?;
            tx.commit()?;

            Ok(match (staff, participants) {
                (0, 0) => LeaveOutcome::NotMember,
                (0, _) => LeaveOutcome::LeftParticipants,
                _ => LeaveOutcome::LeftStaff,
            })
        })
    }

    /// Set the role label of an existing staff member. Returns false when
    /// the student is not staff of the event.
    pub fn set_staff_role(&self, event_id: &str, student_id: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE event_staff SET role = ?3 WHERE event_id = ?1 AND student_id = ?2",
                (event_id, student_id, role),
            )?;
            Ok(changed > 0)
        })
    }

    /// Members joined with their user rows. Ids without a user row are
    /// dropped. `None` when the event does not exist.
    pub fn event_members(&self, event_id: &str) -> Result<Option<EventMembersRow>> {
        self.with_conn(|conn| {
            if !exists(conn, "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", &[&event_id])? {
                return Ok(None);
            }

            let mut stmt = conn.prepare(
                "SELECT u.student_id, u.first_name, u.last_name, u.phone_number
                 FROM event_participants p
                 JOIN users u ON u.student_id = p.student_id
                 WHERE p.event_id = ?1
                 ORDER BY p.rowid",
            )?;
            let participants = stmt
                .query_map([event_id], |row| {
                    Ok(MemberRow {
                        student_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone_number: row.get(3)?,
                        role: None,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT u.student_id, u.first_name, u.last_name, u.phone_number, s.role
                 FROM event_staff s
                 JOIN users u ON u.student_id = s.student_id
                 WHERE s.event_id = ?1
                 ORDER BY s.rowid",
            )?;
            let staff = stmt
                .query_map([event_id], |row| {
                    Ok(MemberRow {
                        student_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone_number: row.get(3)?,
                        role: Some(row.get(4)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(EventMembersRow { participants, staff }))
        })
    }

    // -- Posts --

    /// Insert a post into its event's post list. Returns false when the
    /// event does not exist.
    pub fn insert_post(&self, post: &PostRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", &[&post.event_id])? {
                return Ok(false);
            }

            tx.execute(
                &format!(
                    "INSERT INTO posts ({POST_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                rusqlite::params![
                    post.id,
                    post.event_id,
                    post.kind,
                    post.assign_to,
                    post.public,
                    post.title,
                    post.description,
                    post.post_date,
                    post.end_date,
                    post.author,
                    post.payload,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                [id],
                post_from_row,
            )
            .optional()
        })
    }

    pub fn posts_for_event(&self, event_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE event_id = ?1 ORDER BY post_date, rowid"
            ))?;
            let rows = stmt
                .query_map([event_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the editable columns of a post. Kind, event, author and
    /// post date are fixed at creation.
    pub fn update_post(&self, post: &PostRow) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts
                 SET assign_to = ?2, public = ?3, title = ?4, description = ?5,
                     end_date = ?6, payload = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    post.id,
                    post.assign_to,
                    post.public,
                    post.title,
                    post.description,
                    post.end_date,
                    post.payload,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a post of the given event along with its answers. Returns
    /// false when the post is not in that event.
    pub fn delete_post_cascade(&self, event_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1 AND event_id = ?2)",
                &[&post_id, &event_id],
            )? {
                return Ok(false);
            }

            let answers = tx.execute("DELETE FROM answers WHERE post_id = ?1", [post_id])?;
            tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
            tx.commit()?;

            debug!(post_id, answers, "Post deleted with cascade");
            Ok(true)
        })
    }

    // -- Answers --

    pub fn insert_answer(&self, answer: &AnswerRow) -> Result<InsertAnswerOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM answers WHERE post_id = ?1 AND student_id = ?2)",
                &[&answer.post_id, &answer.student_id],
            )? {
                return Ok(InsertAnswerOutcome::Duplicate);
            }

            tx.execute(
                &format!("INSERT INTO answers ({ANSWER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                (
                    &answer.id,
                    &answer.post_id,
                    &answer.student_id,
                    &answer.kind,
                    &answer.payload,
                    &answer.created_at,
                ),
            )?;
            tx.commit()?;
            Ok(InsertAnswerOutcome::Inserted)
        })
    }

    pub fn get_answer(&self, post_id: &str, student_id: &str) -> Result<Option<AnswerRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE post_id = ?1 AND student_id = ?2"),
                [post_id, student_id],
                answer_from_row,
            )
            .optional()
        })
    }

    pub fn answers_for_post(&self, post_id: &str) -> Result<Vec<AnswerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ANSWER_COLUMNS} FROM answers WHERE post_id = ?1 ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([post_id], answer_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Vote count per chosen option.
    pub fn vote_counts(&self, post_id: &str) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT json_extract(payload, '$.answer') AS choice, COUNT(*)
                 FROM answers
                 WHERE post_id = ?1 AND kind = 'vote'
                 GROUP BY choice
                 ORDER BY choice",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn exists(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<bool> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        student_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        year: row.get(3)?,
        email: row.get(4)?,
        password: row.get(5)?,
        phone_number: row.get(6)?,
        username: row.get(7)?,
        access: row.get(8)?,
        token: row.get(9)?,
        refresh_token: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        kind: row.get(2)?,
        assign_to: row.get(3)?,
        public: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        post_date: row.get(7)?,
        end_date: row.get(8)?,
        author: row.get(9)?,
        payload: row.get(10)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<AnswerRow> {
    Ok(AnswerRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        student_id: row.get(2)?,
        kind: row.get(3)?,
        payload: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Load events matching `filter` and gather their side tables in one query
/// each (no per-event round trips).
fn query_events(conn: &Connection, filter: &str, params: &[&dyn ToSql]) -> Result<Vec<EventRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events {filter} ORDER BY created_at, rowid"
    ))?;

    let mut events = stmt
        .query_map(params, |row| {
            Ok(EventRow {
                id: row.get(0)?,
                fields: EventFieldsRow {
                    name: row.get(1)?,
                    description: row.get(2)?,
                    n_participant: row.get(3)?,
                    n_staff: row.get(4)?,
                    start_date: row.get(5)?,
                    end_date: row.get(6)?,
                    president: row.get(7)?,
                    kind: row.get(8)?,
                    roles: row.get(9)?,
                    icon: row.get(10)?,
                    poster: row.get(11)?,
                },
                participants: Vec::new(),
                staff: Vec::new(),
                post_ids: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if events.is_empty() {
        return Ok(events);
    }

    let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let in_clause = placeholders.join(", ");
    let id_params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();

    let mut participants: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT event_id, student_id FROM event_participants
         WHERE event_id IN ({in_clause}) ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(id_params.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (event_id, student_id) = row?;
        participants.entry(event_id).or_default().push(student_id);
    }

    let mut staff: HashMap<String, Vec<StaffRow>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT event_id, student_id, role FROM event_staff
         WHERE event_id IN ({in_clause}) ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(id_params.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            StaffRow {
                student_id: row.get(1)?,
                role: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (event_id, member) = row?;
        staff.entry(event_id).or_default().push(member);
    }

    let mut posts: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT event_id, id FROM posts
         WHERE event_id IN ({in_clause}) ORDER BY post_date, rowid"
    ))?;
    let rows = stmt.query_map(id_params.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (event_id, post_id) = row?;
        posts.entry(event_id).or_default().push(post_id);
    }

    for event in &mut events {
        event.participants = participants.remove(&event.id).unwrap_or_default();
        event.staff = staff.remove(&event.id).unwrap_or_default();
        event.post_ids = posts.remove(&event.id).unwrap_or_default();
    }

    Ok(events)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(student_id: &str, email: &str) -> UserRow {
        let now = chrono::Utc::now().to_rfc3339();
        UserRow {
            student_id: student_id.into(),
            first_name: "Somchai".into(),
            last_name: "Jaidee".into(),
            year: 2,
            email: email.into(),
            password: "hash".into(),
            phone_number: "0800000000".into(),
            username: format!("user{student_id}"),
            access: 1,
            token: None,
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn event_fields(name: &str) -> EventFieldsRow {
        EventFieldsRow {
            name: name.into(),
            description: String::new(),
            n_participant: 0,
            n_staff: 0,
            start_date: None,
            end_date: None,
            president: String::new(),
            kind: String::new(),
            roles: r#"["runner","med"]"#.into(),
            icon: None,
            poster: None,
        }
    }

    fn vote_post(id: &str, event_id: &str) -> PostRow {
        PostRow {
            id: id.into(),
            event_id: event_id.into(),
            kind: "vote".into(),
            assign_to: "[]".into(),
            public: true,
            title: "Shirt colour".into(),
            description: String::new(),
            post_date: chrono::Utc::now().to_rfc3339(),
            end_date: None,
            author: "001".into(),
            payload: r#"{"kind":"vote","voteQuestion":{"question":"?","options":["A","B"]}}"#.into(),
        }
    }

    fn vote(id: &str, post_id: &str, student_id: &str, choice: &str) -> AnswerRow {
        AnswerRow {
            id: id.into(),
            post_id: post_id.into(),
            student_id: student_id.into(),
            kind: "vote".into(),
            payload: format!(r#"{{"kind":"vote","answer":"{choice}"}}"#),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn create_user_reports_which_key_is_taken() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.create_user(&user("001", "a@x.com")).unwrap(), CreateUserOutcome::Created);
        assert_eq!(
            db.create_user(&user("001", "b@x.com")).unwrap(),
            CreateUserOutcome::StudentIdTaken
        );
        assert_eq!(
            db.create_user(&user("002", "a@x.com")).unwrap(),
            CreateUserOutcome::EmailTaken
        );
        assert!(db.get_user("002").unwrap().is_none());
    }

    #[test]
    fn tokens_are_stored_and_cleared() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("001", "a@x.com")).unwrap();

        assert!(db.update_tokens("001", Some("access"), Some("refresh")).unwrap());
        let row = db.get_user("001").unwrap().unwrap();
        assert_eq!(row.token.as_deref(), Some("access"));
        assert_eq!(row.refresh_token.as_deref(), Some("refresh"));

        assert!(db.update_tokens("001", None, None).unwrap());
        let row = db.get_user("001").unwrap().unwrap();
        assert!(row.token.is_none() && row.refresh_token.is_none());

        assert!(!db.update_tokens("999", Some("a"), Some("b")).unwrap());
    }

    #[test]
    fn account_email_must_stay_unique() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("001", "a@x.com")).unwrap();
        db.create_user(&user("002", "b@x.com")).unwrap();

        let info = AccountRow {
            first_name: "New".into(),
            last_name: "Name".into(),
            year: 3,
            email: "b@x.com".into(),
            phone_number: "0811111111".into(),
        };
        assert_eq!(db.update_account_info("001", &info).unwrap(), UpdateInfoOutcome::EmailTaken);

        let info = AccountRow {
            email: "a@x.com".into(),
            ..info
        };
        assert_eq!(db.update_account_info("001", &info).unwrap(), UpdateInfoOutcome::Updated);
        assert_eq!(db.get_user("001").unwrap().unwrap().year, 3);
        assert_eq!(db.update_account_info("404", &info).unwrap(), UpdateInfoOutcome::UserNotFound);
    }

    #[test]
    fn join_enforces_exclusive_roles() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();

        assert_eq!(db.join_event("e1", "001", MemberRole::Staff).unwrap(), JoinOutcome::Joined);
        assert_eq!(
            db.join_event("e1", "001", MemberRole::Participant).unwrap(),
            JoinOutcome::RoleConflict
        );
        assert_eq!(db.join_event("e1", "001", MemberRole::Staff).unwrap(), JoinOutcome::AlreadyMember);
        assert_eq!(
            db.join_event("missing", "001", MemberRole::Staff).unwrap(),
            JoinOutcome::EventNotFound
        );

        let event = db.get_event("e1").unwrap().unwrap();
        assert!(event.participants.is_empty());
        assert_eq!(event.staff.len(), 1);
        assert_eq!(event.staff[0].role, "");
    }

    #[test]
    fn leave_twice_is_not_member() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();
        db.join_event("e1", "001", MemberRole::Participant).unwrap();

        assert_eq!(db.leave_event("e1", "001").unwrap(), LeaveOutcome::LeftParticipants);
        assert_eq!(db.leave_event("e1", "001").unwrap(), LeaveOutcome::NotMember);
    }

    #[test]
    fn members_skip_unknown_users() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("001", "a@x.com")).unwrap();
        db.create_user(&user("002", "b@x.com")).unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();

        db.join_event("e1", "001", MemberRole::Participant).unwrap();
        db.join_event("e1", "ghost", MemberRole::Participant).unwrap();
        db.join_event("e1", "002", MemberRole::Staff).unwrap();
        assert!(db.set_staff_role("e1", "002", "runner").unwrap());
        assert!(!db.set_staff_role("e1", "001", "runner").unwrap());

        let members = db.event_members("e1").unwrap().unwrap();
        assert_eq!(members.participants.len(), 1);
        assert_eq!(members.participants[0].student_id, "001");
        assert_eq!(members.staff[0].role.as_deref(), Some("runner"));
        assert!(db.event_members("missing").unwrap().is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("CPE Open House")).unwrap();
        db.insert_event("e2", &event_fields("Sports Day 100%")).unwrap();

        let found = db.search_events("open").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "e1");

        assert_eq!(db.search_events("100%").unwrap().len(), 1);
        assert!(db.search_events("_").unwrap().is_empty());
        assert_eq!(db.list_events().unwrap().len(), 2);
    }

    #[test]
    fn vote_counts_group_by_choice() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();
        assert!(db.insert_post(&vote_post("p1", "e1")).unwrap());
        assert!(!db.insert_post(&vote_post("p2", "missing")).unwrap());

        db.insert_answer(&vote("a1", "p1", "001", "B")).unwrap();
        db.insert_answer(&vote("a2", "p1", "002", "A")).unwrap();
        db.insert_answer(&vote("a3", "p1", "003", "B")).unwrap();

        assert_eq!(
            db.vote_counts("p1").unwrap(),
            vec![("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[test]
    fn second_answer_is_duplicate() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();
        db.insert_post(&vote_post("p1", "e1")).unwrap();

        assert_eq!(db.insert_answer(&vote("a1", "p1", "001", "A")).unwrap(), InsertAnswerOutcome::Inserted);
        assert_eq!(db.insert_answer(&vote("a2", "p1", "001", "B")).unwrap(), InsertAnswerOutcome::Duplicate);
        assert_eq!(db.get_answer("p1", "001").unwrap().unwrap().id, "a1");
    }

    #[test]
    fn deleting_event_removes_posts_and_answers() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();
        db.insert_post(&vote_post("p1", "e1")).unwrap();
        db.insert_post(&vote_post("p2", "e1")).unwrap();
        db.insert_answer(&vote("a1", "p1", "001", "A")).unwrap();
        db.insert_answer(&vote("a2", "p2", "001", "A")).unwrap();
        db.join_event("e1", "001", MemberRole::Participant).unwrap();

        assert_eq!(db.get_event("e1").unwrap().unwrap().post_ids.len(), 2);
        assert!(db.delete_event_cascade("e1").unwrap());

        assert!(db.get_event("e1").unwrap().is_none());
        assert!(db.get_post("p1").unwrap().is_none());
        assert!(db.answers_for_post("p2").unwrap().is_empty());
        assert!(!db.delete_event_cascade("e1").unwrap());
    }

    #[test]
    fn deleting_post_only_touches_its_answers() {
        let db = Database::open_in_memory().unwrap();
        db.insert_event("e1", &event_fields("Open House")).unwrap();
        db.insert_post(&vote_post("p1", "e1")).unwrap();
        db.insert_post(&vote_post("p2", "e1")).unwrap();
        db.insert_answer(&vote("a1", "p1", "001", "A")).unwrap();
        db.insert_answer(&vote("a2", "p2", "001", "A")).unwrap();

        assert!(!db.delete_post_cascade("other", "p1").unwrap());
        assert!(db.delete_post_cascade("e1", "p1").unwrap());

        assert!(db.answers_for_post("p1").unwrap().is_empty());
        assert_eq!(db.answers_for_post("p2").unwrap().len(), 1);
        assert_eq!(db.get_event("e1").unwrap().unwrap().post_ids, vec!["p2"]);
    }
}
