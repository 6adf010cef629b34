/// Database row types. These map directly to SQLite rows.
/// JSON columns (roles, assign_to, payload) stay as raw text here; the API
/// layer decodes them into cpeevent-types models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub year: i32,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub username: String,
    pub access: i32,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Self-service account fields.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub first_name: String,
    pub last_name: String,
    pub year: i32,
    pub email: String,
    pub phone_number: String,
}

/// Columns of `events` that callers write directly.
#[derive(Debug, Clone)]
pub struct EventFieldsRow {
    pub name: String,
    pub description: String,
    pub n_participant: i64,
    pub n_staff: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub president: String,
    pub kind: String,
    pub roles: String,
    pub icon: Option<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StaffRow {
    pub student_id: String,
    pub role: String,
}

/// An event with its membership and post list gathered from the side tables.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: String,
    pub fields: EventFieldsRow,
    pub participants: Vec<String>,
    pub staff: Vec<StaffRow>,
    pub post_ids: Vec<String>,
}

/// A member resolved against `users`.
#[derive(Debug, Clone)]
pub struct MemberRow {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventMembersRow {
    pub participants: Vec<MemberRow>,
    pub staff: Vec<MemberRow>,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub event_id: String,
    pub kind: String,
    pub assign_to: String,
    pub public: bool,
    pub title: String,
    pub description: String,
    pub post_date: String,
    pub end_date: Option<String>,
    pub author: String,
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub id: String,
    pub post_id: String,
    pub student_id: String,
    pub kind: String,
    pub payload: String,
    pub created_at: String,
}

// -- Outcomes of conditional writes --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    StudentIdTaken,
    EmailTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateInfoOutcome {
    Updated,
    UserNotFound,
    EmailTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    RoleConflict,
    EventNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    LeftParticipants,
    LeftStaff,
    NotMember,
    EventNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAnswerOutcome {
    Inserted,
    Duplicate,
}
