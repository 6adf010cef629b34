use tracing::info;
use uuid::Uuid;

use cpeevent_db::Database;
use cpeevent_db::models::{JoinOutcome, LeaveOutcome};
use cpeevent_types::models::{EventMembers, MemberRole};

use crate::error::ApiError;
use crate::rows;

/// Result of a successful join. Joining twice with the same role is not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    New,
    AlreadyMember,
}

/// Participant/staff membership of events. A student is in at most one of
/// the two sets of an event.
pub struct MembershipManager<'a> {
    db: &'a Database,
}

impl<'a> MembershipManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn join(&self, student_id: &str, event_id: Uuid, role: &str) -> Result<Joined, ApiError> {
        let role: MemberRole = role
            .parse()
            .map_err(|_| ApiError::validation("Invalid role"))?;

        match self.db.join_event(&event_id.to_string(), student_id, role)? {
            JoinOutcome::Joined => {
                info!(student_id, %event_id, ?role, "Joined event");
                Ok(Joined::New)
            }
            JoinOutcome::AlreadyMember => Ok(Joined::AlreadyMember),
            JoinOutcome::RoleConflict => Err(ApiError::conflict(
                "User cannot be both staff and participant",
            )),
            JoinOutcome::EventNotFound => Err(ApiError::not_found("Event not found")),
        }
    }

    /// Returns the set the student was removed from.
    pub fn leave(&self, student_id: &str, event_id: Uuid) -> Result<MemberRole, ApiError> {
        match self.db.leave_event(&event_id.to_string(), student_id)? {
            LeaveOutcome::LeftParticipants => Ok(MemberRole::Participant),
            LeaveOutcome::LeftStaff => Ok(MemberRole::Staff),
            LeaveOutcome::NotMember => Err(ApiError::conflict("User is not part of the event")),
            LeaveOutcome::EventNotFound => Err(ApiError::not_found("Event not found")),
        }
    }

    pub fn list_members(&self, event_id: Uuid) -> Result<EventMembers, ApiError> {
        let members = self
            .db
            .event_members(&event_id.to_string())?
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        Ok(EventMembers {
            event_id,
            participants: members.participants.into_iter().map(rows::member_info).collect(),
            staff: members.staff.into_iter().map(rows::member_info).collect(),
        })
    }

    /// Give an existing staff member one of the event's role labels.
    pub fn assign_staff_role(&self, event_id: Uuid, student_id: &str, role: &str) -> Result<(), ApiError> {
        let id = event_id.to_string();
        let event = self
            .db
            .get_event(&id)?
            .ok_or_else(|| ApiError::not_found("Event not found"))
            .and_then(rows::event_from_row)?;

        if !event.role.iter().any(|r| r == role) {
            return Err(ApiError::validation("Invalid role"));
        }
        if !self.db.set_staff_role(&id, student_id, role)? {
            return Err(ApiError::conflict("User is not staff of the event"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpeevent_db::models::{EventFieldsRow, UserRow};

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let event_id = Uuid::new_v4();
        db.insert_event(
            &event_id.to_string(),
            &EventFieldsRow {
                name: "Open House".into(),
                description: String::new(),
                n_participant: 100,
                n_staff: 10,
                start_date: None,
                end_date: None,
                president: "001".into(),
                kind: "camp".into(),
                roles: r#"["runner","med"]"#.into(),
                icon: None,
                poster: None,
            },
        )
        .unwrap();

        for (id, first) in [("001", "Somchai"), ("002", "Suda")] {
            let now = chrono::Utc::now().to_rfc3339();
            db.create_user(&UserRow {
                student_id: id.into(),
                first_name: first.into(),
                last_name: "Jaidee".into(),
                year: 1,
                email: format!("{id}@x.com"),
                password: "hash".into(),
                phone_number: "080".into(),
                username: first.to_lowercase(),
                access: 1,
                token: None,
                refresh_token: None,
                created_at: now.clone(),
                updated_at: now,
            })
            .unwrap();
        }

        (db, event_id)
    }

    #[test]
    fn staff_cannot_become_participant() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);

        assert_eq!(members.join("001", event_id, "staff").unwrap(), Joined::New);
        let err = members.join("001", event_id, "participant").unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "User cannot be both staff and participant"));
    }

    #[test]
    fn rejoin_is_already_member() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);

        members.join("001", event_id, "participant").unwrap();
        assert_eq!(
            members.join("001", event_id, "participant").unwrap(),
            Joined::AlreadyMember
        );
        assert_eq!(members.list_members(event_id).unwrap().participants.len(), 1);
    }

    #[test]
    fn join_validates_role_and_event() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);

        assert!(matches!(
            members.join("001", event_id, "president"),
            Err(ApiError::Validation(ref m)) if m == "Invalid role"
        ));
        assert!(matches!(
            members.join("001", Uuid::new_v4(), "staff"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn second_leave_fails() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);

        members.join("002", event_id, "staff").unwrap();
        assert_eq!(members.leave("002", event_id).unwrap(), MemberRole::Staff);
        assert!(matches!(members.leave("002", event_id), Err(ApiError::Conflict(_))));
    }

    #[test]
    fn members_listing_resolves_users() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);

        members.join("001", event_id, "participant").unwrap();
        members.join("999", event_id, "participant").unwrap();
        members.join("002", event_id, "staff").unwrap();
        members.assign_staff_role(event_id, "002", "med").unwrap();

        let listing = members.list_members(event_id).unwrap();
        assert_eq!(listing.participants.len(), 1);
        assert_eq!(listing.participants[0].name, "Somchai Jaidee");
        assert_eq!(listing.staff[0].role.as_deref(), Some("med"));
    }

    #[test]
    fn staff_role_must_be_declared_and_held() {
        let (db, event_id) = setup();
        let members = MembershipManager::new(&db);
        members.join("001", event_id, "participant").unwrap();

        assert!(matches!(
            members.assign_staff_role(event_id, "001", "cook"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            members.assign_staff_role(event_id, "001", "runner"),
            Err(ApiError::Conflict(_))
        ));
    }
}
