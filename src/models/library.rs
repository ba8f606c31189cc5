//! Location, Shelf, Invitation, and RemovalRequest data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical place (e.g. a household) containing shelves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Payload for creating or updating a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLocation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named grouping of books within a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shelf {
    pub id: i64,
    pub name: String,
    pub location_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a shelf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewShelf {
    pub name: String,
    pub location_id: i64,
}

/// An invitation for someone to join a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invitation {
    pub id: i64,
    pub location_id: i64,
    pub invited_email: String,
    pub invitation_token: String,
    pub invited_by: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Derived lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
        }
    }
}

impl Invitation {
    /// Status at `now`. An accepted invitation stays accepted after it expires.
    pub fn status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.used_at.is_some() {
            InvitationStatus::Accepted
        } else if now >= self.expires_at {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }
}

/// Review state of a removal request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemovalStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl RemovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

/// A user-submitted request for an admin to approve deletion of a book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovalRequest {
    pub id: i64,
    pub book_id: i64,
    #[serde(default)]
    pub book_title: Option<String>,
    pub requested_by: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: RemovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn invitation(expires_at: DateTime<Utc>, used_at: Option<DateTime<Utc>>) -> Invitation {
        Invitation {
            id: 1,
            location_id: 2,
            invited_email: "guest@example.com".into(),
            invitation_token: "tok".into(),
            invited_by: 3,
            expires_at,
            used_at,
            created_at: expires_at - Duration::days(7),
        }
    }

    #[test]
    fn invitation_status_transitions() {
        let expires = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let before = expires - Duration::hours(1);
        let after = expires + Duration::hours(1);

        assert_eq!(invitation(expires, None).status(before), InvitationStatus::Pending);
        assert_eq!(invitation(expires, None).status(after), InvitationStatus::Expired);
        assert_eq!(
            invitation(expires, Some(before)).status(after),
            InvitationStatus::Accepted
        );
    }

    #[test]
    fn removal_request_defaults_to_pending() {
        let json = r#"{
            "id": 5,
            "book_id": 9,
            "requested_by": 4,
            "created_at": "2026-01-10T12:00:00Z"
        }"#;
        let request: RemovalRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, RemovalStatus::Pending);
        assert!(request.reason.is_none());
    }
}
