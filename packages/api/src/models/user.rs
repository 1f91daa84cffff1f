//! # User model for reconciled sessions
//!
//! Defines the application-level representations of a Cluby user:
//!
//! ## [`User`]
//!
//! The value the session reconciler produces. It is derived on every pass from the
//! identity provider's user object plus two directory lookups, and is never written
//! back anywhere:
//!
//! - `id`, `email`: copied from the identity provider.
//! - `role`: see [`Role`]; recomputed from scratch each pass.
//! - `club_id`: only set for club representatives.
//! - `profile`: optional denormalized attributes from the `profiles` table.
//!
//! ## [`UserRecord`]
//!
//! The row written to the `users` table at registration time. It carries the role the
//! account asked for, which later feeds nothing but reporting: the live role always
//! comes from [`crate::reconcile::resolve_role`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role that decides which UI surfaces a user sees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    Student,
    ClubRepresentative,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::ClubRepresentative => "clubRepresentative",
            Role::Admin => "admin",
        }
    }

    /// Navigation sections shown for this role, in display order.
    pub fn nav_sections(&self) -> &'static [&'static str] {
        match self {
            Role::Student => &["Feed", "Clubs", "Events", "Recruitment"],
            Role::ClubRepresentative => &["Feed", "Clubs", "Events", "Recruitment", "My Club"],
            Role::Admin => &["Feed", "Clubs", "Events", "Recruitment", "Club Approvals", "Moderation"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "clubRepresentative" => Ok(Role::ClubRepresentative),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Denormalized profile attributes keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Profile {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub bio: Option<String>,
}

/// Reconciled user, safe to hand to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub club_id: Option<String>,
    pub profile: Option<Profile>,
}

impl User {
    /// Get display name, falling back to email if the profile has no name.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .unwrap_or(&self.email)
    }
}

/// Application-level user row written at registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::ClubRepresentative.to_string(), "clubRepresentative");
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Student);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = User {
            id: "u1".into(),
            email: "student1@gmail.com".into(),
            role: Role::Student,
            club_id: None,
            profile: None,
        };
        assert_eq!(user.display_name(), "student1@gmail.com");

        user.profile = Some(Profile {
            full_name: Some("Kim Minji".into()),
            ..Profile::default()
        });
        assert_eq!(user.display_name(), "Kim Minji");
    }
}
