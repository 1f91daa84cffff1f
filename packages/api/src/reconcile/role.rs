use crate::auth::AuthConfig;
use crate::models::{Club, IdentityUser, Role};

/// Resolve the role of `identity`, in strict order:
///
/// 1. the metadata role hint, or [`Role::Student`];
/// 2. overridden by [`Role::ClubRepresentative`] if `club` names this user as representative;
/// 3. otherwise overridden by [`Role::Admin`] for the reserved admin email suffix.
///
/// Returns the role and, for representatives, the club id.
pub fn resolve_role(
    identity: &IdentityUser,
    club: Option<&Club>,
    config: &AuthConfig,
) -> (Role, Option<String>) {
    let hinted = identity.metadata.role.unwrap_or_default();

    if let Some(club) = club.filter(|c| c.representative_id.as_deref() == Some(identity.id.as_str())) {
        return (Role::ClubRepresentative, Some(club.id.clone()));
    }

    if config.is_admin_email(&identity.email) {
        return (Role::Admin, None);
    }

    (hinted, None)
}
