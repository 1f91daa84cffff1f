//! Two-step account registration with a compensating delete.
//!
//! The identity and the `users` row live in different stores, so the flow is:
//! create identity → write record → on failure delete the identity again.

use tracing::{error, info, warn};

use super::provider::IdentityAdmin;
use crate::directory::Directory;
use crate::error::{AuthError, RegistrationError};
use crate::models::{IdentityUser, NewAccount, Role, UserRecord};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Trim and lower-case the email, trim the name, and reject obviously bad input.
///
/// Admin cannot be requested at sign-up; it only comes from the reserved email suffix.
pub fn normalize_account(account: &NewAccount) -> Result<NewAccount, RegistrationError> {
    let email = account.email.trim().to_lowercase();
    let name = account.name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(RegistrationError::Invalid("Invalid email address".into()));
    }
    if account.password.len() < MIN_PASSWORD_LEN {
        return Err(RegistrationError::Invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if name.is_empty() {
        return Err(RegistrationError::Invalid("Name is required".into()));
    }
    if account.role == Role::Admin {
        return Err(RegistrationError::Invalid(
            "The admin role cannot be requested at sign-up".into(),
        ));
    }

    Ok(NewAccount {
        name,
        email,
        password: account.password.clone(),
        role: account.role,
    })
}

/// Register an account across the identity provider and the directory.
pub async fn register_account<P, D>(
    provider: &P,
    directory: &D,
    account: &NewAccount,
) -> Result<IdentityUser, RegistrationError>
where
    P: IdentityAdmin,
    D: Directory,
{
    let account = normalize_account(account)?;

    let identity = provider.sign_up(&account).await.map_err(|e| match e {
        AuthError::AccountExists => RegistrationError::EmailTaken,
        other => RegistrationError::Identity(other),
    })?;

    let record = UserRecord {
        id: identity.id.clone(),
        name: account.name.clone(),
        email: identity.email.clone(),
        role: account.role,
    };

    if let Err(cause) = directory.insert_user_record(&record).await {
        warn!(user_id = %identity.id, error = %cause, "user record write failed, deleting identity");
        return match provider.delete_user(&identity.id).await {
            Ok(()) => Err(RegistrationError::Record(cause)),
            Err(e) => {
                error!(user_id = %identity.id, error = %e, "failed to delete identity after record write failure");
                Err(RegistrationError::Orphaned {
                    user_id: identity.id,
                    cause,
                })
            }
        };
    }

    info!(user_id = %identity.id, role = %account.role, "registered account");
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityProvider;
    use crate::memory::{MemoryDirectory, MemoryIdentity};

    fn account(email: &str) -> NewAccount {
        NewAccount {
            name: " Kim Minji ".into(),
            email: email.into(),
            password: "password123".into(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn test_register_writes_identity_and_record() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();

        let identity = register_account(&provider, &directory, &account(" Student1@Gmail.com "))
            .await
            .unwrap();

        assert_eq!(identity.email, "student1@gmail.com");
        assert_eq!(identity.metadata.role, Some(Role::Student));
        let record = directory.user_record(&identity.id).unwrap();
        assert_eq!(record.name, "Kim Minji");
        assert_eq!(record.role, Role::Student);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();

        register_account(&provider, &directory, &account("a@gmail.com"))
            .await
            .unwrap();
        let err = register_account(&provider, &directory, &account("a@gmail.com"))
            .await
            .unwrap_err();
        assert_eq!(err, RegistrationError::EmailTaken);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();

        let mut short = account("a@gmail.com");
        short.password = "short".into();
        assert!(matches!(
            register_account(&provider, &directory, &short).await,
            Err(RegistrationError::Invalid(_))
        ));
        assert!(matches!(
            register_account(&provider, &directory, &account("not-an-email")).await,
            Err(RegistrationError::Invalid(_))
        ));
        assert_eq!(provider.identity_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_role_cannot_be_requested() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();

        let mut admin = account("mallory@gmail.com");
        admin.role = Role::Admin;
        assert!(matches!(
            register_account(&provider, &directory, &admin).await,
            Err(RegistrationError::Invalid(_))
        ));
        assert_eq!(provider.identity_count(), 0);

        let mut rep = account("rep@gmail.com");
        rep.role = Role::ClubRepresentative;
        let identity = register_account(&provider, &directory, &rep).await.unwrap();
        assert_eq!(identity.metadata.role, Some(Role::ClubRepresentative));
    }

    #[tokio::test]
    async fn test_record_failure_deletes_identity() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();
        directory.fail_writes(true);

        let err = register_account(&provider, &directory, &account("a@gmail.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Record(_)));
        assert_eq!(provider.identity_count(), 0);
        assert_eq!(
            provider.sign_in_with_password("a@gmail.com", "password123").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_failed_compensation_reports_orphan() {
        let provider = MemoryIdentity::new();
        let directory = MemoryDirectory::new();
        directory.fail_writes(true);
        provider.fail_deletes(true);

        let err = register_account(&provider, &directory, &account("a@gmail.com"))
            .await
            .unwrap_err();

        let RegistrationError::Orphaned { user_id, .. } = err else {
            panic!("expected orphaned registration, got {err:?}");
        };
        assert_eq!(provider.identity_count(), 1);
        assert!(!user_id.is_empty());
    }
}
