use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::role::resolve_role;
use crate::auth::{register_account, AuthConfig, IdentityAdmin};
use crate::directory::Directory;
use crate::error::{AuthError, RegistrationError};
use crate::models::{IdentityUser, NewAccount, Session, User};

/// Resolves sessions into users and registers accounts.
///
/// Server-side this is [`DirectoryAccounts`]; clients use an HTTP implementation so
/// that role-relevant rows are never read from the browser.
pub trait AccountService: Send + Sync + 'static {
    /// Run one reconciliation pass for `session`.
    fn resolve_user(&self, session: &Session) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn register(
        &self,
        account: &NewAccount,
    ) -> impl Future<Output = Result<IdentityUser, RegistrationError>> + Send;
}

/// [`AccountService`] backed by an identity provider and a [`Directory`].
#[derive(Debug)]
pub struct DirectoryAccounts<P, D> {
    provider: Arc<P>,
    directory: Arc<D>,
    config: AuthConfig,
}

impl<P, D> Clone for DirectoryAccounts<P, D> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            directory: Arc::clone(&self.directory),
            config: self.config.clone(),
        }
    }
}

impl<P, D> DirectoryAccounts<P, D> {
    pub fn new(provider: Arc<P>, directory: Arc<D>, config: AuthConfig) -> Self {
        Self {
            provider,
            directory,
            config,
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }
}

impl<P, D> AccountService for DirectoryAccounts<P, D>
where
    P: IdentityAdmin,
    D: Directory,
{
    async fn resolve_user(&self, session: &Session) -> Result<User, AuthError> {
        let identity = &session.user;

        let profile = match self.directory.fetch_profile(&identity.id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "profile lookup failed, continuing without profile");
                None
            }
        };

        let club = match self.directory.fetch_club_by_representative(&identity.id).await {
            Ok(club) => club,
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "club lookup failed, treating as no club");
                None
            }
        };

        let (role, club_id) = resolve_role(identity, club.as_ref(), &self.config);
        debug!(user_id = %identity.id, %role, "resolved user");

        Ok(User {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role,
            club_id,
            profile,
        })
    }

    async fn register(&self, account: &NewAccount) -> Result<IdentityUser, RegistrationError> {
        register_account(self.provider.as_ref(), self.directory.as_ref(), account).await
    }
}
