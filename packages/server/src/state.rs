use std::sync::Arc;

use api::auth::AuthConfig;
use api::reconcile::DirectoryAccounts;

/// Shared handler state: the identity backend, the directory, and the resolver over both.
pub struct AppState<P, D> {
    pub accounts: DirectoryAccounts<P, D>,
}

impl<P, D> Clone for AppState<P, D> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
        }
    }
}

impl<P, D> AppState<P, D> {
    pub fn new(provider: Arc<P>, directory: Arc<D>, config: AuthConfig) -> Self {
        Self {
            accounts: DirectoryAccounts::new(provider, directory, config),
        }
    }

    pub fn provider(&self) -> &P {
        self.accounts.provider()
    }

    pub fn directory(&self) -> &D {
        self.accounts.directory()
    }
}
