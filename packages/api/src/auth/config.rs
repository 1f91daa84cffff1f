//! Role-resolution policy configuration.

/// Email suffix reserved for platform administrators.
pub const DEFAULT_ADMIN_EMAIL_SUFFIX: &str = "@cluby.com";

/// Auth policy shared by the reconciler and the identity backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Emails ending with this suffix resolve to the admin role.
    pub admin_email_suffix: String,
}

impl AuthConfig {
    pub fn new(admin_email_suffix: impl Into<String>) -> Self {
        Self {
            admin_email_suffix: admin_email_suffix.into().to_lowercase(),
        }
    }

    /// Whether `email` belongs to the reserved admin domain.
    pub fn is_admin_email(&self, email: &str) -> bool {
        !self.admin_email_suffix.is_empty()
            && email.trim().to_lowercase().ends_with(&self.admin_email_suffix)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_EMAIL_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_suffix_is_case_insensitive() {
        let config = AuthConfig::default();
        assert!(config.is_admin_email("admin@cluby.com"));
        assert!(config.is_admin_email("Ops@Cluby.COM"));
        assert!(!config.is_admin_email("admin@cluby.com.evil.org"));
        assert!(!config.is_admin_email("student1@gmail.com"));
    }

    #[test]
    fn test_empty_suffix_never_matches() {
        assert!(!AuthConfig::new("").is_admin_email("anyone@cluby.com"));
    }
}
