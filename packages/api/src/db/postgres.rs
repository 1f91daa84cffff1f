use chrono::{Duration, Utc};
use sqlx::{FromRow, PgPool};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{
    generate_access_token, hash_password, verify_password, IdentityAdmin, IdentityProvider,
    AUTH_EVENT_CAPACITY,
};
use crate::directory::Directory;
use crate::error::{AuthError, LookupError, StoreError};
use crate::models::{
    AuthEvent, Club, IdentityUser, NewAccount, Profile, Session, UserMetadata, UserRecord,
};

/// Row from the `identities` table.
#[derive(Debug, Clone, FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role_hint: Option<String>,
    display_name: Option<String>,
}

impl IdentityRow {
    fn to_identity(&self) -> IdentityUser {
        IdentityUser {
            id: self.id.to_string(),
            email: self.email.clone(),
            metadata: UserMetadata {
                role: self.role_hint.as_deref().and_then(|r| r.parse().ok()),
                name: self.display_name.clone(),
            },
        }
    }
}

fn provider_error(e: sqlx::Error) -> AuthError {
    AuthError::Provider(e.to_string())
}

/// Identity provider backed by the `identities` and `sessions` tables.
#[derive(Debug, Clone)]
pub struct PgIdentity {
    pool: PgPool,
    session_ttl: Duration,
    events: broadcast::Sender<AuthEvent>,
}

impl PgIdentity {
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            pool,
            session_ttl,
            events,
        }
    }
}

impl IdentityProvider for PgIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_lowercase();

        let row: Option<IdentityRow> = sqlx::query_as(
            "SELECT id, email, password_hash, role_hint, display_name FROM identities WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await
        .map_err(provider_error)?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &row.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = generate_access_token();
        sqlx::query("INSERT INTO sessions (token, identity_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&access_token)
            .bind(row.id)
            .bind(Utc::now() + self.session_ttl)
            .execute(&self.pool)
            .await
            .map_err(provider_error)?;

        let session = Session {
            access_token,
            user: row.to_identity(),
        };
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(access_token)
            .execute(&self.pool)
            .await
            .map_err(provider_error)?;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    /// The server has no ambient session; callers always present a token.
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(None)
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<IdentityUser>, AuthError> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.email, i.password_hash, i.role_hint, i.display_name
            FROM sessions s
            JOIN identities i ON i.id = s.identity_id
            WHERE s.token = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(provider_error)?;

        Ok(row.map(|r| r.to_identity()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

impl IdentityAdmin for PgIdentity {
    async fn sign_up(&self, account: &NewAccount) -> Result<IdentityUser, AuthError> {
        let password_hash = hash_password(&account.password)?;

        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            INSERT INTO identities (id, email, password_hash, role_hint, display_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, role_hint, display_name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&password_hash)
        .bind(account.role.as_str())
        .bind(&account.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(provider_error)?;

        row.map(|r| r.to_identity()).ok_or(AuthError::AccountExists)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(());
        };
        sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}

/// Row from the `profiles` table.
#[derive(Debug, Clone, FromRow)]
struct ProfileRow {
    full_name: Option<String>,
    avatar_url: Option<String>,
    department: Option<String>,
    year: Option<i32>,
    bio: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            department: row.department,
            year: row.year,
            bio: row.bio,
        }
    }
}

/// Row from the `clubs` table.
#[derive(Debug, Clone, FromRow)]
struct ClubRow {
    id: Uuid,
    name: String,
    representative_id: Option<Uuid>,
}

impl From<ClubRow> for Club {
    fn from(row: ClubRow) -> Self {
        Club {
            id: row.id.to_string(),
            name: row.name,
            representative_id: row.representative_id.map(|id| id.to_string()),
        }
    }
}

/// Directory backed by the `users`, `profiles` and `clubs` tables.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Directory for PgDirectory {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, LookupError> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(None);
        };
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT full_name, avatar_url, department, year, bio FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LookupError::new("profiles", e.to_string()))?;

        Ok(row.map(Profile::from))
    }

    async fn fetch_club_by_representative(&self, user_id: &str) -> Result<Option<Club>, LookupError> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(None);
        };
        let row: Option<ClubRow> = sqlx::query_as(
            "SELECT id, name, representative_id FROM clubs WHERE representative_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LookupError::new("clubs", e.to_string()))?;

        Ok(row.map(Club::from))
    }

    async fn insert_user_record(&self, record: &UserRecord) -> Result<(), StoreError> {
        let id = Uuid::parse_str(&record.id).map_err(|e| StoreError::new("users", e.to_string()))?;
        sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(record.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::new("users", e.to_string()))?;
        Ok(())
    }

    async fn upsert_profile(&self, user_id: &str, profile: &Profile) -> Result<(), StoreError> {
        let id = Uuid::parse_str(user_id).map_err(|e| StoreError::new("profiles", e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, avatar_url, department, year, bio)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                full_name = $2,
                avatar_url = $3,
                department = $4,
                year = $5,
                bio = $6,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(&profile.department)
        .bind(profile.year)
        .bind(&profile.bio)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::new("profiles", e.to_string()))?;
        Ok(())
    }
}
