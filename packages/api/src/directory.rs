//! Application datastore interface.
//!
//! Reads return `Ok(None)` for "no such row"; an `Err` always means the query
//! itself failed. Implementations live in [`crate::memory`] and, behind the
//! `server` feature, [`crate::db`].

use std::future::Future;

use crate::error::{LookupError, StoreError};
use crate::models::{Club, Profile, UserRecord};

pub trait Directory: Send + Sync + 'static {
    /// Profile keyed by user id.
    fn fetch_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Profile>, LookupError>> + Send;

    /// The club whose `representative_id` equals `user_id`, if any.
    fn fetch_club_by_representative(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Club>, LookupError>> + Send;

    fn insert_user_record(
        &self,
        record: &UserRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create or replace the profile of `user_id`.
    fn upsert_profile(
        &self,
        user_id: &str,
        profile: &Profile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
