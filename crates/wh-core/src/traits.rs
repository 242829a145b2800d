//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use crate::models::{
    Authored, Bird, BirdListing, Comment, MediaKind, Reply, Rotation, Seed, User,
};
use crate::search::SearchPlan;
use async_trait::async_trait;
use uuid::Uuid;

/// Data persistence contract for birds and everything hanging off them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BirdRepo: Send + Sync {
    // Bird Operations
    async fn create_bird(&self, bird: Bird) -> anyhow::Result<()>;
    async fn get_bird(&self, id: Uuid) -> anyhow::Result<Option<Bird>>;
    /// Persists species, location, photographer_comment, picture and modified_at.
    async fn update_bird(&self, bird: &Bird) -> anyhow::Result<()>;
    /// Deletes the bird together with its comments, replies and seeds.
    async fn delete_bird(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn birds_by_photographer(&self, photographer_id: Uuid) -> anyhow::Result<Vec<Bird>>;

    // Search Operations
    async fn count_birds(&self, plan: &SearchPlan) -> anyhow::Result<i64>;
    async fn search_birds(
        &self,
        plan: &SearchPlan,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<BirdListing>>;

    // Comment Operations
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    /// Persists text, approved flag and modified_at.
    async fn update_comment(&self, comment: &Comment) -> anyhow::Result<()>;
    /// Deletes the comment together with its replies.
    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Newest first.
    async fn list_comments(&self, bird_id: Uuid) -> anyhow::Result<Vec<Authored<Comment>>>;

    // Reply Operations
    async fn create_reply(&self, reply: Reply) -> anyhow::Result<()>;
    async fn get_reply(&self, id: Uuid) -> anyhow::Result<Option<Reply>>;
    async fn update_reply(&self, reply: &Reply) -> anyhow::Result<()>;
    async fn delete_reply(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Every reply under any comment of the bird, oldest first.
    async fn list_replies(&self, bird_id: Uuid) -> anyhow::Result<Vec<Authored<Reply>>>;

    // Seed Operations
    /// Seeds owned by `seeder_id` whose bird has exactly this species.
    async fn find_seeds(&self, seeder_id: Uuid, species: &str) -> anyhow::Result<Vec<Seed>>;
    async fn delete_seeds(&self, ids: &[Uuid]) -> anyhow::Result<u64>;
    async fn create_seed(&self, seed: Seed) -> anyhow::Result<()>;
    async fn count_seeds(&self, bird_id: Uuid) -> anyhow::Result<i64>;
}

/// Account persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with a wrapped `AppError::Conflict` when the username is taken.
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Persists profile_picture and about_user.
    async fn update_user(&self, user: &User) -> anyhow::Result<()>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    /// Deletes the account and everything it owns.
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Media storage contract for handling uploads and thumbnails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns a media reference for the owning row.
    /// Undecodable data fails with a wrapped `AppError::ValidationError`.
    async fn save_upload(&self, data: Vec<u8>, kind: MediaKind) -> anyhow::Result<String>;
    /// Rotates a stored picture by 90° and returns the reference of the result.
    async fn rotate(&self, media_id: &str, rotation: Rotation) -> anyhow::Result<String>;
    /// Returns the URL or path to the original media.
    fn get_url(&self, media_id: &str) -> String;
    /// Returns the URL or path to the thumbnail.
    fn get_thumbnail_url(&self, media_id: &str) -> String;
}

/// Credential and session contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies if a provided password matches a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Produces an opaque session token bound to the user.
    fn issue_session(&self, user_id: Uuid) -> String;

    /// Returns the user a token was issued for, if the token is genuine.
    fn verify_session(&self, token: &str) -> Option<Uuid>;
}
