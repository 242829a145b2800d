//! # Domain Models
//!
//! These structs represent the core entities of Whistly.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The explicit "who is asking" value threaded through every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Media reference handled by MediaStore
    pub profile_picture: Option<String>,
    pub about_user: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
        }
    }
}

/// A posted photograph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bird {
    pub id: Uuid,
    pub species: String,
    pub location: String,
    /// Media reference handled by MediaStore
    pub picture: String,
    pub photographer_comment: String,
    pub photographer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Bird {
    pub fn new(
        photographer_id: Uuid,
        species: String,
        location: String,
        picture: String,
        photographer_comment: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            species,
            location,
            picture,
            photographer_comment,
            photographer_id,
            created_at: now,
            modified_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub bird_id: Uuid,
    pub creator_id: Uuid,
    pub comment: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub creator_id: Uuid,
    pub reply: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A bookmark of a bird by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub id: Uuid,
    pub bird_id: Uuid,
    pub seeder_id: Uuid,
    /// Legacy flag; the row's existence already means "seeded".
    pub seeded: bool,
}

/// Any record paired with the username of whoever wrote it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authored<T> {
    pub item: T,
    pub author: String,
}

/// A bird row as the listing and search pages see it, with its aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdListing {
    pub bird: Bird,
    pub photographer: String,
    pub approved_comments: i64,
    pub seeds: i64,
}

/// Fields accepted from the add-bird form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBird {
    pub species: String,
    pub location: String,
    pub photographer_comment: String,
}

/// Fields a photographer may change after posting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BirdChanges {
    pub species: String,
    pub location: String,
    pub photographer_comment: String,
}

/// Direction for a 90° picture rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Left,
    Right,
}

impl Rotation {
    /// Parses the `name` query value of the detail page.
    pub fn from_query(name: &str) -> Option<Self> {
        if name.contains("rotate-left") {
            Some(Self::Left)
        } else if name.contains("rotate-right") {
            Some(Self::Right)
        } else {
            None
        }
    }
}

/// What an upload is for; decides the storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Bird,
    ProfilePicture,
}

impl MediaKind {
    pub fn dir(self) -> &'static str {
        match self {
            Self::Bird => "bird",
            Self::ProfilePicture => "profile_pictures",
        }
    }
}
