//! # wh-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `wh-core` domain models.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;
use wh_core::error::AppError;
use wh_core::models::{Authored, Bird, BirdListing, Comment, Reply, Seed, User};
use wh_core::search::{SearchPlan, SortKey};
use wh_core::traits::{BirdRepo, UserRepo};

pub struct SqliteBirdRepo {
    pool: SqlitePool,
}

impl SqliteBirdRepo {
    /// Connects (creating the file if needed) and applies pending migrations.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("sqlite store ready at {url}");
        Ok(Self { pool })
    }
}

const BIRD_COLUMNS: &str = "b.id AS id, b.species AS species, b.location AS location, \
    b.picture AS picture, b.photographer_comment AS photographer_comment, \
    b.photographer_id AS photographer_id, b.created_at AS created_at, b.modified_at AS modified_at";

fn bird_from_row(row: &SqliteRow) -> sqlx::Result<Bird> {
    Ok(Bird {
        id: row.try_get("id")?,
        species: row.try_get("species")?,
        location: row.try_get("location")?,
        picture: row.try_get("picture")?,
        photographer_comment: row.try_get("photographer_comment")?,
        photographer_id: row.try_get("photographer_id")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn listing_from_row(row: &SqliteRow) -> sqlx::Result<BirdListing> {
    Ok(BirdListing {
        bird: bird_from_row(row)?,
        photographer: row.try_get("photographer")?,
        approved_comments: row.try_get("approved_comments")?,
        seeds: row.try_get("seeds")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> sqlx::Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        bird_id: row.try_get("bird_id")?,
        creator_id: row.try_get("creator_id")?,
        comment: row.try_get("comment")?,
        approved: row.try_get("approved")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn reply_from_row(row: &SqliteRow) -> sqlx::Result<Reply> {
    Ok(Reply {
        id: row.try_get("id")?,
        comment_id: row.try_get("comment_id")?,
        creator_id: row.try_get("creator_id")?,
        reply: row.try_get("reply")?,
        approved: row.try_get("approved")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn seed_from_row(row: &SqliteRow) -> sqlx::Result<Seed> {
    Ok(Seed {
        id: row.try_get("id")?,
        bird_id: row.try_get("bird_id")?,
        seeder_id: row.try_get("seeder_id")?,
        seeded: row.try_get("seeded")?,
    })
}

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile_picture: row.try_get("profile_picture")?,
        about_user: row.try_get("about_user")?,
        created_at: row.try_get("created_at")?,
    })
}

/// The columns a free-text search looks into.
const SEARCHABLE: [&str; 4] = [
    "u.username",
    "b.species",
    "b.photographer_comment",
    "b.location",
];

/// Appends the WHERE clause for a plan. Expects `birds b JOIN users u`.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, plan: &SearchPlan) {
    qb.push(" WHERE 1 = 1");
    if let Some(text) = &plan.text {
        let needle = text.to_ascii_lowercase();
        qb.push(" AND (");
        for (i, column) in SEARCHABLE.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("instr(lower(")
                .push(*column)
                .push("), ")
                .push_bind(needle.clone())
                .push(") > 0");
        }
        qb.push(")");
    }
    if plan.requires_approved_comment() {
        qb.push(" AND EXISTS (SELECT 1 FROM comments c WHERE c.bird_id = b.id AND c.approved = 1)");
    }
}

/// Mirrors `SearchPlan::compare`.
fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::MostApprovedComments => {
            " ORDER BY approved_comments DESC, b.created_at DESC, b.id DESC"
        }
        SortKey::MostSeeds => " ORDER BY seeds DESC, b.created_at DESC, b.id DESC",
        SortKey::Species => " ORDER BY b.species ASC, b.created_at DESC, b.id DESC",
        SortKey::Photographer => " ORDER BY u.username ASC, b.created_at DESC, b.id DESC",
        SortKey::Newest => " ORDER BY b.created_at DESC, b.id DESC",
    }
}

#[async_trait]
impl BirdRepo for SqliteBirdRepo {
    async fn create_bird(&self, bird: Bird) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO birds (id, species, location, picture, photographer_comment, photographer_id, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(bird.id)
            .bind(bird.species)
            .bind(bird.location)
            .bind(bird.picture)
            .bind(bird.photographer_comment)
            .bind(bird.photographer_id)
            .bind(bird.created_at)
            .bind(bird.modified_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_bird(&self, id: Uuid) -> anyhow::Result<Option<Bird>> {
        let row = sqlx::query(&format!("SELECT {BIRD_COLUMNS} FROM birds b WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(bird_from_row).transpose()?)
    }

    async fn update_bird(&self, bird: &Bird) -> anyhow::Result<()> {
        sqlx::query("UPDATE birds SET species = ?, location = ?, photographer_comment = ?, picture = ?, modified_at = ? WHERE id = ?")
            .bind(&bird.species)
            .bind(&bird.location)
            .bind(&bird.photographer_comment)
            .bind(&bird.picture)
            .bind(bird.modified_at)
            .bind(bird.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Comments, replies and seeds go with it through ON DELETE CASCADE.
    async fn delete_bird(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM birds WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn birds_by_photographer(&self, photographer_id: Uuid) -> anyhow::Result<Vec<Bird>> {
        let rows = sqlx::query(&format!(
            "SELECT {BIRD_COLUMNS} FROM birds b WHERE b.photographer_id = ? ORDER BY b.created_at DESC, b.id DESC"
        ))
        .bind(photographer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(bird_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn count_birds(&self, plan: &SearchPlan) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM birds b JOIN users u ON u.id = b.photographer_id",
        );
        push_filters(&mut qb, plan);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }

    async fn search_birds(
        &self,
        plan: &SearchPlan,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<BirdListing>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {BIRD_COLUMNS}, u.username AS photographer, \
             (SELECT COUNT(*) FROM comments c WHERE c.bird_id = b.id AND c.approved = 1) AS approved_comments, \
             (SELECT COUNT(*) FROM seeds s WHERE s.bird_id = b.id) AS seeds \
             FROM birds b JOIN users u ON u.id = b.photographer_id"
        ));
        push_filters(&mut qb, plan);
        qb.push(order_clause(plan.sort));
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(listing_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO comments (id, bird_id, creator_id, comment, approved, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(comment.id)
            .bind(comment.bird_id)
            .bind(comment.creator_id)
            .bind(comment.comment)
            .bind(comment.approved)
            .bind(comment.created_at)
            .bind(comment.modified_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(comment_from_row).transpose()?)
    }

    async fn update_comment(&self, comment: &Comment) -> anyhow::Result<()> {
        sqlx::query("UPDATE comments SET comment = ?, approved = ?, modified_at = ? WHERE id = ?")
            .bind(&comment.comment)
            .bind(comment.approved)
            .bind(comment.modified_at)
            .bind(comment.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, bird_id: Uuid) -> anyhow::Result<Vec<Authored<Comment>>> {
        let rows = sqlx::query(
            "SELECT c.*, u.username AS author FROM comments c JOIN users u ON u.id = c.creator_id \
             WHERE c.bird_id = ? ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(bird_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| {
                Ok(Authored {
                    item: comment_from_row(row)?,
                    author: row.try_get("author")?,
                })
            })
            .collect::<sqlx::Result<_>>()?)
    }

    async fn create_reply(&self, reply: Reply) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO replies (id, comment_id, creator_id, reply, approved, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(reply.id)
            .bind(reply.comment_id)
            .bind(reply.creator_id)
            .bind(reply.reply)
            .bind(reply.approved)
            .bind(reply.created_at)
            .bind(reply.modified_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_reply(&self, id: Uuid) -> anyhow::Result<Option<Reply>> {
        let row = sqlx::query("SELECT * FROM replies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(reply_from_row).transpose()?)
    }

    async fn update_reply(&self, reply: &Reply) -> anyhow::Result<()> {
        sqlx::query("UPDATE replies SET reply = ?, approved = ?, modified_at = ? WHERE id = ?")
            .bind(&reply.reply)
            .bind(reply.approved)
            .bind(reply.modified_at)
            .bind(reply.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_reply(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM replies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_replies(&self, bird_id: Uuid) -> anyhow::Result<Vec<Authored<Reply>>> {
        let rows = sqlx::query(
            "SELECT r.*, u.username AS author FROM replies r \
             JOIN comments c ON c.id = r.comment_id \
             JOIN users u ON u.id = r.creator_id \
             WHERE c.bird_id = ? ORDER BY r.created_at ASC, r.id ASC",
        )
        .bind(bird_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| {
                Ok(Authored {
                    item: reply_from_row(row)?,
                    author: row.try_get("author")?,
                })
            })
            .collect::<sqlx::Result<_>>()?)
    }

    async fn find_seeds(&self, seeder_id: Uuid, species: &str) -> anyhow::Result<Vec<Seed>> {
        let rows = sqlx::query(
            "SELECT s.id, s.bird_id, s.seeder_id, s.seeded FROM seeds s \
             JOIN birds b ON b.id = s.bird_id \
             WHERE s.seeder_id = ? AND b.species = ?",
        )
        .bind(seeder_id)
        .bind(species)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(seed_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn delete_seeds(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM seeds WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn create_seed(&self, seed: Seed) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO seeds (id, seeded, bird_id, seeder_id) VALUES (?, ?, ?, ?)")
            .bind(seed.id)
            .bind(seed.seeded)
            .bind(seed.bird_id)
            .bind(seed.seeder_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_seeds(&self, bird_id: Uuid) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM seeds WHERE bird_id = ?")
            .bind(bird_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl UserRepo for SqliteBirdRepo {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        let result = sqlx::query("INSERT INTO users (id, username, email, password_hash, profile_picture, about_user, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.profile_picture)
            .bind(&user.about_user)
            .bind(user.created_at)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(anyhow::Error::new(
                AppError::Conflict(format!("username {} is taken", user.username)),
            )),
            Err(other) => Err(other.into()),
        }
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET profile_picture = ?, about_user = ? WHERE id = ?")
            .bind(&user.profile_picture)
            .bind(&user.about_user)
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
