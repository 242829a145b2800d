//! Bird lifecycle: posting, editing, rotating, deleting and the detail view.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Bird, BirdChanges, Identity, MediaKind, NewBird, Rotation};
use crate::moderation::{self, CommentThread};
use crate::seeds;
use crate::traits::{BirdRepo, MediaStore, UserRepo};
use crate::validation;

/// Everything the detail page shows about one bird, as seen by `viewer`.
#[derive(Debug, Clone)]
pub struct BirdDetail {
    pub bird: Bird,
    pub photographer: String,
    pub seeds: i64,
    pub seeded_by_viewer: bool,
    pub threads: Vec<CommentThread>,
}

pub async fn get_bird(repo: &dyn BirdRepo, id: Uuid) -> Result<Bird> {
    repo.get_bird(id)
        .await?
        .ok_or_else(|| AppError::not_found("Bird", id))
}

/// Validates the form and the picture, stores the picture, then the row.
/// The photographer is always the caller.
pub async fn create_bird(
    repo: &dyn BirdRepo,
    store: &dyn MediaStore,
    photographer: &Identity,
    form: NewBird,
    picture: Vec<u8>,
    max_upload_bytes: usize,
) -> Result<Bird> {
    let form = form.validate()?;
    validation::picture(picture.len(), max_upload_bytes)?;
    let media_id = store.save_upload(picture, MediaKind::Bird).await?;

    let bird = Bird::new(
        photographer.user_id,
        form.species,
        form.location,
        media_id,
        form.photographer_comment,
    );
    repo.create_bird(bird.clone()).await?;
    log::info!("bird {} posted by {}", bird.id, photographer.username);
    Ok(bird)
}

/// Applies the editable fields; picture and photographer never change here.
pub async fn update_bird(repo: &dyn BirdRepo, id: Uuid, changes: BirdChanges) -> Result<Bird> {
    let changes = changes.validate()?;
    let mut bird = get_bird(repo, id).await?;
    bird.species = changes.species;
    bird.location = changes.location;
    bird.photographer_comment = changes.photographer_comment;
    bird.modified_at = Utc::now();
    repo.update_bird(&bird).await?;
    Ok(bird)
}

pub async fn delete_bird(repo: &dyn BirdRepo, id: Uuid) -> Result<()> {
    if !repo.delete_bird(id).await? {
        return Err(AppError::not_found("Bird", id));
    }
    log::info!("bird {id} deleted");
    Ok(())
}

/// Rotates the stored picture and points the bird at the rotated copy.
pub async fn rotate_picture(
    repo: &dyn BirdRepo,
    store: &dyn MediaStore,
    id: Uuid,
    rotation: Rotation,
) -> Result<Bird> {
    let mut bird = get_bird(repo, id).await?;
    bird.picture = store.rotate(&bird.picture, rotation).await?;
    bird.modified_at = Utc::now();
    repo.update_bird(&bird).await?;
    log::debug!("bird {} rotated {:?}", bird.id, rotation);
    Ok(bird)
}

pub async fn bird_detail(
    repo: &dyn BirdRepo,
    users: &dyn UserRepo,
    id: Uuid,
    viewer: Option<&Identity>,
) -> Result<BirdDetail> {
    let bird = get_bird(repo, id).await?;
    let photographer = users
        .get_user(bird.photographer_id)
        .await?
        .map(|u| u.username)
        .ok_or_else(|| AppError::not_found("User", bird.photographer_id))?;
    let comments = repo.list_comments(bird.id).await?;
    let replies = repo.list_replies(bird.id).await?;
    let seeds = repo.count_seeds(bird.id).await?;
    let seeded_by_viewer = match viewer {
        Some(v) => seeds::is_seeded(repo, &bird.species, v).await?,
        None => false,
    };
    let threads = moderation::assemble(&bird, comments, replies, viewer);
    Ok(BirdDetail {
        bird,
        photographer,
        seeds,
        seeded_by_viewer,
        threads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Authored, Comment, User};
    use crate::traits::{MockBirdRepo, MockMediaStore, MockUserRepo};

    fn me() -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            username: "ana".into(),
        }
    }

    fn form() -> NewBird {
        NewBird {
            species: "Grey Heron".into(),
            location: "Tagus".into(),
            photographer_comment: "Patient hunter".into(),
        }
    }

    #[tokio::test]
    async fn posting_stores_picture_then_row() {
        let author = me();
        let mut store = MockMediaStore::new();
        store
            .expect_save_upload()
            .withf(|data, kind| data.len() == 3 && *kind == MediaKind::Bird)
            .returning(|_, _| Ok("bird/ab/cd/abcd.png".into()));
        let mut repo = MockBirdRepo::new();
        let owner = author.user_id;
        repo.expect_create_bird()
            .withf(move |b| b.photographer_id == owner && b.picture == "bird/ab/cd/abcd.png")
            .returning(|_| Ok(()));

        let bird = create_bird(&repo, &store, &author, form(), vec![1, 2, 3], 1024)
            .await
            .unwrap();
        assert_eq!(bird.species, "Grey Heron");
    }

    #[tokio::test]
    async fn oversized_pictures_are_rejected_before_storage() {
        let mut store = MockMediaStore::new();
        store.expect_save_upload().never();
        let repo = MockBirdRepo::new();

        let err = create_bird(&repo, &store, &me(), form(), vec![0; 2048], 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "picture", .. }));
    }

    #[tokio::test]
    async fn undecodable_uploads_surface_as_validation_errors() {
        let mut store = MockMediaStore::new();
        store.expect_save_upload().returning(|_, _| {
            Err(anyhow::Error::new(AppError::invalid("picture", "Upload a valid image.")))
        });
        let repo = MockBirdRepo::new();

        let err = create_bird(&repo, &store, &me(), form(), vec![1], 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "picture", .. }));
    }

    #[tokio::test]
    async fn editing_keeps_picture_and_photographer() {
        let original = Bird::new(
            Uuid::now_v7(),
            "Heron".into(),
            "Tagus".into(),
            "bird/h.jpg".into(),
            "old".into(),
        );
        let stored = original.clone();
        let mut repo = MockBirdRepo::new();
        repo.expect_get_bird().returning(move |_| Ok(Some(stored.clone())));
        let expected = original.clone();
        repo.expect_update_bird()
            .withf(move |b| {
                b.picture == expected.picture
                    && b.photographer_id == expected.photographer_id
                    && b.species == "Purple Heron"
            })
            .returning(|_| Ok(()));

        let changes = BirdChanges {
            species: "Purple Heron".into(),
            location: "Tagus".into(),
            photographer_comment: "new".into(),
        };
        let bird = update_bird(&repo, original.id, changes).await.unwrap();
        assert_eq!(bird.photographer_comment, "new");
    }

    #[tokio::test]
    async fn deleting_a_missing_bird_is_not_found() {
        let mut repo = MockBirdRepo::new();
        repo.expect_delete_bird().returning(|_| Ok(false));
        assert!(matches!(
            delete_bird(&repo, Uuid::now_v7()).await,
            Err(AppError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn rotation_repoints_the_picture() {
        let bird = Bird::new(
            Uuid::now_v7(),
            "Heron".into(),
            "Tagus".into(),
            "bird/old.jpg".into(),
            "".into(),
        );
        let stored = bird.clone();
        let mut repo = MockBirdRepo::new();
        repo.expect_get_bird().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_update_bird()
            .withf(|b| b.picture == "bird/new.jpg")
            .returning(|_| Ok(()));
        let mut store = MockMediaStore::new();
        store
            .expect_rotate()
            .withf(|id, rotation| id == "bird/old.jpg" && *rotation == Rotation::Left)
            .returning(|_, _| Ok("bird/new.jpg".into()));

        let rotated = rotate_picture(&repo, &store, bird.id, Rotation::Left).await.unwrap();
        assert_eq!(rotated.picture, "bird/new.jpg");
    }

    #[tokio::test]
    async fn detail_hides_pending_comments_from_strangers() {
        let owner = me();
        let bird = Bird::new(
            owner.user_id,
            "Heron".into(),
            "Tagus".into(),
            "bird/h.jpg".into(),
            "".into(),
        );
        let now = Utc::now();
        let pending = Comment {
            id: Uuid::now_v7(),
            bird_id: bird.id,
            creator_id: Uuid::now_v7(),
            comment: "pending".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        let approved = Comment {
            id: Uuid::now_v7(),
            approved: true,
            comment: "approved".into(),
            ..pending.clone()
        };

        let stored = bird.clone();
        let mut repo = MockBirdRepo::new();
        repo.expect_get_bird().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_list_comments().returning(move |_| {
            Ok(vec![
                Authored { item: approved.clone(), author: "c".into() },
                Authored { item: pending.clone(), author: "c".into() },
            ])
        });
        repo.expect_list_replies().returning(|_| Ok(Vec::new()));
        repo.expect_count_seeds().returning(|_| Ok(4));
        repo.expect_find_seeds().returning(|_, _| Ok(Vec::new()));

        let photographer_id = owner.user_id;
        let mut users = MockUserRepo::new();
        users.expect_get_user().returning(move |_| {
            Ok(Some(User {
                id: photographer_id,
                username: "ana".into(),
                email: "ana@example.com".into(),
                password_hash: String::new(),
                profile_picture: None,
                about_user: String::new(),
                created_at: Utc::now(),
            }))
        });

        let stranger = Identity {
            user_id: Uuid::now_v7(),
            username: "s".into(),
        };
        let detail = bird_detail(&repo, &users, bird.id, Some(&stranger)).await.unwrap();
        assert_eq!(detail.photographer, "ana");
        assert_eq!(detail.seeds, 4);
        assert!(!detail.seeded_by_viewer);
        assert_eq!(detail.threads.len(), 1);

        let as_owner = bird_detail(&repo, &users, bird.id, Some(&owner)).await.unwrap();
        assert_eq!(as_owner.threads.len(), 2);
    }
}
