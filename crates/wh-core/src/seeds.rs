//! # Seeds
//!
//! A seed is a user's bookmark on a bird. Pressing the seed button flips the
//! bookmark: existing seeds are removed, otherwise one is planted.
//!
//! Existing seeds are looked up by the bird's *species*, not its id, so two
//! birds of the same species share one bookmark slot per user. The lookup
//! and the write are separate statements; two simultaneous toggles can both
//! plant a seed.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Identity, Seed};
use crate::traits::BirdRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeedAction {
    Added,
    Removed,
}

pub async fn toggle_seed(repo: &dyn BirdRepo, bird_id: Uuid, user: &Identity) -> Result<SeedAction> {
    let bird = repo
        .get_bird(bird_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bird", bird_id))?;

    let existing = repo.find_seeds(user.user_id, &bird.species).await?;
    let action = if existing.is_empty() {
        repo.create_seed(Seed {
            id: Uuid::now_v7(),
            bird_id: bird.id,
            seeder_id: user.user_id,
            seeded: true,
        })
        .await?;
        SeedAction::Added
    } else {
        let ids: Vec<Uuid> = existing.iter().map(|s| s.id).collect();
        repo.delete_seeds(&ids).await?;
        SeedAction::Removed
    };
    log::info!("{} {:?} seed on bird {}", user.username, action, bird.id);
    Ok(action)
}

/// Whether the seed button should render as pressed for this user.
pub async fn is_seeded(repo: &dyn BirdRepo, species: &str, user: &Identity) -> Result<bool> {
    Ok(!repo.find_seeds(user.user_id, species).await?.is_empty())
}
