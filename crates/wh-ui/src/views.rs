//! Flat view models: everything a template needs is precomputed here so the
//! templates only print values and test booleans.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wh_core::birds::BirdDetail;
use wh_core::error::AppError;
use wh_core::models::{Bird, BirdListing, Identity, User};
use wh_core::moderation::CommentThread;
use wh_core::pagination::Page;
use wh_core::traits::MediaStore;

fn posted(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %H:%M").to_string()
}

#[derive(Debug, Clone)]
pub struct NavUser {
    pub id: Uuid,
    pub username: String,
}

/// The account links shown in the header.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user: Option<NavUser>,
}

impl Nav {
    pub fn for_viewer(viewer: Option<&Identity>) -> Self {
        Self {
            user: viewer.map(|v| NavUser {
                id: v.user_id,
                username: v.username.clone(),
            }),
        }
    }
}

/// At most one field-level message, as produced by a failed validation.
#[derive(Debug, Clone, Default)]
pub struct FieldError {
    field: Option<String>,
    message: String,
}

impl FieldError {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Picks the field message out of a validation error.
    pub fn from_app(err: &AppError) -> Option<Self> {
        match err {
            AppError::ValidationError { field, message } => Some(Self::new(field, message.clone())),
            _ => None,
        }
    }

    pub fn on(&self, field: &str) -> Option<&str> {
        match &self.field {
            Some(f) if f == field => Some(&self.message),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.field.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct BirdCard {
    pub id: Uuid,
    pub species: String,
    pub location: String,
    pub photographer: String,
    pub thumbnail_url: String,
    pub approved_comments: i64,
    pub seeds: i64,
    pub posted: String,
}

impl BirdCard {
    pub fn from_listing(listing: &BirdListing, store: &dyn MediaStore) -> Self {
        Self {
            approved_comments: listing.approved_comments,
            seeds: listing.seeds,
            ..Self::from_bird(&listing.bird, &listing.photographer, store)
        }
    }

    pub fn from_bird(bird: &Bird, photographer: &str, store: &dyn MediaStore) -> Self {
        Self {
            id: bird.id,
            species: bird.species.clone(),
            location: bird.location.clone(),
            photographer: photographer.to_string(),
            thumbnail_url: store.get_thumbnail_url(&bird.picture),
            approved_comments: 0,
            seeds: 0,
            posted: posted(bird.created_at),
        }
    }
}

/// Previous/next links that keep the other query parameters.
#[derive(Debug, Clone)]
pub struct Pager {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub paginated: bool,
    pub first_url: String,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
    pub last_url: String,
}

impl Pager {
    pub fn new<T>(page: &Page<T>, path: &str, params: &[(&str, &str)]) -> Self {
        let url = |number: &str| {
            let mut pairs: Vec<(&str, &str)> = params
                .iter()
                .copied()
                .filter(|(_, value)| !value.is_empty())
                .collect();
            pairs.push(("page", number));
            match serde_urlencoded::to_string(&pairs) {
                Ok(query) => format!("{path}?{query}"),
                Err(_) => path.to_string(),
            }
        };
        Self {
            number: page.number,
            num_pages: page.num_pages(),
            total: page.total,
            paginated: page.is_paginated(),
            first_url: url("1"),
            previous_url: page
                .has_previous()
                .then(|| url(&page.previous_page_number().to_string())),
            next_url: page
                .has_next()
                .then(|| url(&page.next_page_number().to_string())),
            last_url: url("last"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BirdView {
    pub id: Uuid,
    pub species: String,
    pub location: String,
    pub photographer: String,
    pub photographer_id: Uuid,
    pub photographer_comment: String,
    pub picture_url: String,
    pub posted: String,
    pub seeds: i64,
    pub seeded: bool,
    pub is_owner: bool,
}

#[derive(Debug, Clone)]
pub struct ReplyView {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    pub posted: String,
    pub pending: bool,
    pub can_approve: bool,
    pub can_remove: bool,
    pub can_edit: bool,
}

#[derive(Debug, Clone)]
pub struct ThreadView {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    pub posted: String,
    pub pending: bool,
    pub can_approve: bool,
    pub can_remove: bool,
    pub can_edit: bool,
    pub replies: Vec<ReplyView>,
}

impl ThreadView {
    fn build(bird: &Bird, thread: &CommentThread, viewer: Option<&Identity>) -> Self {
        let me = viewer.map(|v| v.user_id);
        let comment = &thread.comment.item;
        let is_bird_owner = me == Some(bird.photographer_id);
        let is_comment_author = me == Some(comment.creator_id);

        let replies = thread
            .replies
            .iter()
            .map(|reply| {
                let is_reply_author = me == Some(reply.item.creator_id);
                let moderates = is_bird_owner || is_comment_author;
                ReplyView {
                    id: reply.item.id,
                    author: reply.author.clone(),
                    text: reply.item.reply.clone(),
                    posted: posted(reply.item.created_at),
                    pending: !reply.item.approved,
                    can_approve: moderates && !reply.item.approved,
                    can_remove: moderates || is_reply_author,
                    can_edit: is_reply_author,
                }
            })
            .collect();

        Self {
            id: comment.id,
            author: thread.comment.author.clone(),
            text: comment.comment.clone(),
            posted: posted(comment.created_at),
            pending: !comment.approved,
            can_approve: is_bird_owner && !comment.approved,
            can_remove: is_bird_owner || is_comment_author,
            can_edit: is_comment_author,
            replies,
        }
    }
}

/// Builds the bird and discussion views for the detail page.
pub fn detail_views(
    detail: &BirdDetail,
    viewer: Option<&Identity>,
    store: &dyn MediaStore,
) -> (BirdView, Vec<ThreadView>) {
    let bird = &detail.bird;
    let view = BirdView {
        id: bird.id,
        species: bird.species.clone(),
        location: bird.location.clone(),
        photographer: detail.photographer.clone(),
        photographer_id: bird.photographer_id,
        photographer_comment: bird.photographer_comment.clone(),
        picture_url: store.get_url(&bird.picture),
        posted: posted(bird.created_at),
        seeds: detail.seeds,
        seeded: detail.seeded_by_viewer,
        is_owner: viewer.is_some_and(|v| v.user_id == bird.photographer_id),
    };
    let threads = detail
        .threads
        .iter()
        .map(|t| ThreadView::build(bird, t, viewer))
        .collect();
    (view, threads)
}

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub about_user: String,
    pub picture_url: Option<String>,
    pub joined: String,
    pub is_self: bool,
}

impl ProfileView {
    pub fn new(user: &User, viewer: Option<&Identity>, store: &dyn MediaStore) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            about_user: user.about_user.clone(),
            picture_url: user.profile_picture.as_deref().map(|p| store.get_thumbnail_url(p)),
            joined: posted(user.created_at),
            is_self: viewer.is_some_and(|v| v.user_id == user.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wh_core::models::{Authored, Comment, Reply};
    use wh_core::traits::MockMediaStore;

    fn identity(name: &str) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            username: name.into(),
        }
    }

    #[test]
    fn pager_links_keep_the_query() {
        let page = Page {
            items: vec![(); 10],
            number: 2,
            page_size: 10,
            total: 35,
        };
        let pager = Pager::new(&page, "/search/", &[("q", "grey heron"), ("order_by", "")]);
        assert_eq!(pager.num_pages, 4);
        assert_eq!(pager.previous_url.as_deref(), Some("/search/?q=grey+heron&page=1"));
        assert_eq!(pager.next_url.as_deref(), Some("/search/?q=grey+heron&page=3"));
        assert_eq!(pager.last_url, "/search/?q=grey+heron&page=last");
    }

    #[test]
    fn field_errors_only_match_their_field() {
        let err = FieldError::from_app(&AppError::invalid("species", "This field is required."))
            .unwrap();
        assert_eq!(err.on("species"), Some("This field is required."));
        assert_eq!(err.on("location"), None);
        assert!(FieldError::from_app(&AppError::Unauthenticated).is_none());
    }

    #[test]
    fn moderation_buttons_follow_roles() {
        let owner = identity("a");
        let commenter = identity("c");
        let replier = identity("d");
        let bird = Bird::new(owner.user_id, "Heron".into(), "Tagus".into(), "bird/h.jpg".into(), "".into());
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::now_v7(),
            bird_id: bird.id,
            creator_id: commenter.user_id,
            comment: "nice".into(),
            approved: true,
            created_at: now,
            modified_at: now,
        };
        let reply = Reply {
            id: Uuid::now_v7(),
            comment_id: comment.id,
            creator_id: replier.user_id,
            reply: "thanks".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        let thread = CommentThread {
            comment: Authored { item: comment, author: "c".into() },
            replies: vec![Authored { item: reply, author: "d".into() }],
        };

        let as_commenter = ThreadView::build(&bird, &thread, Some(&commenter));
        assert!(as_commenter.can_edit);
        assert!(!as_commenter.can_approve);
        assert!(as_commenter.replies[0].can_approve);
        assert!(!as_commenter.replies[0].can_edit);

        let as_replier = ThreadView::build(&bird, &thread, Some(&replier));
        assert!(!as_replier.can_remove);
        assert!(as_replier.replies[0].can_remove);
        assert!(as_replier.replies[0].can_edit);
        assert!(!as_replier.replies[0].can_approve);
    }

    #[test]
    fn cards_use_thumbnails() {
        let mut store = MockMediaStore::new();
        store
            .expect_get_thumbnail_url()
            .returning(|id| format!("/media/thumb/{id}"));
        let bird = Bird::new(Uuid::now_v7(), "Heron".into(), "Tagus".into(), "bird/h.jpg".into(), "".into());
        let listing = BirdListing {
            bird,
            photographer: "ana".into(),
            approved_comments: 2,
            seeds: 5,
        };
        let card = BirdCard::from_listing(&listing, &store);
        assert_eq!(card.thumbnail_url, "/media/thumb/bird/h.jpg");
        assert_eq!(card.seeds, 5);
        assert_eq!(card.photographer, "ana");
    }
}
