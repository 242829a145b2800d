//! # Moderation
//!
//! Comments and replies start out pending unless their author is trusted
//! for that thread:
//!
//! * a comment is trusted when written by the bird's photographer;
//! * a reply is trusted when written by the comment's author or by the
//!   bird's photographer.
//!
//! Pending entries stay hidden from everyone except the people who can act
//! on them until someone approves them.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Authored, Bird, Comment, Identity, Reply};
use crate::traits::BirdRepo;
use crate::validation;

pub fn comment_auto_approved(bird: &Bird, author: &Identity) -> bool {
    author.user_id == bird.photographer_id
}

pub fn reply_auto_approved(bird: &Bird, comment: &Comment, author: &Identity) -> bool {
    author.user_id == comment.creator_id || author.user_id == bird.photographer_id
}

pub async fn submit_comment(
    repo: &dyn BirdRepo,
    bird_id: Uuid,
    author: &Identity,
    text: &str,
) -> Result<Comment> {
    let text = validation::comment_text(text)?;
    let bird = repo
        .get_bird(bird_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bird", bird_id))?;

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::now_v7(),
        bird_id: bird.id,
        creator_id: author.user_id,
        comment: text,
        approved: comment_auto_approved(&bird, author),
        created_at: now,
        modified_at: now,
    };
    repo.create_comment(comment.clone()).await?;
    log::info!(
        "comment {} by {} on bird {} (approved: {})",
        comment.id,
        author.username,
        bird.id,
        comment.approved
    );
    Ok(comment)
}

pub async fn submit_reply(
    repo: &dyn BirdRepo,
    comment_id: Uuid,
    author: &Identity,
    text: &str,
) -> Result<Reply> {
    let text = validation::reply_text(text)?;
    let comment = repo
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment", comment_id))?;
    let bird = repo
        .get_bird(comment.bird_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bird", comment.bird_id))?;

    let now = Utc::now();
    let reply = Reply {
        id: Uuid::now_v7(),
        comment_id: comment.id,
        creator_id: author.user_id,
        reply: text,
        approved: reply_auto_approved(&bird, &comment, author),
        created_at: now,
        modified_at: now,
    };
    repo.create_reply(reply.clone()).await?;
    log::info!(
        "reply {} by {} on comment {} (approved: {})",
        reply.id,
        author.username,
        comment.id,
        reply.approved
    );
    Ok(reply)
}

/// A comment or a reply, addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discussion {
    Comment(Uuid),
    Reply(Uuid),
}

/// The target entry plus everything above it.
#[derive(Debug, Clone)]
pub struct DiscussionContext {
    pub bird: Bird,
    pub comment: Comment,
    pub reply: Option<Reply>,
}

impl DiscussionContext {
    /// Who may approve the entry.
    pub fn moderators(&self) -> Vec<Uuid> {
        match &self.reply {
            None => vec![self.bird.photographer_id],
            Some(_) => vec![self.bird.photographer_id, self.comment.creator_id],
        }
    }

    /// Who may delete the entry: its moderators and its author.
    pub fn removers(&self) -> Vec<Uuid> {
        let mut ids = self.moderators();
        ids.push(self.author());
        ids
    }

    pub fn author(&self) -> Uuid {
        match &self.reply {
            Some(reply) => reply.creator_id,
            None => self.comment.creator_id,
        }
    }

    pub fn text(&self) -> &str {
        match &self.reply {
            Some(reply) => &reply.reply,
            None => &self.comment.comment,
        }
    }
}

pub async fn load(repo: &dyn BirdRepo, target: Discussion) -> Result<DiscussionContext> {
    let (comment_id, reply) = match target {
        Discussion::Comment(id) => (id, None),
        Discussion::Reply(id) => {
            let reply = repo
                .get_reply(id)
                .await?
                .ok_or_else(|| AppError::not_found("Reply", id))?;
            (reply.comment_id, Some(reply))
        }
    };
    let comment = repo
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment", comment_id))?;
    let bird = repo
        .get_bird(comment.bird_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bird", comment.bird_id))?;
    Ok(DiscussionContext {
        bird,
        comment,
        reply,
    })
}

/// Marks the entry approved and returns the bird to show next.
pub async fn approve(repo: &dyn BirdRepo, target: Discussion) -> Result<Uuid> {
    let ctx = load(repo, target).await?;
    let now = Utc::now();
    match ctx.reply {
        Some(mut reply) => {
            reply.approved = true;
            reply.modified_at = now;
            repo.update_reply(&reply).await?;
        }
        None => {
            let mut comment = ctx.comment;
            comment.approved = true;
            comment.modified_at = now;
            repo.update_comment(&comment).await?;
        }
    }
    log::info!("{target:?} approved");
    Ok(ctx.bird.id)
}

/// Deletes the entry (and a comment's replies) and returns the bird to show next.
pub async fn remove(repo: &dyn BirdRepo, target: Discussion) -> Result<Uuid> {
    let ctx = load(repo, target).await?;
    let removed = match target {
        Discussion::Comment(id) => repo.delete_comment(id).await?,
        Discussion::Reply(id) => repo.delete_reply(id).await?,
    };
    if !removed {
        return Err(match target {
            Discussion::Comment(id) => AppError::not_found("Comment", id),
            Discussion::Reply(id) => AppError::not_found("Reply", id),
        });
    }
    log::info!("{target:?} removed");
    Ok(ctx.bird.id)
}

/// Replaces the entry's text; the approval state is left alone.
pub async fn edit(repo: &dyn BirdRepo, target: Discussion, text: &str) -> Result<Uuid> {
    let ctx = load(repo, target).await?;
    let now = Utc::now();
    match ctx.reply {
        Some(mut reply) => {
            reply.reply = validation::reply_text(text)?;
            reply.modified_at = now;
            repo.update_reply(&reply).await?;
        }
        None => {
            let mut comment = ctx.comment;
            comment.comment = validation::comment_text(text)?;
            comment.modified_at = now;
            repo.update_comment(&comment).await?;
        }
    }
    Ok(ctx.bird.id)
}

/// A comment with the replies the viewer may see.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub comment: Authored<Comment>,
    pub replies: Vec<Authored<Reply>>,
}

pub fn comment_visible(bird: &Bird, comment: &Comment, viewer: Option<&Identity>) -> bool {
    comment.approved
        || viewer.is_some_and(|v| v.user_id == bird.photographer_id || v.user_id == comment.creator_id)
}

pub fn reply_visible(
    bird: &Bird,
    comment: &Comment,
    reply: &Reply,
    viewer: Option<&Identity>,
) -> bool {
    reply.approved
        || viewer.is_some_and(|v| {
            v.user_id == bird.photographer_id
                || v.user_id == comment.creator_id
                || v.user_id == reply.creator_id
        })
}

/// Groups replies under their comments, dropping what the viewer may not see.
/// Comment order is kept as given; replies keep their relative order.
pub fn assemble(
    bird: &Bird,
    comments: Vec<Authored<Comment>>,
    replies: Vec<Authored<Reply>>,
    viewer: Option<&Identity>,
) -> Vec<CommentThread> {
    let mut threads: Vec<CommentThread> = comments
        .into_iter()
        .filter(|c| comment_visible(bird, &c.item, viewer))
        .map(|comment| CommentThread {
            comment,
            replies: Vec::new(),
        })
        .collect();
    for reply in replies {
        if let Some(thread) = threads
            .iter_mut()
            .find(|t| t.comment.item.id == reply.item.comment_id)
        {
            if reply_visible(bird, &thread.comment.item, &reply.item, viewer) {
                thread.replies.push(reply);
            }
        }
    }
    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockBirdRepo;
    use std::sync::{Arc, Mutex};

    fn user(name: &str) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            username: name.into(),
        }
    }

    fn bird_of(owner: &Identity) -> Bird {
        Bird::new(
            owner.user_id,
            "Grey Heron".into(),
            "Tagus".into(),
            "bird/heron.jpg".into(),
            "patient".into(),
        )
    }

    /// A mock that stores what it is given, enough for the whole flow.
    #[derive(Default)]
    struct Rows {
        comments: Vec<Comment>,
        replies: Vec<Reply>,
    }

    fn repo_with(bird: Bird) -> (MockBirdRepo, Arc<Mutex<Rows>>) {
        let rows = Arc::new(Mutex::new(Rows::default()));
        let mut repo = MockBirdRepo::new();

        let b = bird.clone();
        repo.expect_get_bird()
            .returning(move |id| Ok((id == b.id).then(|| b.clone())));

        let r = rows.clone();
        repo.expect_create_comment().returning(move |c| {
            r.lock().unwrap().comments.push(c);
            Ok(())
        });
        let r = rows.clone();
        repo.expect_get_comment().returning(move |id| {
            Ok(r.lock().unwrap().comments.iter().find(|c| c.id == id).cloned())
        });
        let r = rows.clone();
        repo.expect_update_comment().returning(move |c| {
            let mut rows = r.lock().unwrap();
            if let Some(slot) = rows.comments.iter_mut().find(|x| x.id == c.id) {
                *slot = c.clone();
            }
            Ok(())
        });
        let r = rows.clone();
        repo.expect_create_reply().returning(move |reply| {
            r.lock().unwrap().replies.push(reply);
            Ok(())
        });
        let r = rows.clone();
        repo.expect_get_reply().returning(move |id| {
            Ok(r.lock().unwrap().replies.iter().find(|x| x.id == id).cloned())
        });
        let r = rows.clone();
        repo.expect_update_reply().returning(move |reply| {
            let mut rows = r.lock().unwrap();
            if let Some(slot) = rows.replies.iter_mut().find(|x| x.id == reply.id) {
                *slot = reply.clone();
            }
            Ok(())
        });
        (repo, rows)
    }

    #[tokio::test]
    async fn photographer_comments_are_approved_immediately() {
        let owner = user("a");
        let bird = bird_of(&owner);
        let (repo, _) = repo_with(bird.clone());

        let comment = submit_comment(&repo, bird.id, &owner, "my own shot").await.unwrap();
        assert!(comment.approved);
    }

    #[tokio::test]
    async fn other_comments_wait_for_approval() {
        let owner = user("a");
        let bird = bird_of(&owner);
        let (repo, _) = repo_with(bird.clone());

        let comment = submit_comment(&repo, bird.id, &user("c"), "nice shot").await.unwrap();
        assert!(!comment.approved);
    }

    #[tokio::test]
    async fn commenting_on_a_missing_bird_is_not_found() {
        let owner = user("a");
        let (repo, _) = repo_with(bird_of(&owner));

        let err = submit_comment(&repo, Uuid::now_v7(), &owner, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(kind, _) if kind == "Bird"));
    }

    #[tokio::test]
    async fn overlong_comments_never_reach_the_repository() {
        let mut repo = MockBirdRepo::new();
        repo.expect_get_bird().never();
        repo.expect_create_comment().never();

        let err = submit_comment(&repo, Uuid::now_v7(), &user("c"), &"x".repeat(601))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "comment", .. }));
    }

    #[tokio::test]
    async fn approval_flow_end_to_end() {
        let a = user("a");
        let c = user("c");
        let d = user("d");
        let bird = bird_of(&a);
        let (repo, rows) = repo_with(bird.clone());

        let comment = submit_comment(&repo, bird.id, &c, "nice shot").await.unwrap();
        assert!(!comment.approved);

        let target_bird = approve(&repo, Discussion::Comment(comment.id)).await.unwrap();
        assert_eq!(target_bird, bird.id);
        assert!(rows.lock().unwrap().comments[0].approved);

        let thanks = submit_reply(&repo, comment.id, &d, "thanks").await.unwrap();
        assert!(!thanks.approved);

        let agreed = submit_reply(&repo, comment.id, &c, "agreed").await.unwrap();
        assert!(agreed.approved);

        let from_owner = submit_reply(&repo, comment.id, &a, "cheers").await.unwrap();
        assert!(from_owner.approved);

        approve(&repo, Discussion::Reply(thanks.id)).await.unwrap();
        assert!(rows.lock().unwrap().replies.iter().all(|r| r.approved));
    }

    #[tokio::test]
    async fn removing_returns_the_owning_bird() {
        let a = user("a");
        let bird = bird_of(&a);
        let (mut repo, _) = repo_with(bird.clone());
        repo.expect_delete_reply().returning(|_| Ok(true));

        let comment = submit_comment(&repo, bird.id, &a, "first").await.unwrap();
        let reply = submit_reply(&repo, comment.id, &user("z"), "second").await.unwrap();
        assert_eq!(remove(&repo, Discussion::Reply(reply.id)).await.unwrap(), bird.id);
    }

    #[tokio::test]
    async fn editing_keeps_the_approval_state() {
        let a = user("a");
        let c = user("c");
        let bird = bird_of(&a);
        let (repo, rows) = repo_with(bird.clone());

        let comment = submit_comment(&repo, bird.id, &c, "nice shot").await.unwrap();
        edit(&repo, Discussion::Comment(comment.id), "very nice shot").await.unwrap();

        let stored = rows.lock().unwrap().comments[0].clone();
        assert_eq!(stored.comment, "very nice shot");
        assert!(!stored.approved);
    }

    #[test]
    fn moderators_and_removers() {
        let a = user("a");
        let c = user("c");
        let d = user("d");
        let bird = bird_of(&a);
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::now_v7(),
            bird_id: bird.id,
            creator_id: c.user_id,
            comment: "nice".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        let reply = Reply {
            id: Uuid::now_v7(),
            comment_id: comment.id,
            creator_id: d.user_id,
            reply: "thanks".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };

        let on_comment = DiscussionContext {
            bird: bird.clone(),
            comment: comment.clone(),
            reply: None,
        };
        assert_eq!(on_comment.moderators(), vec![a.user_id]);
        assert_eq!(on_comment.removers(), vec![a.user_id, c.user_id]);

        let on_reply = DiscussionContext {
            bird,
            comment,
            reply: Some(reply),
        };
        assert_eq!(on_reply.moderators(), vec![a.user_id, c.user_id]);
        assert!(on_reply.removers().contains(&d.user_id));
        assert_eq!(on_reply.text(), "thanks");
    }

    #[test]
    fn pending_entries_are_hidden_from_bystanders() {
        let a = user("a");
        let c = user("c");
        let d = user("d");
        let stranger = user("s");
        let bird = bird_of(&a);
        let now = Utc::now();
        let pending = Comment {
            id: Uuid::now_v7(),
            bird_id: bird.id,
            creator_id: c.user_id,
            comment: "pending".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        let reply = Reply {
            id: Uuid::now_v7(),
            comment_id: pending.id,
            creator_id: d.user_id,
            reply: "also pending".into(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        let comments = vec![Authored {
            item: pending,
            author: "c".into(),
        }];
        let replies = vec![Authored {
            item: reply,
            author: "d".into(),
        }];

        assert!(assemble(&bird, comments.clone(), replies.clone(), Some(&stranger)).is_empty());
        assert!(assemble(&bird, comments.clone(), replies.clone(), None).is_empty());

        let for_owner = assemble(&bird, comments.clone(), replies.clone(), Some(&a));
        assert_eq!(for_owner.len(), 1);
        assert_eq!(for_owner[0].replies.len(), 1);

        let for_commenter = assemble(&bird, comments, replies, Some(&c));
        assert_eq!(for_commenter[0].replies.len(), 1);
    }
}
