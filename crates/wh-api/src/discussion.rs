//! Approving, removing and editing comments and replies.
//!
//! Comment routes receive a comment id and reply routes a reply id; every
//! action ends on the owning bird's page.

use actix_web::http::StatusCode;
use actix_web::web;
use serde::Deserialize;
use uuid::Uuid;
use wh_core::moderation::{self, Discussion, DiscussionContext};
use wh_ui::{DiscussionEditTemplate, FieldError, Nav};

use crate::error::WebError;
use crate::handlers::{bird_url, field_error, redirect, render, WebResult};
use crate::session::Viewer;
use crate::state::AppState;

async fn context(
    data: &AppState,
    viewer: &Viewer,
    target: Discussion,
) -> Result<DiscussionContext, WebError> {
    viewer.require()?;
    Ok(moderation::load(data.repo.as_ref(), target).await?)
}

async fn approve(data: web::Data<AppState>, viewer: Viewer, target: Discussion) -> WebResult {
    let ctx = context(&data, &viewer, target).await?;
    viewer.require_owner(&ctx.moderators())?;
    let bird_id = moderation::approve(data.repo.as_ref(), target).await?;
    Ok(redirect(bird_url(bird_id)))
}

async fn remove(data: web::Data<AppState>, viewer: Viewer, target: Discussion) -> WebResult {
    let ctx = context(&data, &viewer, target).await?;
    viewer.require_owner(&ctx.removers())?;
    let bird_id = moderation::remove(data.repo.as_ref(), target).await?;
    Ok(redirect(bird_url(bird_id)))
}

fn edit_page(
    viewer: &Viewer,
    target: Discussion,
    bird_id: Uuid,
    text: String,
    error: FieldError,
    status: StatusCode,
) -> WebResult {
    let (heading, field, action) = match target {
        Discussion::Comment(id) => ("Edit comment", "comment", format!("/birds_nest/{id}/edit_comment/")),
        Discussion::Reply(id) => ("Edit reply", "reply", format!("/birds_nest/{id}/edit_reply/")),
    };
    render(
        status,
        DiscussionEditTemplate {
            nav: Nav::for_viewer(viewer.identity()),
            heading,
            field,
            action,
            text,
            bird_id,
            error,
        },
    )
}

async fn edit_form(data: web::Data<AppState>, viewer: Viewer, target: Discussion) -> WebResult {
    let ctx = context(&data, &viewer, target).await?;
    viewer.require_owner(&[ctx.author()])?;
    let text = ctx.text().to_string();
    edit_page(&viewer, target, ctx.bird.id, text, FieldError::none(), StatusCode::OK)
}

async fn edit(data: web::Data<AppState>, viewer: Viewer, target: Discussion, text: String) -> WebResult {
    let ctx = context(&data, &viewer, target).await?;
    viewer.require_owner(&[ctx.author()])?;
    match moderation::edit(data.repo.as_ref(), target, &text).await {
        Ok(bird_id) => Ok(redirect(bird_url(bird_id))),
        Err(err) => {
            let error = field_error(err)?;
            edit_page(&viewer, target, ctx.bird.id, text, error, StatusCode::BAD_REQUEST)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentText {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyText {
    #[serde(default)]
    pub reply: String,
}

pub async fn approve_comment(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    approve(data, viewer, Discussion::Comment(path.into_inner())).await
}

pub async fn remove_comment(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    remove(data, viewer, Discussion::Comment(path.into_inner())).await
}

pub async fn edit_comment_form(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    edit_form(data, viewer, Discussion::Comment(path.into_inner())).await
}

pub async fn edit_comment(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    form: web::Form<CommentText>,
) -> WebResult {
    let target = Discussion::Comment(path.into_inner());
    edit(data, viewer, target, form.into_inner().comment).await
}

pub async fn approve_reply(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    approve(data, viewer, Discussion::Reply(path.into_inner())).await
}

pub async fn remove_reply(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    remove(data, viewer, Discussion::Reply(path.into_inner())).await
}

pub async fn edit_reply_form(data: web::Data<AppState>, viewer: Viewer, path: web::Path<Uuid>) -> WebResult {
    edit_form(data, viewer, Discussion::Reply(path.into_inner())).await
}

pub async fn edit_reply(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    form: web::Form<ReplyText>,
) -> WebResult {
    let target = Discussion::Reply(path.into_inner());
    edit(data, viewer, target, form.into_inner().reply).await
}
