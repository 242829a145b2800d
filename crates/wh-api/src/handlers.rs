//! # wh-api Handlers
//!
//! Birds, seeds and search. Each handler checks capabilities through the
//! `Viewer`, then hands over to `wh-core`.

use actix_multipart::Multipart;
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse};
use askama::Template;
use serde::Deserialize;
use uuid::Uuid;
use wh_core::birds::{self, BirdDetail};
use wh_core::error::AppError;
use wh_core::models::{BirdChanges, Identity, NewBird, Rotation};
use wh_core::moderation;
use wh_core::pagination::{PageRequest, LISTING_PAGE_SIZE, SEARCH_PAGE_SIZE};
use wh_core::search::{self, SearchPlan};
use wh_core::seeds;
use wh_ui::{
    detail_views, AddBirdTemplate, BirdCard, BirdDeleteTemplate, BirdDetailTemplate,
    BirdListTemplate, BirdUpdateTemplate, FieldError, HomeTemplate, Nav, Pager,
    SearchResultsTemplate,
};

use crate::error::WebError;
use crate::multipart;
use crate::session::Viewer;
use crate::state::AppState;

pub type WebResult = Result<HttpResponse, WebError>;

pub(crate) fn render(status: StatusCode, page: impl Template) -> WebResult {
    let html = page.render()?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(html))
}

pub(crate) fn redirect(location: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

pub(crate) fn bird_url(id: Uuid) -> String {
    format!("/birds_nest/{id}/")
}

/// Splits a failure into a field message to re-render with, or an error to return.
pub(crate) fn field_error(err: AppError) -> Result<FieldError, WebError> {
    match FieldError::from_app(&err) {
        Some(field) => Ok(field),
        None => Err(err.into()),
    }
}

pub async fn home(viewer: Viewer) -> WebResult {
    render(
        StatusCode::OK,
        HomeTemplate {
            nav: Nav::for_viewer(viewer.identity()),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Renders the Bird's nest (e.g., /birds_nest/?page=2)
pub async fn bird_list(
    data: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<PageQuery>,
) -> WebResult {
    let page = PageRequest::parse(query.page.as_deref())?;
    let found = search::search(data.repo.as_ref(), &SearchPlan::all(), page, LISTING_PAGE_SIZE).await?;
    let pager = Pager::new(&found, "/birds_nest/", &[]);
    let birds = found
        .items
        .iter()
        .map(|l| BirdCard::from_listing(l, data.store.as_ref()))
        .collect();
    render(
        StatusCode::OK,
        BirdListTemplate {
            nav: Nav::for_viewer(viewer.identity()),
            birds,
            pager,
        },
    )
}

fn detail_page(
    data: &AppState,
    viewer: &Identity,
    detail: BirdDetail,
    status: StatusCode,
    error: FieldError,
    error_target: Option<Uuid>,
) -> WebResult {
    let (bird, threads) = detail_views(&detail, Some(viewer), data.store.as_ref());
    render(
        status,
        BirdDetailTemplate {
            nav: Nav::for_viewer(Some(viewer)),
            bird,
            threads,
            error,
            error_target,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub name: Option<String>,
}

/// Renders a bird with its discussion; `?name=rotate-left|rotate-right` turns
/// the picture first.
pub async fn bird_detail(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    query: web::Query<DetailQuery>,
) -> WebResult {
    let me = viewer.require()?;
    let id = path.into_inner();

    if let Some(rotation) = query.name.as_deref().and_then(Rotation::from_query) {
        let bird = birds::get_bird(data.repo.as_ref(), id).await?;
        viewer.require_owner(&[bird.photographer_id])?;
        birds::rotate_picture(data.repo.as_ref(), data.store.as_ref(), id, rotation).await?;
    }

    let detail = birds::bird_detail(data.repo.as_ref(), data.users.as_ref(), id, Some(me)).await?;
    detail_page(&data, me, detail, StatusCode::OK, FieldError::none(), None)
}

#[derive(Debug, Deserialize)]
pub struct DiscussionForm {
    pub comment: Option<String>,
    pub reply: Option<String>,
}

/// A `comment` field comments on bird `{id}`; a `reply` field replies to comment `{id}`.
pub async fn post_discussion(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    form: web::Form<DiscussionForm>,
) -> WebResult {
    let me = viewer.require()?;
    let id = path.into_inner();
    let form = form.into_inner();

    let (bird_id, error_target, outcome) = match (form.comment, form.reply) {
        (Some(text), _) => {
            let outcome = moderation::submit_comment(data.repo.as_ref(), id, me, &text)
                .await
                .map(|_| ());
            (id, None, outcome)
        }
        (None, Some(text)) => {
            let comment = data
                .repo
                .get_comment(id)
                .await?
                .ok_or_else(|| AppError::not_found("Comment", id))?;
            let outcome = moderation::submit_reply(data.repo.as_ref(), id, me, &text)
                .await
                .map(|_| ());
            (comment.bird_id, Some(comment.id), outcome)
        }
        (None, None) => return Err(AppError::invalid("comment", "This field is required.").into()),
    };

    match outcome {
        Ok(()) => Ok(redirect(bird_url(bird_id))),
        Err(err) => {
            let error = field_error(err)?;
            let detail =
                birds::bird_detail(data.repo.as_ref(), data.users.as_ref(), bird_id, Some(me)).await?;
            detail_page(&data, me, detail, StatusCode::BAD_REQUEST, error, error_target)
        }
    }
}

pub async fn add_bird_form(viewer: Viewer) -> WebResult {
    let me = viewer.require()?;
    render(
        StatusCode::OK,
        AddBirdTemplate {
            nav: Nav::for_viewer(Some(me)),
            form: NewBird::default(),
            error: FieldError::none(),
        },
    )
}

/// Creates a bird from a multipart form with a `picture` file.
pub async fn add_bird(data: web::Data<AppState>, viewer: Viewer, payload: Multipart) -> WebResult {
    let me = viewer.require()?;
    let mut upload = multipart::read(payload, data.max_upload_bytes).await?;
    let form = NewBird {
        species: upload.text("species"),
        location: upload.text("location"),
        photographer_comment: upload.text("photographer_comment"),
    };
    let picture = upload.take_file("picture").unwrap_or_default();

    match birds::create_bird(
        data.repo.as_ref(),
        data.store.as_ref(),
        me,
        form.clone(),
        picture,
        data.max_upload_bytes,
    )
    .await
    {
        Ok(bird) => Ok(redirect(bird_url(bird.id))),
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            AddBirdTemplate {
                nav: Nav::for_viewer(Some(me)),
                form,
                error: field_error(err)?,
            },
        ),
    }
}

pub async fn edit_bird_form(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    viewer.require()?;
    let bird = birds::get_bird(data.repo.as_ref(), path.into_inner()).await?;
    let me = viewer.require_owner(&[bird.photographer_id])?;
    render(
        StatusCode::OK,
        BirdUpdateTemplate {
            nav: Nav::for_viewer(Some(me)),
            bird_id: bird.id,
            form: BirdChanges {
                species: bird.species,
                location: bird.location,
                photographer_comment: bird.photographer_comment,
            },
            error: FieldError::none(),
        },
    )
}

pub async fn edit_bird(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    form: web::Form<BirdChanges>,
) -> WebResult {
    viewer.require()?;
    let bird = birds::get_bird(data.repo.as_ref(), path.into_inner()).await?;
    let me = viewer.require_owner(&[bird.photographer_id])?;
    let form = form.into_inner();

    match birds::update_bird(data.repo.as_ref(), bird.id, form.clone()).await {
        Ok(bird) => Ok(redirect(bird_url(bird.id))),
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            BirdUpdateTemplate {
                nav: Nav::for_viewer(Some(me)),
                bird_id: bird.id,
                form,
                error: field_error(err)?,
            },
        ),
    }
}

pub async fn delete_bird_form(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    viewer.require()?;
    let bird = birds::get_bird(data.repo.as_ref(), path.into_inner()).await?;
    let me = viewer.require_owner(&[bird.photographer_id])?;
    render(
        StatusCode::OK,
        BirdDeleteTemplate {
            nav: Nav::for_viewer(Some(me)),
            bird_id: bird.id,
            species: bird.species,
        },
    )
}

pub async fn delete_bird(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    viewer.require()?;
    let bird = birds::get_bird(data.repo.as_ref(), path.into_inner()).await?;
    viewer.require_owner(&[bird.photographer_id])?;
    birds::delete_bird(data.repo.as_ref(), bird.id).await?;
    Ok(redirect("/birds_nest/"))
}

/// Flips the viewer's seed and goes back to the bird.
pub async fn toggle_seed(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    let me = viewer.require()?;
    let id = path.into_inner();
    seeds::toggle_seed(data.repo.as_ref(), id, me).await?;
    Ok(redirect(bird_url(id)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub page: Option<String>,
}

const SORT_LINKS: [(&str, &str); 5] = [
    ("newest", ""),
    ("most comments", "comment"),
    ("most seeds", "seed"),
    ("species", "species"),
    ("photographer", "photographer"),
];

fn search_url(text: &str, order_by: &str) -> String {
    let pairs: Vec<(&str, &str)> = [("q", text), ("order_by", order_by)]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) if !query.is_empty() => format!("/search/?{query}"),
        _ => "/search/".to_string(),
    }
}

pub async fn search_birds(
    data: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<SearchQuery>,
) -> WebResult {
    let me = viewer.require()?;
    let query = query.into_inner();
    let text = query.q.unwrap_or_default();
    let order_by = query.order_by.unwrap_or_default();

    let plan = SearchPlan::new(Some(text.as_str()), Some(order_by.as_str()));
    let page = PageRequest::parse(query.page.as_deref())?;
    let found = search::search(data.repo.as_ref(), &plan, page, SEARCH_PAGE_SIZE).await?;

    let pager = Pager::new(&found, "/search/", &[("q", &text), ("order_by", &order_by)]);
    let sort_links = SORT_LINKS
        .iter()
        .map(|(label, key)| (*label, search_url(&text, key)))
        .collect();
    let birds = found
        .items
        .iter()
        .map(|l| BirdCard::from_listing(l, data.store.as_ref()))
        .collect();

    render(
        StatusCode::OK,
        SearchResultsTemplate {
            nav: Nav::for_viewer(Some(me)),
            query: text,
            birds,
            pager,
            sort_links,
        },
    )
}
