//! Signup, login, logout, profiles and account removal.

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use wh_core::accounts::{self, PasswordChange, ProfileChanges, Signup};
use wh_core::models::{Identity, User};
use wh_ui::{
    BirdCard, FieldError, LoginTemplate, Nav, PasswordChangeTemplate, ProfileEditTemplate,
    ProfileTemplate, ProfileView, RemoveAccountTemplate, SignupTemplate,
};

use crate::error::WebError;
use crate::handlers::{field_error, redirect, render, WebResult};
use crate::multipart;
use crate::session::{removal_cookie, safe_next, session_cookie, Viewer};
use crate::state::AppState;

fn logged_in(data: &AppState, user: &User, location: String) -> HttpResponse {
    let token = data.auth.issue_session(user.id);
    let mut response = redirect(location);
    if let Err(err) = response.add_cookie(&session_cookie(token, data.secure_cookie)) {
        log::error!("could not set session cookie: {err}");
    }
    response
}

pub async fn signup_form(viewer: Viewer) -> WebResult {
    render(
        StatusCode::OK,
        SignupTemplate {
            nav: Nav::for_viewer(viewer.identity()),
            username: String::new(),
            email: String::new(),
            error: FieldError::none(),
        },
    )
}

pub async fn signup(data: web::Data<AppState>, form: web::Form<Signup>) -> WebResult {
    let form = form.into_inner();
    let (username, email) = (form.username.clone(), form.email.clone());
    match accounts::signup(data.users.as_ref(), data.auth.as_ref(), form).await {
        Ok(user) => Ok(logged_in(&data, &user, "/".into())),
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            SignupTemplate {
                nav: Nav::default(),
                username,
                email,
                error: field_error(err)?,
            },
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn login_form(viewer: Viewer, query: web::Query<NextQuery>) -> WebResult {
    render(
        StatusCode::OK,
        LoginTemplate {
            nav: Nav::for_viewer(viewer.identity()),
            username: String::new(),
            next: safe_next(query.next.as_deref()),
            error: FieldError::none(),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> WebResult {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref());
    match accounts::login(data.users.as_ref(), data.auth.as_ref(), &form.username, &form.password).await {
        Ok(user) => {
            log::info!("{} logged in", user.username);
            Ok(logged_in(&data, &user, next))
        }
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            LoginTemplate {
                nav: Nav::default(),
                username: form.username,
                next,
                error: field_error(err)?,
            },
        ),
    }
}

pub async fn logout() -> WebResult {
    let mut response = redirect("/");
    if let Err(err) = response.add_cookie(&removal_cookie()) {
        log::error!("could not clear session cookie: {err}");
    }
    Ok(response)
}

pub async fn password_change_form(viewer: Viewer) -> WebResult {
    let me = viewer.require()?;
    render(
        StatusCode::OK,
        PasswordChangeTemplate {
            nav: Nav::for_viewer(Some(me)),
            error: FieldError::none(),
        },
    )
}

/// The session stays valid; the next login needs the new password.
pub async fn change_password(
    data: web::Data<AppState>,
    viewer: Viewer,
    form: web::Form<PasswordChange>,
) -> WebResult {
    let me = viewer.require()?;
    match accounts::change_password(data.users.as_ref(), data.auth.as_ref(), me.user_id, form.into_inner()).await {
        Ok(()) => Ok(redirect("/")),
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            PasswordChangeTemplate {
                nav: Nav::for_viewer(Some(me)),
                error: field_error(err)?,
            },
        ),
    }
}

pub async fn profile(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    let me = viewer.require()?;
    let found = accounts::profile(data.users.as_ref(), data.repo.as_ref(), path.into_inner()).await?;
    let birds = found
        .birds
        .iter()
        .map(|b| BirdCard::from_bird(b, &found.user.username, data.store.as_ref()))
        .collect();
    render(
        StatusCode::OK,
        ProfileTemplate {
            nav: Nav::for_viewer(Some(me)),
            profile: ProfileView::new(&found.user, Some(me), data.store.as_ref()),
            birds,
        },
    )
}

/// Loads the account at `id`, which must be the viewer's own.
async fn own_account<'v>(
    data: &AppState,
    viewer: &'v Viewer,
    id: Uuid,
) -> Result<(&'v Identity, User), WebError> {
    let me = viewer.require_owner(&[id])?;
    let user = accounts::profile(data.users.as_ref(), data.repo.as_ref(), id).await?.user;
    Ok((me, user))
}

pub async fn edit_profile_form(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    let (me, user) = own_account(&data, &viewer, path.into_inner()).await?;
    render(
        StatusCode::OK,
        ProfileEditTemplate {
            nav: Nav::for_viewer(Some(me)),
            profile: ProfileView::new(&user, Some(me), data.store.as_ref()),
            about_user: user.about_user.clone(),
            error: FieldError::none(),
        },
    )
}

/// Multipart: `about_user` text and an optional `profile_picture` file.
pub async fn edit_profile(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> WebResult {
    let (me, user) = own_account(&data, &viewer, path.into_inner()).await?;
    let mut upload = multipart::read(payload, data.max_upload_bytes).await?;
    let changes = ProfileChanges {
        about_user: upload.text("about_user"),
        profile_picture: upload.take_file("profile_picture"),
    };
    let about_user = changes.about_user.clone();

    match accounts::update_profile(
        data.users.as_ref(),
        data.store.as_ref(),
        user.id,
        changes,
        data.max_upload_bytes,
    )
    .await
    {
        Ok(user) => Ok(redirect(format!("/user_profile/{}/", user.id))),
        Err(err) => render(
            StatusCode::BAD_REQUEST,
            ProfileEditTemplate {
                nav: Nav::for_viewer(Some(me)),
                profile: ProfileView::new(&user, Some(me), data.store.as_ref()),
                about_user,
                error: field_error(err)?,
            },
        ),
    }
}

pub async fn remove_account_form(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    let (me, user) = own_account(&data, &viewer, path.into_inner()).await?;
    render(
        StatusCode::OK,
        RemoveAccountTemplate {
            nav: Nav::for_viewer(Some(me)),
            user_id: user.id,
            username: user.username,
        },
    )
}

pub async fn remove_account(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<Uuid>,
) -> WebResult {
    let (_, user) = own_account(&data, &viewer, path.into_inner()).await?;
    accounts::remove_account(data.users.as_ref(), user.id).await?;
    logout().await
}
