//! The signed session cookie and the `Viewer` extractor built on it.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;
use wh_core::access::Capability;
use wh_core::accounts;
use wh_core::error::AppError;
use wh_core::models::Identity;

use crate::error::WebError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "whistly_session";

/// Who is asking, if anyone, plus the path they asked for.
#[derive(Debug, Clone)]
pub struct Viewer {
    identity: Option<Identity>,
    path: String,
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Runs a capability check; anonymous callers are sent to the login page
    /// and come back here afterwards.
    pub fn check(&self, capability: Capability) -> Result<&Identity, WebError> {
        capability
            .check(self.identity.as_ref())
            .map_err(|err| match err {
                AppError::Unauthenticated => WebError::with_next(err, self.path.clone()),
                other => other.into(),
            })
    }

    pub fn require(&self) -> Result<&Identity, WebError> {
        self.check(Capability::Authenticated)
    }

    pub fn require_owner(&self, owners: &[Uuid]) -> Result<&Identity, WebError> {
        self.check(Capability::OwnerOf(owners.to_vec()))
    }
}

impl FromRequest for Viewer {
    type Error = WebError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        Box::pin(async move {
            let identity = match (state, token) {
                (Some(state), Some(token)) => {
                    accounts::identify(state.users.as_ref(), state.auth.as_ref(), &token).await?
                }
                _ => None,
            };
            Ok(Viewer { identity, path })
        })
    }
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}
