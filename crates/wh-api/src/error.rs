//! Maps domain failures onto HTTP responses.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use wh_core::error::AppError;
use wh_ui::{ErrorTemplate, Nav};

pub const LOGIN_PATH: &str = "/accounts/login/";

#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct WebError {
    source: AppError,
    /// Where to come back to after logging in.
    next: Option<String>,
}

impl WebError {
    pub fn with_next(source: AppError, next: impl Into<String>) -> Self {
        Self {
            source,
            next: Some(next.into()),
        }
    }

    pub fn app(&self) -> &AppError {
        &self.source
    }

    pub fn into_app(self) -> AppError {
        self.source
    }

    fn login_location(&self) -> String {
        match &self.next {
            Some(next) => match serde_urlencoded::to_string([("next", next.as_str())]) {
                Ok(query) => format!("{LOGIN_PATH}?{query}"),
                Err(_) => LOGIN_PATH.to_string(),
            },
            None => LOGIN_PATH.to_string(),
        }
    }
}

impl From<AppError> for WebError {
    fn from(source: AppError) -> Self {
        Self { source, next: None }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        AppError::from(err).into()
    }
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {err}")).into()
    }
}

impl ResponseError for WebError {
    fn status_code(&self) -> StatusCode {
        match &self.source {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match &self.source {
            AppError::Unauthenticated => {
                return HttpResponse::SeeOther()
                    .insert_header((header::LOCATION, self.login_location()))
                    .finish();
            }
            AppError::Internal(detail) => {
                log::error!("internal error: {detail}");
                "Something went wrong on our side.".to_string()
            }
            AppError::Unauthorized(detail) => {
                log::warn!("forbidden: {detail}");
                "You are not allowed to do that.".to_string()
            }
            AppError::NotFound(..) => "Not found.".to_string(),
            AppError::ValidationError { message, .. } => message.clone(),
            AppError::Conflict(detail) => detail.clone(),
        };

        let page = ErrorTemplate {
            nav: Nav::default(),
            status: status.as_u16(),
            message,
        };
        match page.render() {
            Ok(html) => HttpResponse::build(status)
                .content_type("text/html; charset=utf-8")
                .body(html),
            Err(err) => {
                log::error!("error page failed to render: {err}");
                HttpResponse::build(status).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (AppError::not_found("Bird", "x"), StatusCode::NOT_FOUND),
            (AppError::invalid("comment", "too long"), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("no".into()), StatusCode::FORBIDDEN),
            (AppError::Internal("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(WebError::from(err).status_code(), status);
        }
    }

    #[test]
    fn anonymous_callers_are_sent_to_login() {
        let err = WebError::with_next(AppError::Unauthenticated, "/birds_nest/abc/?name=x");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/accounts/login/?next=%2Fbirds_nest%2Fabc%2F%3Fname%3Dx"
        );
    }
}
