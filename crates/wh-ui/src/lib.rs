//! # wh-ui
//!
//! Askama templates for every page, plus the view models they render.

pub mod views;

use askama::Template;
use uuid::Uuid;
use wh_core::models::{BirdChanges, NewBird};

pub use views::{
    detail_views, BirdCard, BirdView, FieldError, Nav, Pager, ProfileView, ThreadView,
};

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
}

#[derive(Template)]
#[template(path = "bird/bird_list.html")]
pub struct BirdListTemplate {
    pub nav: Nav,
    pub birds: Vec<BirdCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "bird/bird_detail.html")]
pub struct BirdDetailTemplate {
    pub nav: Nav,
    pub bird: BirdView,
    pub threads: Vec<ThreadView>,
    pub error: FieldError,
    /// `None` puts `error` under the comment form, `Some(id)` under the reply form of comment `id`.
    pub error_target: Option<Uuid>,
}

#[derive(Template)]
#[template(path = "bird/add_bird.html")]
pub struct AddBirdTemplate {
    pub nav: Nav,
    pub form: NewBird,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "bird/bird_update.html")]
pub struct BirdUpdateTemplate {
    pub nav: Nav,
    pub bird_id: Uuid,
    pub form: BirdChanges,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "bird/bird_delete.html")]
pub struct BirdDeleteTemplate {
    pub nav: Nav,
    pub bird_id: Uuid,
    pub species: String,
}

/// Shared by comment and reply editing.
#[derive(Template)]
#[template(path = "comment_reply/comment_reply_update.html")]
pub struct DiscussionEditTemplate {
    pub nav: Nav,
    pub heading: &'static str,
    /// Form field name, `comment` or `reply`.
    pub field: &'static str,
    pub action: String,
    pub text: String,
    pub bird_id: Uuid,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "search_results.html")]
pub struct SearchResultsTemplate {
    pub nav: Nav,
    pub query: String,
    pub birds: Vec<BirdCard>,
    pub pager: Pager,
    pub sort_links: Vec<(&'static str, String)>,
}

#[derive(Template)]
#[template(path = "profile/profile_detail.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub profile: ProfileView,
    pub birds: Vec<BirdCard>,
}

#[derive(Template)]
#[template(path = "profile/profile_edit.html")]
pub struct ProfileEditTemplate {
    pub nav: Nav,
    pub profile: ProfileView,
    pub about_user: String,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "account/remove_account.html")]
pub struct RemoveAccountTemplate {
    pub nav: Nav,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Template)]
#[template(path = "account/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub username: String,
    pub next: String,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "account/password_change.html")]
pub struct PasswordChangeTemplate {
    pub nav: Nav,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "account/signup.html")]
pub struct SignupTemplate {
    pub nav: Nav,
    pub username: String,
    pub email: String,
    pub error: FieldError,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_is_escaped() {
        let html = ErrorTemplate {
            nav: Nav::default(),
            status: 404,
            message: "<script>alert(1)</script>".into(),
        }
        .render()
        .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn anonymous_nav_offers_login() {
        let html = HomeTemplate { nav: Nav::default() }.render().unwrap();
        assert!(html.contains("Log in"));
        assert!(!html.contains("Log out"));
    }

    #[test]
    fn form_errors_render_next_to_their_field() {
        let html = AddBirdTemplate {
            nav: Nav::default(),
            form: NewBird {
                species: "Heron".into(),
                ..NewBird::default()
            },
            error: FieldError::new("location", "This field is required."),
        }
        .render()
        .unwrap();
        assert!(html.contains("This field is required."));
        assert!(html.contains("value=\"Heron\""));
    }
}
