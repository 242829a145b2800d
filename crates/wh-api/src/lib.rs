//! # wh-api
//!
//! The web routing and orchestration layer for Whistly.

pub mod accounts;
pub mod discussion;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod multipart;
pub mod session;
pub mod state;

use actix_web::web;

pub use error::WebError;
pub use state::AppState;

/// Configures every page route. Media files are mounted by the binary.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::home))
        // Birds
        .route("/birds_nest/", web::get().to(handlers::bird_list))
        .service(
            web::resource("/birds_nest/{id}/")
                .route(web::get().to(handlers::bird_detail))
                .route(web::post().to(handlers::post_discussion)),
        )
        .service(
            web::resource("/feathers_up/")
                .route(web::get().to(handlers::add_bird_form))
                .route(web::post().to(handlers::add_bird)),
        )
        .service(
            web::resource("/birds_nest/{id}/edit/")
                .route(web::get().to(handlers::edit_bird_form))
                .route(web::post().to(handlers::edit_bird)),
        )
        .service(
            web::resource("/birds_nest/{id}/delete/")
                .route(web::get().to(handlers::delete_bird_form))
                .route(web::post().to(handlers::delete_bird)),
        )
        .service(
            web::resource("/birds_nest/{id}/seed")
                .route(web::get().to(handlers::toggle_seed))
                .route(web::post().to(handlers::toggle_seed)),
        )
        // Comments ({id} is the comment)
        .route("/birds_nest/{id}/comment_approved/", web::post().to(discussion::approve_comment))
        .route("/birds_nest/{id}/comment_removed/", web::post().to(discussion::remove_comment))
        .service(
            web::resource("/birds_nest/{id}/edit_comment/")
                .route(web::get().to(discussion::edit_comment_form))
                .route(web::post().to(discussion::edit_comment)),
        )
        // Replies ({id} is the reply)
        .route("/birds_nest/{id}/reply_approved/", web::post().to(discussion::approve_reply))
        .route("/birds_nest/{id}/reply_removed/", web::post().to(discussion::remove_reply))
        .service(
            web::resource("/birds_nest/{id}/edit_reply/")
                .route(web::get().to(discussion::edit_reply_form))
                .route(web::post().to(discussion::edit_reply)),
        )
        .route("/search/", web::get().to(handlers::search_birds))
        // Accounts
        .route("/user_profile/{id}/", web::get().to(accounts::profile))
        .service(
            web::resource("/user_profile/{id}/edit/")
                .route(web::get().to(accounts::edit_profile_form))
                .route(web::post().to(accounts::edit_profile)),
        )
        .service(
            web::resource("/remove_account/{id}/")
                .route(web::get().to(accounts::remove_account_form))
                .route(web::post().to(accounts::remove_account)),
        )
        .service(
            web::resource("/accounts/signup/")
                .route(web::get().to(accounts::signup_form))
                .route(web::post().to(accounts::signup)),
        )
        .service(
            web::resource("/accounts/login/")
                .route(web::get().to(accounts::login_form))
                .route(web::post().to(accounts::login)),
        )
        .service(
            web::resource("/accounts/password/change/")
                .route(web::get().to(accounts::password_change_form))
                .route(web::post().to(accounts::change_password)),
        )
        .route("/accounts/logout/", web::post().to(accounts::logout));
}
