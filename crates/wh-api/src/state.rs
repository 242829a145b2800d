use std::sync::Arc;

use wh_core::traits::{AuthProvider, BirdRepo, MediaStore, UserRepo};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub repo: Arc<dyn BirdRepo>,
    pub users: Arc<dyn UserRepo>,
    pub store: Box<dyn MediaStore>,
    pub auth: Box<dyn AuthProvider>,
    pub max_upload_bytes: usize,
    /// Marks the session cookie `Secure`.
    pub secure_cookie: bool,
}
