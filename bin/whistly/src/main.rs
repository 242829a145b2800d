//! # Whistly Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use wh_api::middleware::{cors_policy, security_headers, standard_middleware};
use wh_api::{configure_routes, AppState};
use wh_config::Settings;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple")))]
compile_error!("whistly needs a database, a media store and an auth provider: enable db-sqlite, storage-local and auth-simple");

// Feature-gated imports: each port is filled by the plugin compiled in.
#[cfg(feature = "db-sqlite")]
use wh_db_sqlite::SqliteBirdRepo;

#[cfg(feature = "storage-local")]
use wh_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use wh_auth_simple::SimpleAuthProvider;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let settings = Settings::load()?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = Arc::new(
        SqliteBirdRepo::connect(&settings.database.url, settings.database.max_connections).await?,
    );

    // 2. Initialize Storage Implementation
    tokio::fs::create_dir_all(&settings.media.root).await?;
    #[cfg(feature = "storage-local")]
    let store = LocalMediaStore::new(settings.media.root.clone(), settings.media.url_prefix.clone());

    // 3. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(settings.session.secret.clone())?
        .with_session_ttl(chrono::Duration::seconds(settings.session.max_age_secs));

    // 4. Wrap in AppState
    let state = web::Data::new(AppState {
        repo: repo.clone(),
        users: repo,
        store: Box::new(store),
        auth: Box::new(auth),
        max_upload_bytes: settings.media.max_upload_bytes,
        secure_cookie: settings.session.secure_cookie,
    });

    let (host, port) = settings.bind_addr();
    let media_prefix = settings.media.url_prefix.clone();
    let media_root = settings.media.root.clone();
    log::info!("Whistly starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(security_headers())
            .wrap(standard_middleware())
            .service(Files::new(&media_prefix, &media_root))
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;
    Ok(())
}
