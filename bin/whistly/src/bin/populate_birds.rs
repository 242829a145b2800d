//! Fills the bird's nest with made-up users and birds for local development.
//!
//! Pictures are taken in turn from a directory of sample images.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fake::faker::address::en::CountryName;
use fake::faker::internet::en::{Password, SafeEmail};
use fake::faker::lorem::en::Paragraph;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use wh_auth_simple::SimpleAuthProvider;
use wh_config::Settings;
use wh_core::accounts::{self, Signup};
use wh_core::birds;
use wh_core::error::AppError;
use wh_core::models::{Identity, NewBird, User};
use wh_core::traits::{AuthProvider, BirdRepo, MediaStore, UserRepo};
use wh_core::validation::MAX_PHOTOGRAPHER_COMMENT_LEN;
use wh_db_sqlite::SqliteBirdRepo;
use wh_storage_local::LocalMediaStore;

#[derive(Parser)]
#[command(name = "populate-birds", about = "Populate Whistly with demo data")]
struct Cli {
    /// Directory of sample pictures
    #[arg(long, default_value = "media/test_birds")]
    pictures: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// N users with one bird each
    MultiplyUsers {
        #[arg(default_value_t = 20)]
        count: usize,
    },
    /// One `SuperUser` with N birds
    SingleUser {
        #[arg(default_value_t = 10)]
        count: usize,
    },
}

const SUPER_USER: &str = "SuperUser";

struct Seeder<'a> {
    repo: &'a SqliteBirdRepo,
    store: &'a dyn MediaStore,
    auth: &'a dyn AuthProvider,
    pictures: Vec<Vec<u8>>,
    max_upload_bytes: usize,
    posted: usize,
}

impl Seeder<'_> {
    async fn signup(&self, username: String) -> Result<User, AppError> {
        let password: String = Password(10..16).fake();
        let form = Signup {
            username,
            email: SafeEmail().fake(),
            password1: password.clone(),
            password2: password,
        };
        accounts::signup(self.repo, self.auth, form).await
    }

    /// Retries with a numeric suffix when the made-up name is taken.
    async fn new_user(&self) -> anyhow::Result<User> {
        let base: String = FirstName().fake();
        let mut attempt = 0;
        loop {
            let username = match attempt {
                0 => base.clone(),
                n => format!("{base}_{n}"),
            };
            match self.signup(username).await {
                Ok(user) => return Ok(user),
                Err(AppError::ValidationError { field: "username", .. }) | Err(AppError::Conflict(_))
                    if attempt < 999 =>
                {
                    attempt += 1
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn post_bird(&mut self, photographer: &Identity) -> anyhow::Result<()> {
        let picture = self.pictures[self.posted % self.pictures.len()].clone();
        self.posted += 1;
        let comment: String = Paragraph(1..3).fake();
        let form = NewBird {
            species: LastName().fake(),
            location: CountryName().fake(),
            photographer_comment: comment.chars().take(MAX_PHOTOGRAPHER_COMMENT_LEN).collect(),
        };
        birds::create_bird(
            self.repo,
            self.store,
            photographer,
            form,
            picture,
            self.max_upload_bytes,
        )
        .await?;
        Ok(())
    }
}

fn load_pictures(dir: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read picture directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    let pictures = paths
        .iter()
        .map(std::fs::read)
        .collect::<Result<Vec<_>, _>>()?;
    anyhow::ensure!(!pictures.is_empty(), "no pictures found in {}", dir.display());
    Ok(pictures)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let repo = SqliteBirdRepo::connect(&settings.database.url, settings.database.max_connections).await?;
    let store = LocalMediaStore::new(settings.media.root.clone(), settings.media.url_prefix.clone());
    let auth = SimpleAuthProvider::new(settings.session.secret.clone())?;
    let mut seeder = Seeder {
        repo: &repo,
        store: &store,
        auth: &auth,
        pictures: load_pictures(&cli.pictures)?,
        max_upload_bytes: settings.media.max_upload_bytes,
        posted: 0,
    };

    match cli.command {
        Command::MultiplyUsers { count } => {
            log::info!("generating {count} users, each with one bird");
            for _ in 0..count {
                let user = seeder.new_user().await?;
                seeder.post_bird(&user.identity()).await?;
            }
        }
        Command::SingleUser { count } => {
            log::info!("generating {SUPER_USER} with {count} birds");
            let user = match UserRepo::find_user_by_username(&repo, SUPER_USER).await? {
                Some(user) => user,
                None => {
                    let user = seeder.signup(SUPER_USER.to_string()).await?;
                    log::info!("{SUPER_USER} created with email {}", user.email);
                    user
                }
            };
            for _ in 0..count {
                seeder.post_bird(&user.identity()).await?;
            }
        }
    }

    let total = BirdRepo::count_birds(&repo, &wh_core::search::SearchPlan::all()).await?;
    log::info!("done; the nest now holds {total} birds");
    Ok(())
}
