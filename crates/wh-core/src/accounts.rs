//! Accounts: registration, credentials and profiles.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Bird, Identity, MediaKind, User};
use crate::traits::{AuthProvider, BirdRepo, MediaStore, UserRepo};
use crate::validation;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Signup {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

pub async fn signup(users: &dyn UserRepo, auth: &dyn AuthProvider, form: Signup) -> Result<User> {
    let username = validation::username(&form.username)?;
    let email = validation::email(&form.email)?;
    validation::new_password(&form.password1, &form.password2)?;
    if users.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::invalid(
            "username",
            "A user with that username already exists.",
        ));
    }

    let user = User {
        id: Uuid::now_v7(),
        username,
        email,
        password_hash: auth.hash_password(&form.password1)?,
        profile_picture: None,
        about_user: String::new(),
        created_at: Utc::now(),
    };
    users.create_user(user.clone()).await?;
    log::info!("account {} created", user.username);
    Ok(user)
}

/// Returns the account when the credentials match; never says which part was wrong.
pub async fn login(
    users: &dyn UserRepo,
    auth: &dyn AuthProvider,
    username: &str,
    password: &str,
) -> Result<User> {
    let user = users.find_user_by_username(username.trim()).await?;
    match user {
        Some(user) if auth.verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AppError::invalid(
            "password",
            "The username and/or password you specified are not correct.",
        )),
    }
}

/// Resolves a session token to a live identity.
pub async fn identify(
    users: &dyn UserRepo,
    auth: &dyn AuthProvider,
    token: &str,
) -> Result<Option<Identity>> {
    let Some(user_id) = auth.verify_session(token) else {
        return Ok(None);
    };
    Ok(users.get_user(user_id).await?.map(|u| u.identity()))
}

pub struct Profile {
    pub user: User,
    pub birds: Vec<Bird>,
}

pub async fn profile(users: &dyn UserRepo, repo: &dyn BirdRepo, id: Uuid) -> Result<Profile> {
    let user = users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    let birds = repo.birds_by_photographer(id).await?;
    Ok(Profile { user, birds })
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub about_user: String,
    /// A new picture, if one was uploaded.
    pub profile_picture: Option<Vec<u8>>,
}

pub async fn update_profile(
    users: &dyn UserRepo,
    store: &dyn MediaStore,
    id: Uuid,
    changes: ProfileChanges,
    max_upload_bytes: usize,
) -> Result<User> {
    let about_user = validation::bounded_text(
        "about_user",
        changes.about_user.trim(),
        validation::MAX_ABOUT_USER_LEN,
    )?;
    let mut user = users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if let Some(picture) = changes.profile_picture {
        validation::picture(picture.len(), max_upload_bytes)?;
        user.profile_picture = Some(store.save_upload(picture, MediaKind::ProfilePicture).await?);
    }
    user.about_user = about_user;
    users.update_user(&user).await?;
    Ok(user)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChange {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

/// Replaces the password after checking the current one. New-password
/// problems are reported on `password1`/`password2`, as at signup.
pub async fn change_password(
    users: &dyn UserRepo,
    auth: &dyn AuthProvider,
    id: Uuid,
    form: PasswordChange,
) -> Result<()> {
    let user = users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if !auth.verify_password(&form.old_password, &user.password_hash) {
        return Err(AppError::invalid(
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        ));
    }
    validation::new_password(&form.new_password1, &form.new_password2)?;

    let hash = auth.hash_password(&form.new_password1)?;
    users.update_password(id, &hash).await?;
    log::info!("password changed for {}", user.username);
    Ok(())
}

pub async fn remove_account(users: &dyn UserRepo, id: Uuid) -> Result<()> {
    if !users.delete_user(id).await? {
        return Err(AppError::not_found("User", id));
    }
    log::info!("account {id} removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockAuthProvider, MockMediaStore, MockUserRepo};

    fn form() -> Signup {
        Signup {
            username: "ana".into(),
            email: "ana@example.com".into(),
            password1: "kingfisher".into(),
            password2: "kingfisher".into(),
        }
    }

    fn stored_user(hash: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password_hash: hash.into(),
            profile_picture: None,
            about_user: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn signup_hashes_the_password() {
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_username().returning(|_| Ok(None));
        users
            .expect_create_user()
            .withf(|u| u.password_hash == "hashed:kingfisher")
            .returning(|_| Ok(()));
        let mut auth = MockAuthProvider::new();
        auth.expect_hash_password()
            .returning(|p| Ok(format!("hashed:{p}")));

        let user = signup(&users, &auth, form()).await.unwrap();
        assert_eq!(user.username, "ana");
    }

    #[tokio::test]
    async fn taken_usernames_are_a_field_error() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_username()
            .returning(|_| Ok(Some(stored_user("x"))));
        users.expect_create_user().never();
        let auth = MockAuthProvider::new();

        let err = signup(&users, &auth, form()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "username", .. }));
    }

    #[tokio::test]
    async fn login_rejects_bad_passwords() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_username()
            .returning(|_| Ok(Some(stored_user("h"))));
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_password()
            .returning(|password, _| password == "right");

        assert!(login(&users, &auth, "ana", "right").await.is_ok());
        assert!(login(&users, &auth, "ana", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn forged_tokens_identify_nobody() {
        let users = MockUserRepo::new();
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_session().returning(|_| None);

        assert_eq!(identify(&users, &auth, "forged").await.unwrap(), None);
    }

    #[tokio::test]
    async fn profile_update_keeps_picture_without_upload() {
        let mut user = stored_user("h");
        user.profile_picture = Some("profile_pictures/a.png".into());
        let id = user.id;
        let mut users = MockUserRepo::new();
        users.expect_get_user().returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update_user()
            .withf(|u| {
                u.profile_picture.as_deref() == Some("profile_pictures/a.png")
                    && u.about_user == "Birder"
            })
            .returning(|_| Ok(()));
        let mut store = MockMediaStore::new();
        store.expect_save_upload().never();

        let changes = ProfileChanges {
            about_user: " Birder ".into(),
            profile_picture: None,
        };
        update_profile(&users, &store, id, changes, 1024).await.unwrap();
    }

    fn password_change(old: &str, new: &str, again: &str) -> PasswordChange {
        PasswordChange {
            old_password: old.into(),
            new_password1: new.into(),
            new_password2: again.into(),
        }
    }

    #[tokio::test]
    async fn password_change_stores_a_new_hash() {
        let user = stored_user("hashed:kingfisher");
        let id = user.id;
        let mut users = MockUserRepo::new();
        users.expect_get_user().returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update_password()
            .withf(move |uid, hash| *uid == id && hash == "hashed:sandpiper")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_password()
            .returning(|password, hash| hash == format!("hashed:{password}"));
        auth.expect_hash_password()
            .returning(|p| Ok(format!("hashed:{p}")));

        let form = password_change("kingfisher", "sandpiper", "sandpiper");
        change_password(&users, &auth, id, form).await.unwrap();
    }

    #[tokio::test]
    async fn password_change_needs_the_old_password() {
        let user = stored_user("hashed:kingfisher");
        let id = user.id;
        let mut users = MockUserRepo::new();
        users.expect_get_user().returning(move |_| Ok(Some(user.clone())));
        users.expect_update_password().never();
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_password()
            .returning(|password, hash| hash == format!("hashed:{password}"));

        let err = change_password(&users, &auth, id, password_change("heron", "sandpiper", "sandpiper"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "old_password", .. }));

        let err = change_password(&users, &auth, id, password_change("kingfisher", "sandpiper", "sanderling"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { field: "password2", .. }));
    }
}
