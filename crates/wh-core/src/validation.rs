//! Field rules applied before anything reaches a repository.

use crate::error::{AppError, Result};
use crate::models::{BirdChanges, NewBird};

pub const MAX_SPECIES_LEN: usize = 150;
pub const MAX_LOCATION_LEN: usize = 200;
pub const MAX_PHOTOGRAPHER_COMMENT_LEN: usize = 500;
pub const MAX_COMMENT_LEN: usize = 600;
pub const MAX_REPLY_LEN: usize = 600;
pub const MAX_ABOUT_USER_LEN: usize = 1000;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Required text of bounded length, counted in characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(field, "This field is required."));
    }
    bounded_text(field, trimmed, max)
}

/// Optional text of bounded length, counted in characters.
pub fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<String> {
    let len = value.chars().count();
    if len > max {
        return Err(AppError::invalid(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        ));
    }
    Ok(value.to_string())
}

pub fn comment_text(value: &str) -> Result<String> {
    required_text("comment", value, MAX_COMMENT_LEN)
}

pub fn reply_text(value: &str) -> Result<String> {
    required_text("reply", value, MAX_REPLY_LEN)
}

/// Rejects empty and oversized pictures. Whether the bytes decode as an image
/// is the media store's call.
pub fn picture(size: usize, max_bytes: usize) -> Result<()> {
    if size == 0 {
        return Err(AppError::invalid("picture", "This field is required."));
    }
    if size > max_bytes {
        return Err(AppError::invalid(
            "picture",
            format!(
                "File too large. Size should not exceed {} MB.",
                max_bytes as f64 / (1024.0 * 1024.0)
            ),
        ));
    }
    Ok(())
}

impl NewBird {
    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            species: required_text("species", &self.species, MAX_SPECIES_LEN)?,
            location: required_text("location", &self.location, MAX_LOCATION_LEN)?,
            photographer_comment: required_text(
                "photographer_comment",
                &self.photographer_comment,
                MAX_PHOTOGRAPHER_COMMENT_LEN,
            )?,
        })
    }
}

impl BirdChanges {
    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            species: required_text("species", &self.species, MAX_SPECIES_LEN)?,
            location: required_text("location", &self.location, MAX_LOCATION_LEN)?,
            photographer_comment: required_text(
                "photographer_comment",
                &self.photographer_comment,
                MAX_PHOTOGRAPHER_COMMENT_LEN,
            )?,
        })
    }
}

pub fn username(value: &str) -> Result<String> {
    let name = required_text("username", value, MAX_USERNAME_LEN)?;
    let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
    if !name.chars().all(allowed) {
        return Err(AppError::invalid(
            "username",
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(name)
}

pub fn email(value: &str) -> Result<String> {
    let email = required_text("email", value, 300)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::invalid("email", "Enter a valid email address.")),
    }
}

pub fn new_password(password: &str, confirmation: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(
            "password1",
            format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    if password != confirmation {
        return Err(AppError::invalid(
            "password2",
            "The two password fields didn't match.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: AppError) -> &'static str {
        match err {
            AppError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn comment_length_is_counted_in_chars() {
        assert!(comment_text(&"é".repeat(600)).is_ok());
        assert_eq!(field_of(comment_text(&"a".repeat(601)).unwrap_err()), "comment");
    }

    #[test]
    fn blank_reply_is_rejected() {
        assert_eq!(field_of(reply_text("   ").unwrap_err()), "reply");
    }

    #[test]
    fn new_bird_reports_the_first_bad_field() {
        let bird = NewBird {
            species: "Grey Heron".into(),
            location: "x".repeat(201),
            photographer_comment: "Standing still".into(),
        };
        assert_eq!(field_of(bird.validate().unwrap_err()), "location");
    }

    #[test]
    fn new_bird_trims_values() {
        let bird = NewBird {
            species: "  Grey Heron ".into(),
            location: "Lisbon".into(),
            photographer_comment: "Standing still".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(bird.species, "Grey Heron");
    }

    #[test]
    fn picture_limits() {
        assert!(picture(1024, 2048).is_ok());
        assert_eq!(field_of(picture(0, 2048).unwrap_err()), "picture");
        assert_eq!(field_of(picture(4096, 2048).unwrap_err()), "picture");
    }

    #[test]
    fn usernames_and_passwords() {
        assert!(username("bird_watcher.42").is_ok());
        assert_eq!(field_of(username("no spaces").unwrap_err()), "username");
        assert!(new_password("longenough", "longenough").is_ok());
        assert_eq!(field_of(new_password("short", "short").unwrap_err()), "password1");
        assert_eq!(field_of(new_password("longenough", "different").unwrap_err()), "password2");
    }

    #[test]
    fn email_shape() {
        assert!(email("a@b.pt").is_ok());
        assert_eq!(field_of(email("nobody").unwrap_err()), "email");
    }
}
