//! # wh-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Sessions are stateless: the cookie carries the user id, the issue time
//! and an HMAC-SHA256 tag over both, keyed with the configured secret.
//! Tokens older than the session lifetime are refused.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use uuid::Uuid;
use wh_core::traits::AuthProvider;

type HmacSha256 = Hmac<Sha256>;

/// Two weeks.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 14 * 24 * 60 * 60;

/// Clock skew tolerated on the issue time.
const MAX_SKEW_SECS: i64 = 60;

pub struct SimpleAuthProvider {
    /// Keyed with the session secret; changing the secret logs everyone out.
    signer: HmacSha256,
    ttl: Duration,
}

impl SimpleAuthProvider {
    pub fn new(secret: SecretString) -> anyhow::Result<Self> {
        let signer = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?;
        Ok(Self {
            signer,
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        })
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn tag(&self, user_id: Uuid, issued: i64) -> HmacSha256 {
        let mut mac = self.signer.clone();
        mac.update(user_id.as_bytes());
        mac.update(&issued.to_be_bytes());
        mac
    }

    fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> String {
        let issued = now.timestamp();
        let tag = self.tag(user_id, issued).finalize().into_bytes();
        format!("{user_id}.{issued}.{}", hex::encode(tag))
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Uuid> {
        let mut parts = token.splitn(3, '.');
        let user_id = Uuid::parse_str(parts.next()?).ok()?;
        let issued: i64 = parts.next()?.parse().ok()?;
        let tag = hex::decode(parts.next()?).ok()?;
        self.tag(user_id, issued).verify_slice(&tag).ok()?;

        let age = now.timestamp() - issued;
        if age > self.ttl.num_seconds() || age < -MAX_SKEW_SECS {
            return None;
        }
        Some(user_id)
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let mut raw_salt = [0u8; 16];
        getrandom::getrandom(&mut raw_salt)?;
        let salt = SaltString::encode_b64(&raw_salt)
            .map_err(|e| anyhow::anyhow!("could not encode salt: {e}"))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("could not hash password: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Format: `<uuid>.<unix seconds>.<hex tag>`
    fn issue_session(&self, user_id: Uuid) -> String {
        self.issue_at(user_id, Utc::now())
    }

    fn verify_session(&self, token: &str) -> Option<Uuid> {
        self.verify_at(token, Utc::now())
    }
}
