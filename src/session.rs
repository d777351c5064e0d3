//! Password hashing and signed bearer tokens.
//!
//! A token carries only the user id and email. Roles are never read from it;
//! callers re-fetch the account on every request.

use crate::app_config::AuthConfig;
use crate::error::AppError;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Hashes a plain text password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    get_argon2()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::Server("Failed to create user".to_owned())
        })
}

/// Constant-time comparison of `password` against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i32,
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens.
#[derive(Clone)]
pub struct Sessions {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    remember_me_ttl: Duration,
}

impl Sessions {
    pub fn new(secret: &[u8], token_days: i64, remember_me_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl: Duration::days(token_days),
            remember_me_ttl: Duration::days(remember_me_days),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            log::warn!("auth.jwt_secret is not set. Issued tokens will be invalidated every time the application is restarted.");
            Self::new(
                random_string.as_bytes(),
                config.token_days,
                config.remember_me_days,
            )
        } else {
            Self::new(
                config.jwt_secret.as_bytes(),
                config.token_days,
                config.remember_me_days,
            )
        }
    }

    /// Issues a token with the regular lifetime, or the extended one when
    /// `remember_me` is set.
    pub fn issue(
        &self,
        user_id: i32,
        email: Option<&str>,
        remember_me: bool,
    ) -> Result<String, AppError> {
        let ttl = if remember_me {
            self.remember_me_ttl
        } else {
            self.ttl
        };
        self.issue_with_ttl(user_id, email, ttl)
    }

    pub fn issue_with_ttl(
        &self,
        user_id: i32,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            email: email.map(str::to_owned),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            log::error!("Failed to sign token: {}", e);
            AppError::Server("Failed to issue token".to_owned())
        })
    }

    /// Checks signature and expiry. Every failure reads the same to the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {}", e);
                AppError::unauthenticated()
            })
    }
}
