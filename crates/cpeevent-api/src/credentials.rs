use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use uuid::Uuid;

use cpeevent_db::Database;
use cpeevent_types::api::Claims;

const ACCESS_TTL_MINUTES: i64 = 15;
const REFRESH_TTL_HOURS: i64 = 168;

/// Hash with Argon2id (default cost) and a fresh salt.
pub fn hash_password(plaintext: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(hash: &str, plaintext: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token is malformed")]
    Malformed,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and checks HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Access token: student id, access level, 15 minutes.
    /// Refresh token: expiry plus a random id, 7 days.
    pub fn issue_pair(&self, student_id: &str, access: i32) -> anyhow::Result<TokenPair> {
        let now = Utc::now();

        let access_token = self.sign(&Claims {
            student_id: Some(student_id.to_string()),
            access: Some(access),
            jti: None,
            exp: (now + Duration::minutes(ACCESS_TTL_MINUTES)).timestamp(),
        })?;
        let refresh_token = self.sign(&Claims {
            student_id: None,
            access: None,
            jti: Some(Uuid::new_v4().to_string()),
            exp: (now + Duration::hours(REFRESH_TTL_HOURS)).timestamp(),
        })?;

        Ok(TokenPair {
            access: access_token,
            refresh: refresh_token,
        })
    }

    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Expiry is checked first, so an expired token reports `Expired` even
    /// when its signature would not verify.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut peek = Validation::new(Algorithm::HS256);
        peek.insecure_disable_signature_validation();
        peek.validate_exp = false;

        let unverified = decode::<Claims>(token, &self.decoding, &peek)
            .map_err(|_| TokenError::Malformed)?;
        if unverified.claims.exp < Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

/// Record `pair` as the user's single active session.
pub fn persist_token_pair(db: &Database, student_id: &str, pair: &TokenPair) -> anyhow::Result<bool> {
    db.update_tokens(student_id, Some(&pair.access), Some(&pair.refresh))
}
