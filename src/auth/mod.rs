//! Administrator authentication: bootstrap key, password hashing and
//! session tokens.

mod extractor;

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Admin, SessionClaims};

pub use extractor::{AdminSession, AuthError, session_token};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "wg_session";
/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "wildlife-gallery";

/// Wrapper type for the bootstrap admin key.
/// Uses `SecretString` to prevent accidental logging and zeroize on drop.
#[derive(Clone)]
pub struct AdminKey(Option<SecretString>);

impl AdminKey {
    pub fn new(key: Option<SecretString>) -> Self {
        Self(key)
    }

    /// Compare the provided key with the stored admin key in constant time.
    ///
    /// Always false when no admin key is configured.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AdminKey([REDACTED])"),
            None => write!(f, "AdminKey(None)"),
        }
    }
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash checked when a login names no known account, so a miss costs the
/// same Argon2 work as a wrong password.
static UNKNOWN_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-account-placeholder").ok());

/// Check a login attempt against the stored hash, if an account was found.
///
/// Runs one Argon2 verification either way.
pub fn verify_login(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(ref dummy) = *UNKNOWN_ACCOUNT_HASH {
                let _ = verify_password(password, dummy);
            }
            false
        }
    }
}

/// Signing keys for admin session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: SecretString,
    ttl_secs: u64,
}

impl SessionKeys {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            ttl_secs: settings.ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a signed session token for an admin.
    pub fn issue(&self, admin: &Admin) -> AppResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.ttl_secs as i64);

        let claims = SessionClaims {
            sub: admin.id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            email: admin.email.clone(),
            name: admin.name.clone(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to create session token: {}", e)))
    }

    /// Verify a session token and return its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, String> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.validate_aud = false;

        let token_data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| format!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKeys([REDACTED], ttl={}s)", self.ttl_secs)
    }
}
