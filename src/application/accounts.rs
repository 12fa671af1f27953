//! Sign-up, login and cookie sessions.
//!
//! Session tokens have the shape `<session id>.<secret>`. Only the SHA-256 digest
//! of the secret is persisted and it is compared in constant time.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::types::Member;
use crate::domain::users::{validate_password, validate_username};

const TOKEN_SEPARATOR: char = '.';
const MIN_SECRET_LEN: usize = 32;
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account form is invalid")]
    Invalid(Box<AccountFormErrors>),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AccountError {
    fn invalid(error: DomainError) -> Self {
        let mut errors = AccountFormErrors::default();
        errors.record(error);
        Self::Invalid(Box::new(errors))
    }

    fn duplicate_username() -> Self {
        Self::invalid(DomainError::validation("username", DUPLICATE_USERNAME))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFormErrors {
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl AccountFormErrors {
    fn record(&mut self, error: DomainError) {
        let message = error.message().to_string();
        match error.field() {
            Some("password") => self.password = Some(message),
            Some("password_confirm") => self.password_confirm = Some(message),
            _ => self.username = Some(message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub member: Member,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Create an account without starting a session.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, AccountError> {
        let username = validate_username(username).map_err(AccountError::invalid)?;
        validate_password(password, password).map_err(AccountError::invalid)?;

        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(AccountError::duplicate_username());
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::duplicate_username(),
                other => AccountError::Repo(other),
            })?;

        info!(user = %user.username, user_id = user.id, "account created");
        Ok(user)
    }

    pub async fn signup(&self, input: SignupInput) -> Result<IssuedSession, AccountError> {
        let mut errors = AccountFormErrors::default();
        if let Err(err) = validate_username(&input.username) {
            errors.record(err);
        }
        if let Err(err) = validate_password(&input.password, &input.password_confirm) {
            errors.record(err);
        }
        if errors != AccountFormErrors::default() {
            return Err(AccountError::Invalid(Box::new(errors)));
        }

        let user = self.register(&input.username, &input.password).await?;
        self.start_session(&user).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            debug!(user = %user.username, "password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        self.start_session(&user).await
    }

    pub async fn start_session(&self, user: &UserRecord) -> Result<IssuedSession, AccountError> {
        let id = Uuid::new_v4();
        let secret = generate_secret();
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.session_ttl;

        self.sessions
            .create_session(SessionRecord {
                id,
                secret_hash: hash_secret(&secret),
                user_id: user.id,
                created_at: now,
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            member: Member {
                id: user.id,
                username: user.username.clone(),
            },
            token: format!("{}{TOKEN_SEPARATOR}{secret}", id.simple()),
            expires_at,
        })
    }

    /// Resolve a session token to the member it belongs to.
    ///
    /// Malformed, unknown, mismatched and expired tokens all resolve to `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Member>, AccountError> {
        let Some((id, secret)) = parse_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_session(id).await? else {
            return Ok(None);
        };

        let hashed_input = hash_secret(secret);
        if session.secret_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }

        if session.is_expired(OffsetDateTime::now_utc()) {
            self.sessions.delete_session(session.id).await?;
            return Ok(None);
        }

        Ok(self
            .users
            .find_user_by_id(session.user_id)
            .await?
            .map(|user| Member {
                id: user.id,
                username: user.username,
            }))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some((id, secret)) = parse_token(token)
            && let Some(session) = self.sessions.find_session(id).await?
            && session.secret_hash.ct_eq(&hash_secret(secret)).unwrap_u8() == 1
        {
            self.sessions.delete_session(session.id).await?;
        }
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AccountError> {
        Ok(self
            .sessions
            .delete_expired_sessions(OffsetDateTime::now_utc())
            .await?)
    }
}

fn parse_token(token: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = token.trim().split_once(TOKEN_SEPARATOR)?;
    if secret.len() < MIN_SECRET_LEN {
        return None;
    }
    let id = Uuid::try_parse(id).ok()?;
    Some((id, secret))
}

fn generate_secret() -> String {
    let mut raw = [0u8; 32];
    raw[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    raw[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(raw)
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|err| AccountError::Hashing(err.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored).map_err(|err| AccountError::Hashing(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}
