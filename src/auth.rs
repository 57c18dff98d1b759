use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use rand::{thread_rng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    handlers::{validation_error, FieldError},
    models::PublicUser,
    repositories::user_repository::{self, CreateUserData},
    AppState,
};

const TOKEN_LENGTH: usize = 32; // 32 random bytes per session token

// TODO: move sessions into the database so they survive restarts.

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    username: String,
    expires_at: Instant,
}

/// In-memory session-token store. Tokens are opaque random strings handed
/// out at login and resolved on every authenticated request.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        let store = Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        };
        // Background task purging expired sessions periodically.
        let store_clone = store.clone();
        tokio::spawn(async move {
            store_clone.purge_expired_periodically().await;
        });
        store
    }

    /// Issues a new token for the given user.
    pub fn create(&self, user_id: Uuid, username: String) -> String {
        let mut bytes = vec![0u8; TOKEN_LENGTH];
        thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(&bytes);

        let session = Session {
            user_id,
            username,
            expires_at: Instant::now() + self.ttl,
        };
        self.sessions.insert(token.clone(), session);
        token
    }

    /// Resolves a token to its user, if the session exists and has not
    /// expired.
    pub fn resolve(&self, token: &str) -> Option<(Uuid, String)> {
        let entry = self.sessions.get(token)?;
        if entry.expires_at > Instant::now() {
            Some((entry.user_id, entry.username.clone()))
        } else {
            None
        }
    }

    /// Drops a session, logging the user out.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn purge_expired(&self) {
        self.sessions
            .retain(|_, session| session.expires_at > Instant::now());
    }

    async fn purge_expired_periodically(&self) {
        let mut interval = tokio::time::interval(self.ttl);
        loop {
            interval.tick().await;
            self.purge_expired();
        }
    }
}

// --- Error Types ---

#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MissingCredentials,

    #[error("Invalid or expired session token")]
    InvalidSession,

    #[error("Invalid username or password")]
    BadLogin,

    #[error("Internal server error during authentication")]
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::BadLogin => StatusCode::UNAUTHORIZED,
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

// --- Authenticated User Extractor ---

/// Extracted when a request carries a valid `Authorization: Bearer` session
/// token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingCredentials)?;

        let app_state = AppState::from_ref(state);
        let (user_id, username) = app_state
            .session_store
            .resolve(bearer.token())
            .ok_or(AuthError::InvalidSession)?;

        Ok(AuthenticatedUser {
            id: user_id,
            username,
        })
    }
}

// --- Password hashing ---

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// --- Auth Endpoints ---

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

fn validate_registration(payload: &RegisterPayload) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let username = payload.username.trim();
    if username.is_empty() || username.len() > 150 {
        errors.push(FieldError::new(
            "username",
            "Username must be 1-150 characters",
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        errors.push(FieldError::new(
            "username",
            "Username may contain only letters, digits and . - _",
        ));
    }
    if !payload.email.contains('@') {
        errors.push(FieldError::new("email", "Enter a valid email address"));
    }
    if payload.password.len() < 8 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    errors
}

/// Handler to register a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let errors = validate_registration(&payload);
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password during registration");
            return AuthError::InternalError.into_response();
        }
    };

    let user_data = CreateUserData {
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_string(),
        display_name: payload.display_name.trim().to_string(),
        password_hash,
    };

    match user_repository::create_user(&state.db_pool, user_data).await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "Registered new user");
            (StatusCode::CREATED, Json(PublicUser::from(user))).into_response()
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": "Username is already taken" })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to create user" })),
            )
                .into_response()
        }
    }
}

/// Handler to log in and receive a session token.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let user = match user_repository::get_user_by_username(&state.db_pool, &payload.username).await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(username = %payload.username, "Login attempt for unknown user");
            return AuthError::BadLogin.into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to look up user during login");
            return AuthError::InternalError.into_response();
        }
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(username = %user.username, "Login attempt with wrong password");
        return AuthError::BadLogin.into_response();
    }

    let token = state.session_store.create(user.id, user.username.clone());
    info!(user_id = %user.id, username = %user.username, "User logged in");
    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            user: PublicUser::from(user),
        }),
    )
        .into_response()
}

/// Handler to log out, revoking the presented session token.
pub async fn logout_handler(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Response {
    if state.session_store.revoke(bearer.token()) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        AuthError::InvalidSession.into_response()
    }
}
