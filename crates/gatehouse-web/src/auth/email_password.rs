//! In-process email/password provider.
//!
//! Users and sessions live in memory. Routes, relative to the base path:
//!
//! | method | route            |                                   |
//! |--------|------------------|-----------------------------------|
//! | POST   | `/sign-up/email` | create account, sign in           |
//! | POST   | `/sign-in/email` | sign in                           |
//! | POST   | `/sign-out`      | drop the current session          |
//! | GET    | `/get-session`   | current session and user, or null |

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cookie::{Cookie, SameSite};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatehouse_core::auth_errors::{
    FAILED_TO_CREATE_USER, INTERNAL_ERROR, INVALID_EMAIL_OR_PASSWORD, INVALID_REQUEST_BODY,
    NOT_FOUND, USER_ALREADY_EXISTS, VALIDATION_FAILED,
};
use gatehouse_core::{validate_signup, SignupForm};
use serde::de::DeserializeOwned;

use super::extractor::session_token;
use super::password::{hash_password_blocking, verify_password_blocking};
use super::session::SessionStore;
use super::{AuthContext, AuthOutcome, AuthProvider, AuthProviderError};
use crate::config::AuthConfig;
use crate::dto::{
    AuthResponse, SessionResponse, SessionView, SignInRequest, SignOutResponse, UserView,
};

const MAX_AUTH_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct UserRecord {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    created_at: u64,
}

impl UserRecord {
    fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

pub struct EmailPasswordProvider {
    base_path: String,
    cookie_name: String,
    secure_cookie: bool,
    users: DashMap<String, UserRecord>,
    /// Normalized email → user id.
    emails: DashMap<String, String>,
    sessions: SessionStore,
}

impl EmailPasswordProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            base_path: config.base_path.clone(),
            cookie_name: config.cookie_name.clone(),
            secure_cookie: false,
            users: DashMap::new(),
            emails: DashMap::new(),
            sessions: SessionStore::new(config.session_ttl_seconds),
        }
    }

    /// Mark the session cookie `Secure`; set when serving over TLS.
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The user owning the live session `token`.
    pub fn current_user(&self, token: &str) -> Option<UserView> {
        let session = self.sessions.get(token)?;
        self.users.get(&session.user_id).map(|user| user.view())
    }

    pub fn cleanup_expired_sessions(&self) -> usize {
        self.sessions.cleanup_expired()
    }

    async fn sign_up(&self, request: Request<Body>) -> Result<Response, AuthProviderError> {
        let form: SignupForm = read_json(request).await?;

        if let Err(errors) = validate_signup(&form) {
            let details = serde_json::to_value(&errors).unwrap_or_default();
            return Err(
                AuthProviderError::new(StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_FAILED)
                    .with_details(details),
            );
        }

        let email = normalize_email(&form.email);
        if self.emails.contains_key(&email) {
            return Err(user_exists());
        }

        let password_hash = hash_password_blocking(form.password).await.map_err(|e| {
            tracing::error!("Password hashing failed: {e:#}");
            AuthProviderError::new(StatusCode::INTERNAL_SERVER_ERROR, FAILED_TO_CREATE_USER)
        })?;

        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            email: email.clone(),
            password_hash,
            created_at: unix_now(),
        };

        // Two sign-ups for one address may both pass the check above while
        // hashing; only the first to claim the email wins.
        match self.emails.entry(email) {
            Entry::Occupied(_) => return Err(user_exists()),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        tracing::info!(user_id = %user.id, "user signed up");

        Ok(self.signed_in(&user))
    }

    async fn sign_in(&self, request: Request<Body>) -> Result<Response, AuthProviderError> {
        let body: SignInRequest = read_json(request).await?;
        let email = normalize_email(&body.email);

        let user = self
            .emails
            .get(&email)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone()));
        let Some(user) = user else {
            tracing::warn!("Sign-in for unknown email");
            return Err(invalid_credentials());
        };

        let valid = verify_password_blocking(user.password_hash.clone(), body.password)
            .await
            .map_err(|e| {
                tracing::error!("Password verification failed: {e:#}");
                AuthProviderError::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            })?;
        if !valid {
            tracing::warn!(user_id = %user.id, "Sign-in with wrong password");
            return Err(invalid_credentials());
        }

        tracing::info!(user_id = %user.id, "user signed in");
        Ok(self.signed_in(&user))
    }

    fn sign_out(&self, request: &Request<Body>) -> Response {
        if let Some(token) = session_token(request.headers(), &self.cookie_name) {
            if self.sessions.remove(&token) {
                tracing::debug!("session revoked");
            }
        }

        (
            StatusCode::OK,
            [(header::SET_COOKIE, self.removal_cookie())],
            Json(SignOutResponse { success: true }),
        )
            .into_response()
    }

    fn get_session(&self, request: &Request<Body>) -> Response {
        let current = session_token(request.headers(), &self.cookie_name).and_then(|token| {
            let session = self.sessions.get(&token)?;
            let user = self.users.get(&session.user_id)?.view();
            Some(SessionResponse {
                session: SessionView {
                    user_id: session.user_id.clone(),
                    issued_at: session.issued_at,
                    expires_at: self.sessions.expires_at(&session),
                },
                user,
            })
        });

        match current {
            Some(body) => Json(body).into_response(),
            None => Json(serde_json::Value::Null).into_response(),
        }
    }

    fn signed_in(&self, user: &UserRecord) -> Response {
        let token = self.sessions.create(&user.id);
        let cookie = self.session_cookie(&token, self.sessions.ttl());
        let body = AuthResponse {
            token,
            user: user.view(),
        };
        (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
    }

    fn session_cookie(&self, token: &str, max_age: Duration) -> String {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((self.cookie_name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build()
            .to_string()
    }

    fn removal_cookie(&self) -> String {
        let mut cookie = Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .build();
        cookie.make_removal();
        cookie.to_string()
    }
}

#[async_trait]
impl AuthProvider for EmailPasswordProvider {
    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn handle(
        &self,
        route: &str,
        request: Request<Body>,
        ctx: &AuthContext,
    ) -> Result<AuthOutcome, AuthProviderError> {
        if ctx.building {
            return Ok(AuthOutcome::Declined(request));
        }

        let response = match (request.method().clone(), route) {
            (Method::POST, "/sign-up/email") => self.sign_up(request).await?,
            (Method::POST, "/sign-in/email") => self.sign_in(request).await?,
            (Method::POST, "/sign-out") => self.sign_out(&request),
            (Method::GET, "/get-session") => self.get_session(&request),
            _ => return Err(AuthProviderError::new(StatusCode::NOT_FOUND, NOT_FOUND)),
        };
        Ok(AuthOutcome::Handled(response))
    }
}

async fn read_json<T: DeserializeOwned>(request: Request<Body>) -> Result<T, AuthProviderError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_AUTH_BODY_BYTES)
        .await
        .map_err(|_| AuthProviderError::new(StatusCode::BAD_REQUEST, INVALID_REQUEST_BODY))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!("Rejected auth body: {e}");
        AuthProviderError::new(StatusCode::BAD_REQUEST, INVALID_REQUEST_BODY)
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_exists() -> AuthProviderError {
    AuthProviderError::new(StatusCode::UNPROCESSABLE_ENTITY, USER_ALREADY_EXISTS)
}

fn invalid_credentials() -> AuthProviderError {
    AuthProviderError::new(StatusCode::UNAUTHORIZED, INVALID_EMAIL_OR_PASSWORD)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
