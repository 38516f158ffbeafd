//! Session validation for the HTTP boundary.
//!
//! Handlers never see tokens. The [`require_session`] middleware resolves the
//! bearer token through a [`SessionValidator`] and stores the resulting
//! [`Session`] in the request extensions, where the `Session` extractor picks
//! it up.

use crate::error::HttpAppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mediastore_core::AppError;
use std::collections::HashMap;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub roles: Vec<String>,
}

#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Resolve a bearer token. `None` means the token is unknown or expired.
    async fn validate(&self, token: &str) -> Option<Session>;
}

/// Fixed token table, loaded from `API_TOKENS`.
#[derive(Default)]
pub struct StaticSessionValidator {
    sessions: HashMap<String, Session>,
}

impl StaticSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: &str, roles: &[&str]) -> Self {
        self.sessions.insert(
            token.to_string(),
            Session {
                user_id: user_id.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    /// Parse `token=user[:role+role],...`.
    pub fn parse(spec: &str) -> Result<Self, anyhow::Error> {
        let mut validator = Self::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, subject) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("API_TOKENS entry is missing '='"))?;
            let (user_id, roles) = match subject.split_once(':') {
                Some((user, roles)) => (user, roles.split('+').collect::<Vec<_>>()),
                None => (subject, Vec::new()),
            };
            let (token, user_id) = (token.trim(), user_id.trim());
            if token.is_empty() || user_id.is_empty() {
                return Err(anyhow::anyhow!("API_TOKENS entries need a token and a user id"));
            }
            let roles: Vec<&str> = roles.into_iter().map(str::trim).filter(|r| !r.is_empty()).collect();
            validator = validator.with_token(token, user_id, &roles);
        }
        Ok(validator)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionValidator for StaticSessionValidator {
    async fn validate(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).cloned()
    }
}

fn bearer_token(request: &Request) -> Result<String, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return HttpAppError(e).into_response(),
    };

    match state.sessions.validate(&token).await {
        Some(session) => {
            tracing::debug!(user_id = %session.user_id, "Session authenticated");
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "Rejected unknown session token");
            HttpAppError(AppError::Unauthorized("Invalid or expired session".to_string()))
                .into_response()
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Authentication required".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_tokens() {
        let validator = StaticSessionValidator::parse("abc=alice:admin+editor, def=bob").unwrap();
        assert_eq!(validator.len(), 2);

        let alice = validator.validate("abc").await.unwrap();
        assert_eq!(alice.user_id, "alice");
        assert_eq!(alice.roles, vec!["admin".to_string(), "editor".to_string()]);

        let bob = validator.validate("def").await.unwrap();
        assert!(bob.roles.is_empty());
        assert!(validator.validate("nope").await.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(StaticSessionValidator::parse("abc").is_err());
        assert!(StaticSessionValidator::parse("=alice").is_err());
        assert!(StaticSessionValidator::parse("").unwrap().is_empty());
    }
}
