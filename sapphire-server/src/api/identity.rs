//! Pseudo-auth from request headers
//!
//! The platform identifies callers by `x-user-email` / `x-user-role`
//! headers set by the SPA. There is no session or token verification; the
//! headers are trusted as-is.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use sapphire_common::db::models::User;
use sqlx::SqlitePool;
use std::convert::Infallible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Supervisor => "supervisor",
        }
    }
}

/// Caller identity extracted from headers
///
/// Anything other than an exact (case-insensitive) "supervisor" role is
/// treated as a student.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: Option<String>,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_lowercase());
        let role = match role.as_deref() {
            Some("supervisor") => Role::Supervisor,
            _ => Role::Student,
        };

        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Identity { email, role })
    }
}

impl Identity {
    /// Look up the caller's user row without creating one
    pub async fn find_user(&self, db: &SqlitePool) -> Result<Option<User>, sqlx::Error> {
        match &self.email {
            Some(email) => find_user_by_email(db, email).await,
            None => Ok(None),
        }
    }

    /// Get-or-create the caller's user row by email
    ///
    /// Task and deadline listing auto-provision users so a fresh browser
    /// profile sees its own empty workspace instead of an error.
    pub async fn resolve_user(&self, db: &SqlitePool) -> Result<Option<User>, sqlx::Error> {
        let email = match &self.email {
            Some(email) => email,
            None => return Ok(None),
        };

        if let Some(user) = find_user_by_email(db, email).await? {
            return Ok(Some(user));
        }

        // INSERT OR IGNORE + re-select keeps concurrent first requests from
        // the same browser racing each other on the UNIQUE(email) constraint
        sqlx::query(
            "INSERT OR IGNORE INTO users (email, password_hash, role, created_at) VALUES (?, '', ?, ?)",
        )
        .bind(email)
        .bind(self.role.as_str())
        .bind(Utc::now())
        .execute(db)
        .await?;

        find_user_by_email(db, email).await
    }
}

async fn find_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, role, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await
}
