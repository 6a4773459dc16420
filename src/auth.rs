//! Authentication and Authorization Module
//!
//! Provides:
//! - Credential token issue/verification (HS256, short-lived)
//! - Credential cookie construction and clearing
//! - The [`Identity`] extractor used by protected routes
//! - Ownership and role checks applied after identity is known

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::state::AppState;
use crate::error::ApiError;
use crate::models::{Contest, Role, User};
use crate::storage::{self, ContestStore};

/// Name of the cookie carrying the credential token
pub const TOKEN_COOKIE: &str = "token";

/// Default credential lifetime (one hour)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

// ============================================================================
// TOKENS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies credential tokens with the server secret
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `email` valid for the configured lifetime
    pub fn issue(&self, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        self.issue_at(email, now)
    }

    fn issue_at(&self, email: &str, now: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Token verification failed: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// COOKIES
// ============================================================================

/// Cookie attributes for the credential
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    /// Cross-site capable (`Secure; SameSite=None`). Off only for local HTTP.
    pub secure: bool,
}

impl CookiePolicy {
    fn attributes(&self, max_age: i64) -> String {
        let site = if self.secure {
            "Secure; SameSite=None"
        } else {
            "SameSite=Strict"
        };
        format!("HttpOnly; Path=/; Max-Age={}; {}", max_age, site)
    }

    pub fn set_cookie(&self, token: &str, ttl_secs: i64) -> Result<HeaderValue, ApiError> {
        let cookie = format!("{}={}; {}", TOKEN_COOKIE, token, self.attributes(ttl_secs));
        HeaderValue::from_str(&cookie).map_err(|_| ApiError::Internal)
    }

    pub fn clear_cookie(&self) -> HeaderValue {
        let cookie = format!("{}=; {}", TOKEN_COOKIE, self.attributes(0));
        HeaderValue::from_str(&cookie)
            .unwrap_or_else(|_| HeaderValue::from_static("token=; Max-Age=0"))
    }
}

/// Find the credential token among the request's `Cookie` headers
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

// ============================================================================
// IDENTITY GUARD
// ============================================================================

/// A verified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

/// Missing credential → `Unauthorized`; present but invalid or expired → `Forbidden`
pub fn authenticate(issuer: &TokenIssuer, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = token_from_headers(headers).ok_or(ApiError::Unauthorized)?;
    let claims = issuer.verify(&token).ok_or(ApiError::Forbidden)?;
    Ok(Identity {
        email: claims.email,
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&state.tokens, &parts.headers)
    }
}

// ============================================================================
// OWNERSHIP FILTER
// ============================================================================

fn short(email: &str) -> String {
    email.chars().take(24).collect()
}

/// Allow only when the verified identity is exactly the target (case-sensitive)
pub fn ensure_owner(identity: &Identity, target_email: &str) -> Result<(), ApiError> {
    if identity.email == target_email {
        Ok(())
    } else {
        warn!(
            "Ownership check failed: {} tried to act as {}",
            short(&identity.email),
            short(target_email)
        );
        Err(ApiError::Forbidden)
    }
}

/// Allow only callers whose stored role is one of `roles`
pub fn ensure_role(
    identity: &Identity,
    caller: Option<&User>,
    roles: &[Role],
) -> Result<(), ApiError> {
    match caller {
        Some(user) if roles.contains(&user.role) => Ok(()),
        _ => {
            warn!(
                "Role check failed for {} (needs one of {:?})",
                short(&identity.email),
                roles
            );
            Err(ApiError::Forbidden)
        }
    }
}

/// Allow the contest's creator or any administrator
pub fn ensure_creator_or_admin(
    identity: &Identity,
    caller: Option<&User>,
    contest: &Contest,
) -> Result<(), ApiError> {
    if contest.contest_creator.email == identity.email {
        return Ok(());
    }
    ensure_role(identity, caller, &[Role::Admin])
}

// ============================================================================
// ADMIN BOOTSTRAP
// ============================================================================

/// Make sure every email in `emails` has a user record with the admin role.
///
/// Missing users are created first. Returns how many records were promoted.
pub async fn bootstrap_admins(
    store: &dyn ContestStore,
    emails: &[String],
) -> storage::Result<u64> {
    let mut promoted = 0;
    for email in emails.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        store
            .insert_user_if_absent(&User::new(email, None, None))
            .await?;
        let Some(user) = store.find_user(email).await? else {
            continue;
        };
        if user.role == Role::Admin {
            continue;
        }
        promoted += store.set_role(&user.id, Role::Admin).await?;
        info!("Granted admin role to {}", short(email));
    }
    Ok(promoted)
}
