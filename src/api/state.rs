//! API state shared across all handlers.

use std::sync::Arc;

use crate::auth::{CookiePolicy, TokenIssuer};
use crate::models::User;
use crate::payments::ChargeIntentCreator;
use crate::storage::{ContestStore, Result};

pub struct AppState {
    pub store: Arc<dyn ContestStore>,
    pub tokens: TokenIssuer,
    pub cookies: CookiePolicy,
    pub charges: Arc<dyn ChargeIntentCreator>,
    pub currency: String,
}

impl AppState {
    /// The stored user record of a caller, used for role checks
    pub async fn caller(&self, email: &str) -> Result<Option<User>> {
        self.store.find_user(email).await
    }
}
