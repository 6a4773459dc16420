//! Contestify contest platform server
//!
//! Users sign in with an email-bound credential cookie, creators submit
//! contests for admin review, participants pay an entry fee, enter accepted
//! contests and submit tasks, and creators pick a winner.
//!
//! ## Module Structure
//!
//! - `models`: stored documents (users, contests, participations)
//! - `storage`: the `ContestStore` trait with memory and PostgreSQL backends
//! - `auth`: credential tokens, cookies and authorization checks
//! - `contest`: listing filters, review state machine, winner selection
//! - `ledger`: contest entries, task submission, win-rate statistics
//! - `payments`: payment processor charge intents
//! - `api`: axum handlers and shared state
//! - `server`: router assembly and startup
//! - `config`: CLI/environment configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod contest;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payments;
pub mod server;
pub mod storage;

pub use api::AppState;
pub use auth::{bootstrap_admins, CookiePolicy, Identity, TokenIssuer};
pub use config::{ServerConfig, StorageBackend};
pub use error::ApiError;
pub use models::{Contest, ContestStatus, Participation, Person, Role, User};
pub use payments::{ChargeIntentCreator, StripeCharges, UnconfiguredCharges};
pub use server::{build_router, run_server};
pub use storage::{ContestStore, MemoryStore, PgStore};
