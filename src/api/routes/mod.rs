//! API route handlers.
//!
//! Each submodule handles a specific group of endpoints:
//! - `session`: credential cookie issue and logout (public)
//! - `users`: profiles (owner) and user administration (admin)
//! - `contests`: public listings, creator management, admin review, winners
//! - `participations`: contest entries, task submission, win-rate stats
//! - `payments`: entry-fee payment intents

pub mod contests;
pub mod participations;
pub mod payments;
pub mod session;
pub mod users;

pub use contests::{
    all_contests, change_status, create_contest, delete_contest, get_contest, get_winners,
    list_contests, my_contests, popular_contests, select_winner, update_contest,
};
pub use participations::{is_participated, participate, submit_task, total_submitted, user_stats};
pub use payments::create_payment_intent;
pub use session::{clear_cookie, health_check, issue_token};
pub use users::{change_role, delete_user, get_user, list_users, update_profile, upsert_user};
