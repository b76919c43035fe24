//! HTTP handlers for login, tenant-scoped reads and registry administration.

pub mod admin;
pub mod auth;
pub mod users;
pub use admin::*;
pub use auth::*;
pub use users::*;
