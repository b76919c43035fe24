//! Data access against tenant databases.

pub mod users;

pub use users::{User, UserService};
