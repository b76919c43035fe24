//! bcrypt password checks, run off the async workers.

use crate::error::AppError;
use std::sync::OnceLock;

/// Hash checked when the user does not exist, so that a miss costs the same
/// as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| bcrypt::hash("not-a-real-password", bcrypt::DEFAULT_COST).unwrap_or_default())
}

/// Verify `password` against `hash`. With no hash the dummy is verified and
/// the result is always `false`. A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: Option<String>) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => bcrypt::verify(&password, &hash).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored password hash is not valid bcrypt");
            false
        }),
        None => {
            let _ = bcrypt::verify(&password, dummy_hash());
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("password check: {}", e)))
}
