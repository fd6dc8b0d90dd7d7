use tracing::debug;

use super::Identity;
use crate::error::{AppError, AppResult};
use crate::records::users::{Role, UserRepository};

/// The caller may only act on the user record keyed by their own email.
pub fn check_self_access(identity: Option<&Identity>, target_email: &str) -> AppResult<()> {
    let Some(identity) = identity else { return Err(AppError::unauthenticated()); };
    if identity.email != target_email {
        return Err(AppError::forbidden());
    }
    Ok(())
}

/// Admin gate. The role is read from the stored user record on every call,
/// never from token claims, so a role change applies to the next request.
pub async fn check_admin(identity: Option<&Identity>, users: &UserRepository) -> AppResult<()> {
    let Some(identity) = identity else { return Err(AppError::unauthenticated()); };
    match users.role_of(&identity.email).await? {
        Some(Role::Admin) => {
            debug!(target: "auth", email = %identity.email, "admin check passed");
            Ok(())
        }
        _ => Err(AppError::forbidden()),
    }
}
