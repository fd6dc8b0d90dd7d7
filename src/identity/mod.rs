//! Bearer-token identity and the authorization gate in front of the record
//! access layer. Keep the public surface thin and split implementation across
//! sub-modules.

mod authorizer;
mod extract;
mod token;

pub use authorizer::{check_admin, check_self_access};
pub use extract::{Admin, Authenticated};
pub use token::{bearer_token, Identity, TokenService, TOKEN_TTL_SECS};
