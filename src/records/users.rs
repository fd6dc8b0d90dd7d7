use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::TokenService;
use crate::storage::{Collection, Document, Filter, SharedStore, Update, UpdateResult};

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Exact, case-sensitive match on the stored string.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

/// Response of the user upsert: the write result plus a fresh token.
#[derive(Debug, Clone, Serialize)]
pub struct UserUpsert {
    pub result: UpdateResult,
    pub token: String,
}

#[derive(Clone)]
pub struct UserRepository {
    users: Collection,
}

impl UserRepository {
    pub fn new(store: SharedStore) -> Self { Self { users: Collection::new(store, USERS_COLLECTION) } }

    /// `$set` the submitted profile on the user keyed by `email`, inserting when absent.
    pub async fn upsert(&self, email: &str, profile: Document) -> AppResult<UpdateResult> {
        if email.trim().is_empty() {
            return Err(AppError::invalid_key("user email is empty"));
        }
        let result = self.users.update_or_upsert(&Filter::all().eq("email", email), &Update::new().set_all(profile)).await?;
        debug!(target: "records", email, ?result, "user upsert");
        Ok(result)
    }

    /// Upsert, then mint a token whose claims are the submitted profile.
    /// The path email fills in the `email` claim when the body omits it.
    pub async fn upsert_and_issue(&self, email: &str, profile: Document, tokens: &TokenService) -> AppResult<UserUpsert> {
        let mut claims = profile.clone();
        claims.entry("email").or_insert_with(|| Value::String(email.to_string()));
        let result = self.upsert(email, profile).await?;
        let token = tokens.mint(&claims)?;
        Ok(UserUpsert { result, token })
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Document>> {
        self.users.find_one(&Filter::all().eq("email", email)).await
    }

    /// Stored role, `None` when the user or the field is missing or unrecognised.
    pub async fn role_of(&self, email: &str) -> AppResult<Option<Role>> {
        let user = self.find_by_email(email).await?;
        Ok(user.as_ref().and_then(|u| u.get("role")).and_then(|v| v.as_str()).and_then(Role::parse))
    }

    pub async fn list(&self) -> AppResult<Vec<Document>> { self.users.find_many(&Filter::all()).await }
}
