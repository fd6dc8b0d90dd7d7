use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AppResult;
use crate::storage::{Collection, DeleteResult, Document, DocumentId, Filter, InsertResult, SharedStore, Update, UpdateResult};

pub const WORKS_COLLECTION: &str = "work-room";

/// Invite lifecycle of a work room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteState {
    #[serde(rename = "none")]
    NotInvited,
    #[serde(rename = "sentInvite")]
    SentInvite,
    #[serde(rename = "accepted")]
    Accepted,
}

impl InviteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteState::NotInvited => "none",
            InviteState::SentInvite => "sentInvite",
            InviteState::Accepted => "accepted",
        }
    }
}

/// A single email or a list of them, accepted uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_values(self) -> Vec<Value> {
        match self {
            OneOrMany::One(s) => vec![Value::String(s)],
            OneOrMany::Many(v) => v.into_iter().map(Value::String).collect(),
        }
    }
}

/// Body of the invite-send call. Absent fields are stored as null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub inviter_email: Option<Value>,
    pub invited_email: Option<Value>,
    pub invite_work_id: Option<Value>,
    pub invite_workspace_name: Option<Value>,
    pub invite_date_time: Option<Value>,
}

/// Body of the invite-accept call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    #[serde(default)]
    pub accept_invite_date_time: Option<Value>,
    pub accepted_email: OneOrMany,
}

#[derive(Clone)]
pub struct WorkRepository {
    works: Collection,
}

impl WorkRepository {
    pub fn new(store: SharedStore) -> Self { Self { works: Collection::new(store, WORKS_COLLECTION) } }

    /// Plain insert; nothing is unique besides `_id`.
    pub async fn create(&self, work: Document) -> AppResult<InsertResult> {
        debug!(target: "records", ?work, "work insert");
        self.works.create(work).await
    }

    pub async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<Document>> {
        self.works.find_one(&Filter::by_id(id)).await
    }

    pub async fn list(&self) -> AppResult<Vec<Document>> { self.works.find_many(&Filter::all()).await }

    /// Work rooms whose pending `invitedEmail` contains `email`.
    pub async fn invited(&self, email: &str) -> AppResult<Vec<Document>> {
        self.works.find_many(&Filter::all().eq("invitedEmail", email)).await
    }

    /// Work rooms whose `acceptedEmails` contains `email`.
    pub async fn accepted(&self, email: &str) -> AppResult<Vec<Document>> {
        self.works.find_many(&Filter::all().eq("acceptedEmails", email)).await
    }

    pub async fn by_user_email(&self, email: &str) -> AppResult<Vec<Document>> {
        self.works.find_many(&Filter::all().eq("UserEmail", email)).await
    }

    /// Exact match on `location`; no location lists everything.
    pub async fn search(&self, location: Option<&str>) -> AppResult<Vec<Document>> {
        let mut filter = Filter::all();
        if let Some(loc) = location.filter(|l| !l.is_empty()) {
            filter = filter.eq("location", loc);
        }
        debug!(target: "records", ?filter, "work search");
        self.works.find_many(&filter).await
    }

    pub async fn delete(&self, id: DocumentId) -> AppResult<DeleteResult> {
        self.works.delete_one(&Filter::by_id(id)).await
    }

    /// `$set` the patch on the first work room in the collection, or insert one
    /// when the collection is empty. The filter is deliberately unscoped.
    pub async fn update_unscoped(&self, patch: Document) -> AppResult<UpdateResult> {
        debug!(target: "records", ?patch, "work update (unscoped)");
        self.works.update_or_upsert(&Filter::all(), &Update::new().set_all(patch)).await
    }

    /// Record a sent invitation on the work room `id`, upserting by id.
    pub async fn send_invite(&self, id: DocumentId, req: InviteRequest) -> AppResult<UpdateResult> {
        let update = Update::new()
            .set("invite", InviteState::SentInvite.as_str())
            .set("inviterEmail", req.inviter_email.unwrap_or(Value::Null))
            .set("invitedEmail", req.invited_email.unwrap_or(Value::Null))
            .set("inviteWorkId", req.invite_work_id.unwrap_or(Value::Null))
            .set("inviteWorkspaceName", req.invite_workspace_name.unwrap_or(Value::Null))
            .set("inviteDateTime", req.invite_date_time.unwrap_or(Value::Null));
        self.works.update_or_upsert(&Filter::by_id(id), &update).await
    }

    /// Accept on the work room `id`: mark accepted, union the emails into
    /// `acceptedEmails` and remove them from `invitedEmail`, in one update.
    pub async fn accept_invite(&self, id: DocumentId, req: AcceptRequest) -> AppResult<UpdateResult> {
        let emails = req.accepted_email.into_values();
        let update = Update::new()
            .set("invite", InviteState::Accepted.as_str())
            .set("acceptInviteDateTime", req.accept_invite_date_time.unwrap_or(Value::Null))
            .add_to_set("acceptedEmails", emails.clone())
            .pull("invitedEmail", emails);
        self.works.update_or_upsert(&Filter::by_id(id), &update).await
    }
}

#[cfg(test)]
#[path = "works_tests.rs"]
mod works_tests;
