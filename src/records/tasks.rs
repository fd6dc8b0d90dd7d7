use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::storage::{
    Collection, DeleteResult, Document, DocumentId, DocumentStream, Filter, InsertResult, SharedStore, Update, UpdateResult,
};

pub const TASKS_COLLECTION: &str = "task";

/// Kanban column of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMove {
    New,
    Ongoing,
    Done,
}

impl TaskMove {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMove::New => "new",
            TaskMove::Ongoing => "ongoing",
            TaskMove::Done => "done",
        }
    }
}

#[derive(Clone)]
pub struct TaskRepository {
    tasks: Collection,
}

impl TaskRepository {
    pub fn new(store: SharedStore) -> Self { Self { tasks: Collection::new(store, TASKS_COLLECTION) } }

    /// Insert as submitted; the initial `taskMove` is not validated.
    pub async fn create(&self, task: Document) -> AppResult<InsertResult> { self.tasks.create(task).await }

    pub async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<Document>> {
        self.tasks.find_one(&Filter::by_id(id)).await
    }

    pub async fn delete(&self, id: DocumentId) -> AppResult<DeleteResult> {
        self.tasks.delete_one(&Filter::by_id(id)).await
    }

    pub async fn list(&self) -> AppResult<Vec<Document>> { self.tasks.find_many(&Filter::all()).await }

    /// Lazy cursor over every task in store order.
    pub fn stream_all(&self) -> DocumentStream { self.tasks.stream(Filter::all()) }

    pub async fn list_by_move(&self, column: TaskMove) -> AppResult<Vec<Document>> {
        self.tasks.find_many(&Filter::all().eq("taskMove", column.as_str())).await
    }

    /// Set `taskMove` on task `id`, upserting by id. Any column may follow any other.
    pub async fn transition(&self, id: DocumentId, to: TaskMove) -> AppResult<UpdateResult> {
        self.tasks.update_or_upsert(&Filter::by_id(id), &Update::new().set("taskMove", to.as_str())).await
    }
}
