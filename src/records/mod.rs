//! Typed repositories over the three collections: users, work rooms and tasks.
//! Each one is a thin wrapper around a `storage::Collection` that owns the
//! filters and update documents for its entity.

pub mod tasks;
pub mod users;
pub mod works;

pub use tasks::{TaskMove, TaskRepository};
pub use users::{Role, UserRepository, UserUpsert};
pub use works::{AcceptRequest, InviteRequest, InviteState, OneOrMany, WorkRepository};
