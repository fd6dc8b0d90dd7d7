//!
//! workroom HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP API for users, work rooms and
//! tasks, and the startup path that opens the document store.
//!
//! Responsibilities:
//! - Route table mapping method + path to a record-access operation.
//! - Bearer-token and admin checks via the `identity` extractors.
//! - Origin allow-list (CORS) in front of every route.
//! - Streaming the full task list as an incremental JSON array.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRequest;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::identity::TokenService;
use crate::records::{TaskRepository, UserRepository, WorkRepository};
use crate::storage::{MemoryStore, SharedStore};

pub mod cors;
pub mod stream;
mod tasks;
mod users;
mod works;

pub use cors::AllowedOrigins;

pub const LIVENESS_TEXT: &str = "Server is running... in session";

/// JSON request body whose rejections (bad syntax, missing fields, wrong
/// content type) come back as an `AppError` body instead of axum's plain text.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Shared server state injected into all handlers.
///
/// Holds one repository per collection over the same store handle, and the
/// token service keyed by the process-wide secret.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub works: WorkRepository,
    pub tasks: TaskRepository,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(store: SharedStore, tokens: TokenService) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            works: WorkRepository::new(store.clone()),
            tasks: TaskRepository::new(store),
            tokens: Arc::new(tokens),
        }
    }
}

/// Build the full route table with the origin gate and CORS layers applied.
pub fn router(state: AppState, origins: AllowedOrigins) -> Router {
    Router::new()
        .route("/", get(|| async { LIVENESS_TEXT }))
        // users
        .route("/user/{email}", put(users::upsert_user).get(users::get_user))
        .route("/users", get(users::list_users))
        .route("/allUsers", get(users::all_users))
        // invitations
        .route("/users/sentInvite/{id}", put(works::send_invite))
        .route("/users/sentAccepted/{id}", put(works::accept_invite))
        // work rooms
        .route("/works", get(works::list_works).put(works::update_work).post(works::create_work))
        .route("/worksInvited/{invited_email}", get(works::works_invited))
        .route("/acceptedEmails/{accepted_email}", get(works::works_accepted))
        .route("/works/{user_email}", get(works::works_by_user_email))
        .route("/home/{id}", get(works::get_work).delete(works::delete_work))
        .route("/search-result", get(works::search))
        // tasks
        .route("/task", post(tasks::create_task).get(tasks::stream_tasks))
        .route("/task/{id}", get(tasks::get_task).delete(tasks::delete_task))
        .route("/taskNewData", get(tasks::new_tasks))
        .route("/taskOngoingData", get(tasks::ongoing_tasks))
        .route("/taskDoneData", get(tasks::done_tasks))
        .route("/task/ongoing/{id}", put(tasks::move_ongoing))
        .route("/task/done/{id}", put(tasks::move_done))
        .layer(middleware::from_fn_with_state(origins.clone(), cors::origin_gate))
        .layer(origins.cors_layer())
        .with_state(state)
}

fn log_startup(config: &Config) {
    info!(
        target: "startup",
        "workroom starting: port={}, db_uri={}, db_name={}, allowed_origins={:?}",
        config.port, config.db_uri, config.db_name, config.allowed_origins
    );
    info!(
        target: "startup",
        "collaborators: payments_configured={}, mail_configured={}",
        config.stripe_secret_key.is_some(),
        config.mail_user.is_some() && config.mail_pass.is_some()
    );
}

/// Open the store, build the router and serve until the listener fails.
pub async fn run(config: Config) -> anyhow::Result<()> {
    log_startup(&config);

    let store = MemoryStore::from_uri(&config.db_uri, &config.db_name)
        .with_context(|| format!("While opening document store at {}", config.db_uri))?;
    info!(target: "startup", persistent = store.is_persistent(), "Database Connected...");

    let state = AppState::new(Arc::new(store), TokenService::new(&config.access_token_secret));
    let app = router(state, AllowedOrigins::new(config.allowed_origins.clone()));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server is running...on {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}
