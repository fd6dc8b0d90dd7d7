//! Incremental JSON array responses.
//!
//! The body opens with `[`, writes each document as soon as the source yields
//! it (comma separated), and closes with `]`. Status and content type go out
//! before the first document is read, so a source error after that point can
//! only abort the body: the client sees a truncated, invalid JSON array.

use std::io;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use tracing::error;

use crate::error::AppResult;
use crate::storage::Document;

/// Encode `docs` as the chunks of a JSON array.
pub fn json_array_chunks<S>(docs: S) -> impl Stream<Item = Result<String, io::Error>> + Send + 'static
where
    S: Stream<Item = AppResult<Document>> + Send + 'static,
{
    async_stream::stream! {
        yield Ok::<String, io::Error>("[".to_string());
        let mut first = true;
        futures_util::pin_mut!(docs);
        while let Some(item) = docs.next().await {
            match item {
                Ok(doc) => {
                    let json = match serde_json::to_string(&doc) {
                        Ok(j) => j,
                        Err(e) => {
                            yield Err(io::Error::new(io::ErrorKind::InvalidData, e));
                            return;
                        }
                    };
                    if !first {
                        yield Ok(",".to_string());
                    }
                    first = false;
                    yield Ok(json);
                }
                Err(e) => {
                    error!(target: "stream", "source failed mid-stream: {}", e);
                    yield Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
                    return;
                }
            }
        }
        yield Ok("]".to_string());
    }
}

/// 200 response streaming `docs` as a JSON array.
pub fn json_array_response<S>(docs: S) -> Response
where
    S: Stream<Item = AppResult<Document>> + Send + 'static,
{
    ([(CONTENT_TYPE, "application/json")], Body::from_stream(json_array_chunks(docs))).into_response()
}
