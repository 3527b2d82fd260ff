use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
};
use tracing::{error, info};

use crate::db::Book;
use crate::{GatewayError, router::GatewayState};

/// GET /books -> every book as a JSON array, in query order.
pub async fn list_books_handler(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
) -> Result<Json<Vec<Book>>, GatewayError> {
    info!(%method, path = %uri.path(), "books request");

    let books = state.books.list_books().await.inspect_err(|e| {
        error!(code = e.code(), error = %e, "books request failed");
    })?;
    Ok(Json(books))
}

/// GET /healthz -> liveness probe; touches no collaborator.
pub async fn health_handler() -> &'static str {
    "ok"
}
