//! HTTP transport for the OAI-PMH endpoint.
//!
//! GET query strings and POST form bodies are merged into one list of
//! key/value pairs and handed to the [`OaiService`] on the blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::datestamp::Datestamp;
use crate::error::StartupError;
use crate::gateway::RecordSource;
use crate::service::{OaiResponse, OaiService};

/// Path of the OAI-PMH endpoint.
pub const OAI_PATH: &str = "/oai";

/// Build the router for a shared service.
pub fn router<S: RecordSource + 'static>(service: Arc<OaiService<S>>) -> Router {
    Router::new()
        .route(OAI_PATH, get(oai::<S>).post(oai::<S>))
        .route("/health", get(health))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn serve<S: RecordSource + 'static>(
    service: Arc<OaiService<S>>,
    addr: SocketAddr,
) -> Result<(), StartupError> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn oai<S: RecordSource + 'static>(
    State(service): State<Arc<OaiService<S>>>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Response {
    let mut pairs = uri.query().map(|q| parse_pairs(q.as_bytes())).unwrap_or_default();
    pairs.extend(parse_pairs(&body));

    let request_uri = match uri.query() {
        Some(query) => format!("{}?{query}", service.config().base_url),
        None => service.config().base_url.clone(),
    };
    let now = Datestamp::now();

    let handled =
        tokio::task::spawn_blocking(move || service.handle_pairs(pairs, &request_uri, now)).await;

    match handled {
        Ok(response) => into_http(response),
        Err(e) => {
            tracing::error!(error = %e, "request handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Decode `application/x-www-form-urlencoded` pairs, keeping repeats.
fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn into_http(response: OaiResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type())],
        response.body,
    )
        .into_response()
}
