//! # HTTP Publisher
//!
//! The pull surface of the chain. Consumers poll two endpoints:
//!
//! | Method | Path     | Description                                  |
//! |--------|----------|----------------------------------------------|
//! | GET    | `/head`  | Signed head message (JSON); 204 if no chain  |
//! | GET    | `/{cid}` | Raw block bytes by CID                       |
//!
//! Any other method on either route is 405. The content route takes the
//! CID as the single path segment after `/`; nested paths match nothing
//! and fall through to axum's 404.
//!
//! `Content-Type` on block responses follows the CID's codec: dag-json is
//! served as `application/json`, dag-cbor as `application/cbor`, anything
//! else with no content type at all.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cid::Cid;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::chain::{AdChain, Publisher};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::identity::ProviderIdentity;
use crate::schema::{SignedHead, DAG_CBOR, DAG_JSON};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for request handlers. Cheap to clone; everything is behind
/// an `Arc`.
#[derive(Clone)]
struct AppState {
    chain: Arc<AdChain>,
    identity: Arc<ProviderIdentity>,
    topic: Arc<str>,
}

/// Builds the publisher's axum [`Router`].
fn router(state: AppState) -> Router {
    Router::new()
        .route("/head", get(handle_get_head))
        .route("/{cid}", get(handle_get_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /head` — the current head as a signed head message.
async fn handle_get_head(State(state): State<AppState>) -> Response {
    let head = match state.chain.get_head() {
        Ok(head) => head,
        Err(e) => {
            error!(err = %e, "failed to get head CID");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let Some(head) = head else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let signed = SignedHead::new(&head, &state.topic, &state.identity);
    debug!(head = %head, "responding with signed head message");
    Json(signed).into_response()
}

/// `GET /{cid}` — raw block bytes.
async fn handle_get_content(
    Path(cid_param): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let id = match Cid::try_from(cid_param.as_str()) {
        Ok(id) => id,
        Err(e) => {
            debug!(path_param = %cid_param, err = %e, "invalid CID as path parameter");
            return (
                StatusCode::BAD_REQUEST,
                format!("invalid CID: {cid_param}"),
            )
                .into_response();
        }
    };
    match state.chain.get_content(&id) {
        Err(Error::ContentNotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(cid = %id, err = %e, "failed to get content from store");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Ok(bytes) => {
            debug!(cid = %id, len = bytes.len(), "responding with content");
            let mut response = Response::new(Body::from(bytes));
            match id.codec() {
                DAG_JSON => {
                    response.headers_mut().insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    );
                }
                DAG_CBOR => {
                    response.headers_mut().insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/cbor"),
                    );
                }
                _ => {}
            }
            response
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// A running listener plus the handles needed to stop it.
struct ServeHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Serves the chain over HTTP and doubles as a [`Publisher`] by delegating
/// writes to the chain it fronts.
pub struct HttpPublisher {
    chain: Arc<AdChain>,
    identity: Arc<ProviderIdentity>,
    topic: Arc<str>,
    listen_addr: String,
    serve: Option<ServeHandle>,
}

impl HttpPublisher {
    pub fn new(
        chain: Arc<AdChain>,
        identity: ProviderIdentity,
        topic: impl Into<Arc<str>>,
        listen_addr: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            identity: Arc::new(identity),
            topic: topic.into(),
            listen_addr: listen_addr.into(),
            serve: None,
        }
    }

    /// Bind the configured address and serve requests on a background task.
    pub async fn start(&mut self) -> Result<()> {
        if self.serve.is_some() {
            return Err(Error::Config("HTTP publisher already started".into()));
        }
        let listener = TcpListener::bind(&self.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        let state = AppState {
            chain: Arc::clone(&self.chain),
            identity: Arc::clone(&self.identity),
            topic: Arc::clone(&self.topic),
        };
        let app = router(state);
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            match result {
                Ok(()) => info!("HTTP publisher stopped"),
                Err(e) => error!(err = %e, "HTTP publisher stopped erroneously"),
            }
        });

        info!(address = %local_addr, "HTTP publisher started");
        self.serve = Some(ServeHandle {
            local_addr,
            shutdown,
            task,
        });
        Ok(())
    }

    /// Stop accepting connections and wait for in-flight requests to drain.
    ///
    /// Idempotent; shutting down a publisher that never started is a no-op.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(handle) = self.serve.take() {
            let _ = handle.shutdown.send(());
            if let Err(e) = handle.task.await {
                error!(err = %e, "HTTP publisher task panicked during shutdown");
            }
        }
        Ok(())
    }

    /// The address the listener is actually bound to, once started.
    /// Mostly useful when configured with port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.serve.as_ref().map(|s| s.local_addr)
    }
}

impl Publisher for HttpPublisher {
    fn publish(&self, catalog: &mut dyn Catalog) -> Result<Cid> {
        self.chain.publish(catalog)
    }

    fn retract(&self, context_id: &[u8]) -> Result<Cid> {
        self.chain.retract(context_id)
    }

    fn get_content(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.chain.get_content(cid)
    }

    fn get_head(&self) -> Result<Option<Cid>> {
        self.chain.get_head()
    }
}
