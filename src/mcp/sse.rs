//! HTTP/SSE transport.
//!
//! `GET /sse` opens an event stream and registers a session. The first event
//! is `endpoint`, carrying the URL the client must post its messages to.
//! `POST /messages?sessionId=<id>` accepts one JSON-RPC message, answers
//! `202 Accepted`, and the reply arrives as a `message` event on the matching
//! stream. Each session runs its own rmcp service over an in-memory duplex
//! pipe carrying newline-delimited JSON. When a [`TokenVerifier`] is
//! configured both routes require a bearer token.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures_util::Stream;
use rmcp::ServiceExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::auth::{AuthError, AuthInfo, TokenVerifier};
use super::context::InvocationContext;
use super::service::HyperbrowserService;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Capacity of each direction of a session's pipe
const PIPE_CAPACITY: usize = 1 << 20;

/// Write side of a session: serialized messages bound for its service
#[derive(Debug, Clone)]
struct Session {
    inbound: mpsc::UnboundedSender<String>,
}

/// Open event streams keyed by session id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    fn insert(&self, id: String, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, session);
    }

    fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes a session once its event stream is dropped
struct SessionGuard {
    id: String,
    sessions: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        tracing::info!("SSE session {} closed", self.id);
    }
}

/// Shared state of the SSE routes
#[derive(Debug, Clone)]
pub struct SseState {
    service: HyperbrowserService,
    sessions: Arc<SessionRegistry>,
    verifier: Option<Arc<TokenVerifier>>,
}

impl SseState {
    pub fn new(service: HyperbrowserService, verifier: Option<Arc<TokenVerifier>>) -> Self {
        Self {
            service,
            sessions: Arc::new(SessionRegistry::default()),
            verifier,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn auth_enabled(&self) -> bool {
        self.verifier.is_some()
    }
}

/// Build the SSE router
pub fn router(state: SseState) -> Router {
    let mut router = Router::new()
        .route(SSE_PATH, get(open_stream))
        .route(MESSAGES_PATH, post(post_message));

    if state.auth_enabled() {
        router = router.route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));
    }

    router.with_state(state)
}

async fn open_stream(
    State(state): State<SseState>,
    auth: Option<Extension<AuthInfo>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let context = InvocationContext::Network {
        credential: auth.map(|Extension(info)| info.token),
    };

    let (service_end, session_end) = tokio::io::duplex(PIPE_CAPACITY);
    spawn_service(state.service.with_context(context), service_end, session_id.clone());

    let (replies, mut requests) = tokio::io::split(session_end);
    let (inbound, mut pending) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = pending.recv().await {
            if requests.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    state
        .sessions
        .insert(session_id.clone(), Session { inbound });
    tracing::info!("SSE session {} opened", session_id);

    let guard = SessionGuard {
        id: session_id.clone(),
        sessions: state.sessions.clone(),
    };
    let endpoint = format!("{}?sessionId={}", MESSAGES_PATH, session_id);

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));

        let mut lines = BufReader::new(replies).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            yield Ok(Event::default().event("message").data(line));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// Run one session's MCP service until its pipe closes
fn spawn_service(service: HyperbrowserService, pipe: DuplexStream, session_id: String) {
    tokio::spawn(async move {
        match service.serve(pipe).await {
            Ok(running) => match running.waiting().await {
                Ok(reason) => tracing::debug!("SSE session {} ended: {:?}", session_id, reason),
                Err(e) => tracing::warn!("SSE session {} task failed: {}", session_id, e),
            },
            Err(e) => tracing::warn!("SSE session {} failed to initialize: {}", session_id, e),
        }
    });
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageQuery {
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session) = query
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.get(id))
    else {
        tracing::debug!("Message posted for unknown session {:?}", query.session_id);
        return (StatusCode::BAD_REQUEST, "No transport found").into_response();
    };

    let message: Value = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Unparseable message: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e)).into_response();
        }
    };

    // One message per line on the pipe
    let mut line = message.to_string();
    line.push('\n');
    if session.inbound.send(line).is_err() {
        return (StatusCode::GONE, "Session closed").into_response();
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

async fn require_bearer(State(state): State<SseState>, mut request: Request, next: Next) -> Response {
    let Some(verifier) = state.verifier.as_ref() else {
        return next.run(request).await;
    };

    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized(&AuthError::MissingKey);
    };

    match verifier.verify(&token).await {
        Ok(info) => {
            request.extensions_mut().insert(info);
            next.run(request).await
        }
        Err(e) => unauthorized(&e),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn unauthorized(error: &AuthError) -> Response {
    let description = error.to_string();
    let challenge = format!(
        "Bearer error=\"invalid_token\", error_description=\"{}\"",
        description
    );

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
        Json(json!({
            "error": "invalid_token",
            "error_description": description,
        })),
    )
        .into_response()
}
