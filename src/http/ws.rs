use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::notifications::NotificationService;
use crate::realtime::{ClientCommand, ServerEvent, SessionHandle};
use crate::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Socket handshake. The token is fully verified before the upgrade; a
/// missing or invalid token degrades the session to anonymous instead of
/// rejecting the connection. Anonymous sessions are never registered and
/// never receive personalized events.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match query.token.as_deref() {
        Some(token) => {
            let service = AuthService::new(
                state.db.clone(),
                state.paseto_access_key,
                state.paseto_refresh_key,
                state.access_ttl_minutes,
                state.refresh_ttl_days,
            );
            match service.authenticate_access_token(token).await {
                Ok(Some(session)) => Some(session.user_id),
                Ok(None) => {
                    tracing::warn!("socket handshake carried an invalid token, degrading to anonymous");
                    None
                }
                Err(err) => {
                    tracing::error!(error = ?err, "token verification failed, degrading to anonymous");
                    None
                }
            }
        }
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, identity))
}

async fn handle_socket(state: AppState, socket: WebSocket, identity: Option<Uuid>) {
    let session_id = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    match identity {
        Some(user_id) => {
            state
                .dispatcher
                .registry()
                .register(user_id, SessionHandle::new(session_id, tx.clone()));
            tracing::info!(user_id = %user_id, session_id = %session_id, "socket connected");
        }
        None => {
            tracing::info!(session_id = %session_id, "anonymous socket connected");
        }
    }

    // Forward queued events to the wire until either side goes away.
    let send_session_id = session_id;
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(frame) => {
                    if ws_tx.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = ?err, session_id = %send_session_id, "failed to serialize event");
                }
            }
        }
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_command(&state, identity, session_id, &tx, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = ?err, session_id = %session_id, "socket read error");
                break;
            }
        }
    }

    // Conditional eviction: a late disconnect for a superseded session
    // leaves the newer registration in place.
    if let Some(user_id) = identity {
        let evicted = state.dispatcher.registry().unregister(user_id, session_id);
        tracing::info!(user_id = %user_id, session_id = %session_id, evicted, "socket disconnected");
    } else {
        tracing::info!(session_id = %session_id, "anonymous socket disconnected");
    }

    send_task.abort();
}

/// Every failure in here is logged and dropped; a bad frame or a failed
/// store call must never tear down the transport session.
async fn handle_command(
    state: &AppState,
    identity: Option<Uuid>,
    session_id: Uuid,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    text: &str,
) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::debug!(error = ?err, session_id = %session_id, "ignoring unparseable frame");
            return;
        }
    };

    match command {
        ClientCommand::Join { user_id } => {
            // A session may only join the channel of the identity it
            // authenticated as.
            if identity == Some(user_id) {
                state
                    .dispatcher
                    .registry()
                    .register(user_id, SessionHandle::new(session_id, tx.clone()));
                tracing::debug!(user_id = %user_id, session_id = %session_id, "session joined its channel");
            } else {
                tracing::warn!(
                    requested_user_id = %user_id,
                    session_id = %session_id,
                    "join rejected: identity mismatch"
                );
            }
        }
        ClientCommand::MarkAsRead { notification_id } => {
            let Some(user_id) = identity else {
                return;
            };
            let service = NotificationService::new(state.db.clone(), state.dispatcher.clone());
            match service.mark_read(notification_id, user_id).await {
                Ok(_) => {
                    let _ = tx.send(ServerEvent::NotificationMarkedAsRead { notification_id });
                }
                Err(err) => {
                    tracing::error!(
                        error = ?err,
                        notification_id = %notification_id,
                        user_id = %user_id,
                        "failed to mark notification read"
                    );
                }
            }
        }
        ClientCommand::MarkAllAsRead => {
            let Some(user_id) = identity else {
                return;
            };
            let service = NotificationService::new(state.db.clone(), state.dispatcher.clone());
            match service.mark_all_read(user_id).await {
                Ok(_) => {
                    let _ = tx.send(ServerEvent::AllNotificationsMarkedAsRead);
                }
                Err(err) => {
                    tracing::error!(error = ?err, user_id = %user_id, "failed to mark all notifications read");
                }
            }
        }
    }
}
