//! WebSocket session endpoint
//!
//! Clients connect with `/ws?token=...`. The token is resolved through the
//! player directory before the upgrade; unknown tokens are refused with 401.

use crate::service::app::ServiceContext;
use crate::types::{ConnectionId, PlayerProfile};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

/// Query string of the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(context): State<ServiceContext>,
    Query(params): Query<ConnectParams>,
) -> Response {
    let profile = match context.directory.authenticate(&params.token).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            debug!("Rejecting connection with unknown token");
            return (StatusCode::UNAUTHORIZED, "Unknown token").into_response();
        }
        Err(e) => {
            warn!("Player directory unavailable: {}", e);
            return (StatusCode::SERVICE_UNAVAILABLE, "Player directory unavailable")
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, context, profile))
}

async fn handle_socket(socket: WebSocket, context: ServiceContext, profile: PlayerProfile) {
    let (connection, outbound) = context.router.connect(profile);
    let (mut sender, mut receiver) = socket.split();

    let mut outbound = UnboundedReceiverStream::new(outbound);
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.next().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {} message: {}", message.kind(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    read_frames(&context, connection, &mut receiver).await;

    context.router.handle_disconnect(connection).await;
    // the registry dropped the sender, so the writer drains and exits
    if let Err(e) = writer.await {
        debug!("Writer task for {} ended abnormally: {}", connection, e);
    }
    info!("Connection {} closed", connection);
}

async fn read_frames(
    context: &ServiceContext,
    connection: ConnectionId,
    receiver: &mut futures::stream::SplitStream<WebSocket>,
) {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => context.router.handle_text(connection, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error on {}: {}", connection, e);
                break;
            }
        }
    }
}
