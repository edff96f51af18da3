//! Production WebSocket transport over tokio-tungstenite

use crate::traits::{ChatWireError, LinkEvent, Result, Transport, TransportLink};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// Connects real WebSocket links via `tokio_tungstenite::connect_async`
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportLink>> {
        let (stream, _) = connect_async(endpoint)
            .await
            .map_err(|e| ChatWireError::Transport(e.to_string()))?;
        info!("connected to {}", endpoint);
        Ok(Box::new(WebSocketLink { stream }))
    }
}

/// One live WebSocket connection
pub struct WebSocketLink {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl TransportLink for WebSocketLink {
    async fn send(&mut self, payload: &str) -> Result<()> {
        self.stream
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| ChatWireError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<LinkEvent> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(LinkEvent::Message(text)),
                // The chat protocol is text-only; control and binary
                // frames never reach the router
                Ok(Message::Binary(_)) => {
                    debug!("binary frame skipped");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((1005, String::new()));
                    return Some(LinkEvent::Closed { code, reason });
                }
                Err(e) => return Some(LinkEvent::Error(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // A close error just means the peer is already gone
        let _ = self.stream.close(None).await;
        Ok(())
    }
}
