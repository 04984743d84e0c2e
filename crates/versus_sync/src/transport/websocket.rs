//! WebSocket [`Transport`] over `tokio-tungstenite`.

use super::engine_io::websocket_url;
use super::{Dialer, Transport};
use crate::error::SyncError;
use derive_new::new;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, warn};

/// Text-frame transport over a WebSocket connection.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Opens a WebSocket connection to `url`.
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        info!("Opening WebSocket");
        let (stream, response) = connect_async(url).await?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Self { stream })
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), SyncError> {
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, SyncError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Peer closed WebSocket");
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    warn!(len = data.len(), "Ignoring binary frame");
                }
                // Control frames are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SyncError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Dials `ws://{server}{path}?EIO=4&transport=websocket`.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct WebSocketDialer {
    server_url: String,
    socket_path: String,
}

#[async_trait::async_trait]
impl Dialer for WebSocketDialer {
    #[instrument(skip(self), fields(server_url = %self.server_url))]
    async fn dial(&self) -> Result<Box<dyn Transport>, SyncError> {
        let url = websocket_url(&self.server_url, &self.socket_path)?;
        let transport = WebSocketTransport::connect(&url).await?;
        Ok(Box::new(transport))
    }
}
