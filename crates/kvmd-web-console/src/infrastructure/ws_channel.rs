//! The control WebSocket (`kvmd/ws`).
//!
//! One connection carries both directions:
//!
//! - **Daemon → console**: `{event_type, event}` frames, decoded into
//!   [`DaemonEvent`]s and delivered on [`ControlLink::events`].
//! - **Console → daemon**: HID events queued through [`WsChannel`], the
//!   [`InputChannel`] the pointer controller sends on.
//!
//! The socket is split and each half gets its own task, so a slow reader
//! never delays outbound input.  When the daemon closes the socket the
//! event receiver yields `None`; sending on a [`WsChannel`] whose writer has
//! exited returns [`ChannelError::Closed`].

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use kvmd_web_core::{DaemonEvent, HidEvent};

use crate::application::{ChannelError, InputChannel};
use crate::domain::Credentials;
use crate::infrastructure::daemon_http::{DaemonError, PASSWD_HEADER, USER_HEADER};

/// Outbound half of the control channel.
#[derive(Debug, Clone)]
pub struct WsChannel {
    outbound: UnboundedSender<String>,
}

impl InputChannel for WsChannel {
    fn send(&self, event: &HidEvent) -> Result<(), ChannelError> {
        self.outbound
            .send(event.to_json())
            .map_err(|_| ChannelError::Closed)
    }
}

/// An open control channel.
pub struct ControlLink {
    pub channel: Arc<WsChannel>,
    pub events: UnboundedReceiver<DaemonEvent>,
}

/// Opens the control WebSocket at `url`, sending the login headers when
/// `credentials` is set.
///
/// # Errors
///
/// [`DaemonError::WebSocket`] if the handshake fails,
/// [`DaemonError::InvalidHeader`] if the credentials cannot be sent.
pub async fn connect_control_channel(
    url: &Url,
    credentials: Option<&Credentials>,
) -> Result<ControlLink, DaemonError> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(creds) = credentials {
        let headers = request.headers_mut();
        headers.insert(
            USER_HEADER,
            HeaderValue::from_str(&creds.user).map_err(|_| DaemonError::InvalidHeader(USER_HEADER))?,
        );
        headers.insert(
            PASSWD_HEADER,
            HeaderValue::from_str(&creds.passwd)
                .map_err(|_| DaemonError::InvalidHeader(PASSWD_HEADER))?,
        );
    }

    let (ws_stream, _response) = connect_async(request).await?;
    info!("control channel open: {url}");

    let (mut ws_sink, mut ws_source) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (events_tx, events_rx) = mpsc::unbounded_channel::<DaemonEvent>();

    // Console → daemon.  Ends when every WsChannel is dropped or the socket fails.
    tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(WsMessage::Text(text)).await {
                warn!("control channel write failed: {e}");
                break;
            }
        }
        let _ = ws_sink.close().await;
        debug!("control channel writer stopped");
    });

    // Daemon → console.  Dropping `events_tx` signals the close.
    tokio::spawn(async move {
        while let Some(frame) = ws_source.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match DaemonEvent::parse(&text) {
                    Ok(event) => {
                        if events_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("ignoring malformed daemon event: {e}"),
                },
                Ok(WsMessage::Close(frame)) => {
                    info!("daemon closed the control channel: {frame:?}");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("control channel read failed: {e}");
                    break;
                }
            }
        }
        debug!("control channel reader stopped");
    });

    Ok(ControlLink {
        channel: Arc::new(WsChannel { outbound: outbound_tx }),
        events: events_rx,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kvmd_web_core::protocol::messages::Point16;

    #[test]
    fn test_channel_serializes_events_to_json() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = WsChannel { outbound: tx };

        // Act
        channel
            .send(&HidEvent::MouseMove { to: Point16 { x: -1, y: 2 } })
            .unwrap();

        // Assert
        let text = rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["event_type"], "mouse_move");
        assert_eq!(json["to"]["x"], -1);
        assert_eq!(json["to"]["y"], 2);
    }

    #[test]
    fn test_send_after_writer_exit_is_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let channel = WsChannel { outbound: tx };
        let result = channel.send(&HidEvent::MouseMove { to: Point16 { x: 0, y: 0 } });
        assert_eq!(result, Err(ChannelError::Closed));
    }
}
