#![forbid(unsafe_code)]

// WebSocket transport for the progress channel

use super::{ChannelEvent, Connector, Epoch};
use crate::controller::AppEvent;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Opens the runner's `/ws` endpoint with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl Connector for WsConnector {
    fn open(&self, epoch: Epoch, events: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
        let url = self.url.clone();
        tokio::spawn(async move {
            read_frames(url, epoch, &events).await;
            let _ = events
                .send(AppEvent::Channel(ChannelEvent::Closed { epoch }))
                .await;
        })
    }
}

/// Forward text frames until the socket closes or errors.
async fn read_frames(url: Url, epoch: Epoch, events: &mpsc::Sender<AppEvent>) {
    let mut ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("Failed to connect progress channel to {}: {}", url, e);
            return;
        }
    };
    info!("Progress channel connected to {} (epoch {})", url, epoch);

    while let Some(message) = ws_stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let event = AppEvent::Channel(ChannelEvent::Frame {
                    epoch,
                    text: text.as_str().to_owned(),
                });
                if events.send(event).await.is_err() {
                    debug!("Event loop gone, stopping channel reader (epoch {})", epoch);
                    return;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Runner closed progress channel (epoch {})", epoch);
                return;
            }
            Ok(_) => {} // Ping/Pong handled by tungstenite, binary unused
            Err(e) => {
                warn!("Progress channel error (epoch {}): {}", epoch, e);
                return;
            }
        }
    }
    info!("Progress channel stream ended (epoch {})", epoch);
}
