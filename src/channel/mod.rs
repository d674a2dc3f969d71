#![forbid(unsafe_code)]

// Channel manager - the single persistent progress channel to the test runner

pub mod connection;
pub mod router;

pub use connection::WsConnector;

use crate::controller::AppEvent;
use crate::protocol::ChannelIdentity;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Generation counter distinguishing one opened channel from the next.
pub type Epoch = u64;

/// Continuation run once the channel has an identity
pub type OnReady = Box<dyn FnOnce(&ChannelIdentity) + Send>;

/// Events produced by an open channel, tagged with the epoch that opened it
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Frame { epoch: Epoch, text: String },
    /// Emitted exactly once per epoch: on server close, network error, or
    /// failed connect
    Closed { epoch: Epoch },
}

/// Opens the transport behind the channel.
///
/// Implementations spawn a reader that forwards frames into `events` and
/// finishes with `ChannelEvent::Closed` for the same epoch.
pub trait Connector {
    fn open(&self, epoch: Epoch, events: mpsc::Sender<AppEvent>) -> JoinHandle<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    Disconnected,
    Connecting { epoch: Epoch },
    Ready { epoch: Epoch, identity: ChannelIdentity },
}

pub struct ChannelManager<C> {
    connector: C,
    events: mpsc::Sender<AppEvent>,
    state: ChannelState,
    pending: Vec<OnReady>,
    epoch: Epoch,
    reader: Option<JoinHandle<()>>,
}

impl<C: Connector> ChannelManager<C> {
    pub fn new(connector: C, events: mpsc::Sender<AppEvent>) -> Self {
        Self {
            connector,
            events,
            state: ChannelState::Disconnected,
            pending: Vec::new(),
            epoch: 0,
            reader: None,
        }
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn identity(&self) -> Option<&ChannelIdentity> {
        match &self.state {
            ChannelState::Ready { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ChannelState::Ready { .. })
    }

    /// True if `epoch` belongs to the channel that is currently open or opening.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        match &self.state {
            ChannelState::Disconnected => false,
            ChannelState::Connecting { epoch: current }
            | ChannelState::Ready { epoch: current, .. } => *current == epoch,
        }
    }

    /// Run `on_ready` as soon as the channel has an identity.
    ///
    /// Ready: runs immediately. Disconnected: opens a channel and queues it.
    /// Connecting: queues it behind the attempt already in flight.
    pub fn ensure_ready<F>(&mut self, on_ready: F)
    where
        F: FnOnce(&ChannelIdentity) + Send + 'static,
    {
        if let ChannelState::Ready { identity, .. } = &self.state {
            on_ready(identity);
            return;
        }

        self.pending.push(Box::new(on_ready));
        if let ChannelState::Connecting { epoch } = self.state {
            debug!("Channel {} still connecting, queueing continuation", epoch);
        } else {
            self.open();
        }
    }

    fn open(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;
        info!("Opening progress channel (epoch {})", epoch);
        if let Some(old) = self.reader.take() {
            old.abort();
        }
        self.state = ChannelState::Connecting { epoch };
        self.reader = Some(self.connector.open(epoch, self.events.clone()));
    }

    /// Identity frame received. Returns the number of continuations fired.
    pub fn on_identity(&mut self, epoch: Epoch, identity: ChannelIdentity) -> usize {
        if !self.is_current(epoch) {
            debug!("Ignoring identity from stale channel epoch {}", epoch);
            return 0;
        }

        info!("Progress channel ready (epoch {}, id {})", epoch, identity);
        let pending = std::mem::take(&mut self.pending);
        let fired = pending.len();
        self.state = ChannelState::Ready { epoch, identity };
        if let ChannelState::Ready { identity, .. } = &self.state {
            for on_ready in pending {
                on_ready(identity);
            }
        }
        fired
    }

    /// Channel went away. Returns false if the close belonged to an older
    /// channel and was ignored.
    pub fn on_closed(&mut self, epoch: Epoch) -> bool {
        if !self.is_current(epoch) {
            return false;
        }

        let dropped = self.pending.len();
        if dropped > 0 {
            warn!(
                "Progress channel {} closed before it became ready, dropping {} queued submission(s)",
                epoch, dropped
            );
        } else {
            warn!("Progress channel {} closed", epoch);
        }
        self.pending.clear();
        self.reader = None;
        self.state = ChannelState::Disconnected;
        true
    }
}

impl<C> Drop for ChannelManager<C> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
