//! In-process transport between peers.
//!
//! A [`NetworkLink`] is a pair of crossbeam channels. Peers exchange
//! batches of log records; a peer that needs a random seed in networked
//! play sends a [`NetMessage::RequestChoice`] to the seed authority, which
//! is served by a [`SeedServer`] running on its own thread.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use warband_replay::{tags, ActionRecord};

use crate::error::SyncError;
use crate::rng::fresh_seed;

/// One message between peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetMessage {
    /// Log records in the sender's order.
    Records(Vec<ActionRecord>),
    /// Ask the authority to decide a server-side choice.
    RequestChoice {
        /// Echoed in the answer.
        request_id: u64,
        /// The choice being requested, e.g. `random_seed`.
        name: String,
        /// Request parameters.
        params: ActionRecord,
    },
}

/// Both ends of a peer's connection.
#[derive(Clone, Debug)]
pub struct NetworkLink {
    /// Messages to the other side.
    pub outgoing: Sender<NetMessage>,
    /// Messages from the other side.
    pub incoming: Receiver<NetMessage>,
}

impl NetworkLink {
    /// Two connected links.
    pub fn pair() -> (NetworkLink, NetworkLink) {
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        (
            NetworkLink {
                outgoing: a_tx,
                incoming: b_rx,
            },
            NetworkLink {
                outgoing: b_tx,
                incoming: a_rx,
            },
        )
    }

    /// Send, mapping a closed channel to [`SyncError::Disconnected`].
    pub fn send(&self, msg: NetMessage) -> Result<(), SyncError> {
        self.outgoing.send(msg).map_err(|_| SyncError::Disconnected)
    }

    /// Block for up to `timeout`. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<NetMessage>, SyncError> {
        match self.incoming.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SyncError::Disconnected),
        }
    }
}

/// Answers `random_seed` requests with fresh seeds.
///
/// Records received are kept, so a test can inspect what the client sent.
#[derive(Debug)]
pub struct SeedServer {
    link: NetworkLink,
    received: Vec<ActionRecord>,
    answered: u64,
}

impl SeedServer {
    /// A server on `link`.
    pub fn new(link: NetworkLink) -> Self {
        Self {
            link,
            received: Vec::new(),
            answered: 0,
        }
    }

    /// Handle one message. Returns `Ok(false)` when the client hung up.
    pub fn serve_one(&mut self) -> Result<bool, SyncError> {
        let msg = match self.link.incoming.recv() {
            Ok(msg) => msg,
            Err(_) => return Ok(false),
        };
        match msg {
            NetMessage::Records(records) => self.received.extend(records),
            NetMessage::RequestChoice {
                request_id, name, ..
            } if name == tags::RANDOM_SEED => {
                let seed = ActionRecord::dependent(tags::RANDOM_SEED)
                    .with("seed", fresh_seed())
                    .with("request_id", request_id);
                log::debug!("seed server answering request {request_id}");
                self.received.push(seed.clone());
                self.answered += 1;
                self.link.send(NetMessage::Records(vec![seed]))?;
            }
            NetMessage::RequestChoice { name, .. } => {
                log::warn!("seed server ignoring request for [{name}]");
            }
        }
        Ok(true)
    }

    /// Serve until the client hangs up.
    pub fn run(mut self) -> Result<SeedServer, SyncError> {
        while self.serve_one()? {}
        Ok(self)
    }

    /// Every record seen, in order, including the seeds handed out.
    pub fn received(&self) -> &[ActionRecord] {
        &self.received
    }

    /// Seed requests answered.
    pub fn answered(&self) -> u64 {
        self.answered
    }
}
