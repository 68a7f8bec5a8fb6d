//! Connections from a session to the relay.
//!
//! A session only needs to send [`ClientMessage`]s and poll for
//! [`RelayMessage`]s. [`ChannelTransport`] bridges to an async connection
//! task over tokio channels. [`link_pair`] connects two sessions in process
//! through a relay stand-in with configurable latency and reordering.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use skirmish_core::team::Team;
use skirmish_protocol::envelope::stamp_sender;
use skirmish_protocol::room::{ClientMessage, PlayerId, RelayMessage};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Result, SessionError};

/// A bidirectional, non-blocking message pipe to the relay.
pub trait Transport: Send {
    /// Queue a message for the relay.
    fn send(&mut self, message: ClientMessage) -> Result<()>;

    /// Next message available at `now_ms`, if any.
    fn receive(&mut self, now_ms: u64) -> Option<RelayMessage>;
}

/// A transport backed by unbounded tokio channels.
///
/// The other halves belong to whatever task owns the real connection.
#[derive(Debug)]
pub struct ChannelTransport {
    outgoing: UnboundedSender<ClientMessage>,
    incoming: UnboundedReceiver<RelayMessage>,
}

/// The connection-task side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct ChannelEndpoint {
    /// Messages the session sent.
    pub from_session: UnboundedReceiver<ClientMessage>,
    /// Messages for the session.
    pub to_session: UnboundedSender<RelayMessage>,
}

impl ChannelTransport {
    /// A transport and the endpoint a connection task drives.
    #[must_use]
    pub fn new() -> (Self, ChannelEndpoint) {
        let (outgoing, from_session) = mpsc::unbounded_channel();
        let (to_session, incoming) = mpsc::unbounded_channel();
        (
            Self { outgoing, incoming },
            ChannelEndpoint {
                from_session,
                to_session,
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: ClientMessage) -> Result<()> {
        self.outgoing
            .send(message)
            .map_err(|_| SessionError::Transport("connection task has stopped".to_string()))
    }

    fn receive(&mut self, _now_ms: u64) -> Option<RelayMessage> {
        self.incoming.try_recv().ok()
    }
}

/// Delivery behaviour of an in-process link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LinkProfile {
    /// Base one-way latency.
    pub latency_ms: u64,
    /// Extra per-message delay, uniformly spread over `0..=jitter_ms`.
    /// Jitter larger than the send spacing reorders messages.
    pub jitter_ms: u64,
    /// Seed for the jitter sequence.
    pub seed: u64,
}

impl LinkProfile {
    /// Immediate, in-order delivery.
    pub const INSTANT: Self = Self {
        latency_ms: 0,
        jitter_ms: 0,
        seed: 0,
    };

    fn delay_ms(&self, sequence: u64) -> u64 {
        if self.jitter_ms == 0 {
            return self.latency_ms;
        }
        self.latency_ms + splitmix64(self.seed ^ sequence) % (self.jitter_ms + 1)
    }
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self::INSTANT
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Default)]
struct Inbox {
    /// Keyed by (delivery time, send order).
    queue: BTreeMap<(u64, u64), RelayMessage>,
}

#[derive(Debug)]
struct LinkState {
    profile: LinkProfile,
    inboxes: [Inbox; 2],
    clocks: [u64; 2],
    sequence: u64,
    sent: u64,
    delivered: u64,
}

/// One end of an in-process link. Created by [`link_pair`].
#[derive(Debug, Clone)]
pub struct LinkTransport {
    side: usize,
    player_id: PlayerId,
    state: Arc<Mutex<LinkState>>,
}

/// Two connected link ends. The first plays [`Team::Player`], the second
/// [`Team::Enemy`]; their relay ids are 1 and 2.
#[must_use]
pub fn link_pair(profile: LinkProfile) -> (LinkTransport, LinkTransport) {
    let state = Arc::new(Mutex::new(LinkState {
        profile,
        inboxes: [Inbox::default(), Inbox::default()],
        clocks: [0, 0],
        sequence: 0,
        sent: 0,
        delivered: 0,
    }));
    let end = |side: usize, player_id: PlayerId| LinkTransport {
        side,
        player_id,
        state: Arc::clone(&state),
    };
    (end(0, 1), end(1, 2))
}

impl LinkTransport {
    /// Relay id of this end.
    #[must_use]
    pub const fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Team this end plays.
    #[must_use]
    pub const fn team(&self) -> Team {
        if self.side == 0 {
            Team::Player
        } else {
            Team::Enemy
        }
    }

    /// Messages sent and delivered over the whole link so far.
    #[must_use]
    pub fn counters(&self) -> (u64, u64) {
        self.state
            .lock()
            .map(|state| (state.sent, state.delivered))
            .unwrap_or_default()
    }

    /// Messages still in flight toward either end.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.inboxes.iter().map(|inbox| inbox.queue.len()).sum())
            .unwrap_or_default()
    }

    /// Deliver `message` to the other end after the link delay.
    fn forward(&self, message: RelayMessage) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SessionError::Transport("link state poisoned".to_string()))?;
        let sequence = state.sequence;
        state.sequence += 1;
        state.sent += 1;
        let deliver_at = state.clocks[self.side] + state.profile.delay_ms(sequence);
        state.inboxes[1 - self.side].queue.insert((deliver_at, sequence), message);
        Ok(())
    }

    /// Deliver `message` back to this end immediately.
    fn reply(&self, message: RelayMessage) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SessionError::Transport("link state poisoned".to_string()))?;
        let sequence = state.sequence;
        state.sequence += 1;
        let now = state.clocks[self.side];
        state.inboxes[self.side].queue.insert((now, sequence), message);
        Ok(())
    }
}

impl Transport for LinkTransport {
    fn send(&mut self, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::GameAction(value) => {
                self.forward(RelayMessage::GameAction(stamp_sender(value, self.player_id)))
            }
            ClientMessage::GameOver { winner } => {
                let verdict = RelayMessage::GameOver {
                    winner,
                    reason: "reported by peer".to_string(),
                };
                self.forward(verdict.clone())?;
                self.reply(verdict)
            }
            ClientMessage::LeaveRoom => self.forward(RelayMessage::PlayerDisconnected {
                player_id: self.player_id,
                grace_ms: 0,
            }),
            ClientMessage::CreateRoom
            | ClientMessage::JoinRoom { .. }
            | ClientMessage::Ready
            | ClientMessage::StartGame => {
                tracing::trace!(side = self.side, "Lobby request ignored on an in-process link");
                Ok(())
            }
        }
    }

    fn receive(&mut self, now_ms: u64) -> Option<RelayMessage> {
        let mut state = self.state.lock().ok()?;
        state.clocks[self.side] = now_ms;
        let inbox = &mut state.inboxes[self.side];
        let (&(deliver_at, _), _) = inbox.queue.first_key_value()?;
        if deliver_at > now_ms {
            return None;
        }
        let (_, message) = inbox.queue.pop_first()?;
        state.delivered += 1;
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(n: u64) -> ClientMessage {
        ClientMessage::GameAction(json!({
            "action": "positionSync",
            "data": { "units": [] },
            "n": n
        }))
    }

    fn drain(end: &mut LinkTransport, now_ms: u64) -> Vec<RelayMessage> {
        std::iter::from_fn(|| end.receive(now_ms)).collect()
    }

    #[test]
    fn test_instant_link_stamps_sender() {
        let (mut a, mut b) = link_pair(LinkProfile::INSTANT);
        a.send(action(0)).unwrap();
        let received = drain(&mut b, 0);
        assert_eq!(received.len(), 1);
        let RelayMessage::GameAction(value) = &received[0] else {
            panic!("expected a game action");
        };
        assert_eq!(value["senderId"], "1");
        assert!(drain(&mut a, 0).is_empty());
    }

    #[test]
    fn test_latency_holds_messages_back() {
        let (mut a, mut b) = link_pair(LinkProfile {
            latency_ms: 100,
            jitter_ms: 0,
            seed: 0,
        });
        a.receive(1_000);
        a.send(action(0)).unwrap();
        assert!(drain(&mut b, 1_099).is_empty());
        assert_eq!(drain(&mut b, 1_100).len(), 1);
        assert_eq!(a.counters(), (1, 1));
    }

    #[test]
    fn test_jitter_reorders_deterministically() {
        let profile = LinkProfile {
            latency_ms: 10,
            jitter_ms: 500,
            seed: 7,
        };
        let order = |profile: LinkProfile| {
            let (mut a, mut b) = link_pair(profile);
            for n in 0..20 {
                a.send(action(n)).unwrap();
            }
            drain(&mut b, 10_000)
                .into_iter()
                .filter_map(|message| match message {
                    RelayMessage::GameAction(value) => value["n"].as_u64(),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let first = order(profile);
        assert_eq!(first.len(), 20);
        assert_eq!(first, order(profile));
        assert_ne!(first, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_game_over_reaches_both_ends() {
        let (mut a, mut b) = link_pair(LinkProfile::INSTANT);
        a.send(ClientMessage::GameOver { winner: Team::Player }).unwrap();
        for end in [&mut a, &mut b] {
            assert!(matches!(
                drain(end, 0).as_slice(),
                [RelayMessage::GameOver {
                    winner: Team::Player,
                    ..
                }]
            ));
        }
    }

    #[test]
    fn test_channel_transport_round_trip() {
        let (mut transport, mut endpoint) = ChannelTransport::new();
        transport.send(ClientMessage::Ready).unwrap();
        assert_eq!(endpoint.from_session.try_recv().unwrap(), ClientMessage::Ready);

        endpoint.to_session.send(RelayMessage::GameStarted).unwrap();
        assert_eq!(transport.receive(0), Some(RelayMessage::GameStarted));
        assert_eq!(transport.receive(0), None);

        drop(endpoint);
        assert!(transport.send(ClientMessage::Ready).is_err());
    }
}
