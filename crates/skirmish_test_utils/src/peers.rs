//! Two-peer harnesses.
//!
//! [`PeerPair`] works at the reconciler level: actions produced by one peer
//! wait in an explicit queue until the test delivers them, in whatever
//! order it likes. [`Duel`] wires two full sessions over an in-process link
//! and lets time drive delivery.

use std::collections::VecDeque;

use skirmish_client::divergence::{compare, Divergence};
use skirmish_client::reconciler::{ApplyOutcome, Reconciler, RetryReport};
use skirmish_client::session::GameSession;
use skirmish_client::transport::{link_pair, LinkProfile, LinkTransport};
use skirmish_core::config::GameConfig;
use skirmish_core::error::Result;
use skirmish_core::events::WorldEvent;
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::{Team, TeamMap};
use skirmish_core::world::GameWorld;
use skirmish_protocol::Action;

use crate::fixtures::peer_world_with;

/// One side of a [`PeerPair`].
#[derive(Debug)]
struct Peer {
    world: GameWorld,
    reconciler: Reconciler,
    /// Actions sent by the other peer, not yet delivered here.
    inbox: VecDeque<Action>,
}

/// Two reconciling peers with hand-delivered traffic.
#[derive(Debug)]
pub struct PeerPair {
    peers: TeamMap<Peer>,
}

impl Default for PeerPair {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl PeerPair {
    /// Two fresh peers of the same match.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let peers = TeamMap::from_fn(|team| Peer {
            world: peer_world_with(config.clone(), team),
            reconciler: Reconciler::new(team, &config),
            inbox: VecDeque::new(),
        });
        Self { peers }
    }

    /// World of the peer playing `team`.
    #[must_use]
    pub fn world(&self, team: Team) -> &GameWorld {
        &self.peers[team].world
    }

    /// Mutable world of the peer playing `team`.
    pub fn world_mut(&mut self, team: Team) -> &mut GameWorld {
        &mut self.peers[team].world
    }

    /// Reconciler of the peer playing `team`.
    #[must_use]
    pub fn reconciler(&self, team: Team) -> &Reconciler {
        &self.peers[team].reconciler
    }

    /// Issue a command on `team`'s peer and queue what it broadcasts.
    ///
    /// # Errors
    ///
    /// Returns the world's rejection; nothing is queued then.
    pub fn issue(
        &mut self,
        team: Team,
        command: PlayerCommand,
        now_ms: u64,
    ) -> Result<Vec<WorldEvent>> {
        let events = self.peers[team].world.issue(team, command, now_ms)?;
        self.broadcast(team, &events);
        Ok(events)
    }

    /// Frame and background tick on `team`'s peer, queueing what it broadcasts.
    pub fn tick(&mut self, team: Team, now_ms: u64) -> Vec<WorldEvent> {
        let mut events = self.peers[team].world.tick(now_ms);
        events.extend(self.peers[team].world.background_tick(now_ms));
        self.broadcast(team, &events);
        events
    }

    /// Tick both peers.
    pub fn tick_both(&mut self, now_ms: u64) {
        for team in Team::ALL {
            self.tick(team, now_ms);
        }
    }

    /// Queue `team`'s position snapshot for its opponent.
    pub fn sync_positions(&mut self, team: Team) {
        let sync = self.peers[team].reconciler.position_sync(&self.peers[team].world);
        self.peers[team.opponent()].inbox.push_back(sync);
    }

    /// Put an arbitrary action in `to`'s inbox.
    pub fn inject(&mut self, to: Team, action: Action) {
        self.peers[to].inbox.push_back(action);
    }

    /// Actions waiting for `to`.
    #[must_use]
    pub fn in_flight(&self, to: Team) -> usize {
        self.peers[to].inbox.len()
    }

    /// Take `to`'s undelivered actions, leaving its inbox empty.
    pub fn take_in_flight(&mut self, to: Team) -> Vec<Action> {
        self.peers[to].inbox.drain(..).collect()
    }

    /// Apply one action on `to`'s peer.
    pub fn deliver(&mut self, to: Team, action: Action, now_ms: u64) -> ApplyOutcome {
        let peer = &mut self.peers[to];
        peer.reconciler.apply_remote(&mut peer.world, action, now_ms)
    }

    /// Deliver `to`'s inbox in send order.
    pub fn deliver_all(&mut self, to: Team, now_ms: u64) -> Vec<ApplyOutcome> {
        self.take_in_flight(to)
            .into_iter()
            .map(|action| self.deliver(to, action, now_ms))
            .collect()
    }

    /// Deliver `to`'s inbox newest first.
    pub fn deliver_reversed(&mut self, to: Team, now_ms: u64) -> Vec<ApplyOutcome> {
        self.take_in_flight(to)
            .into_iter()
            .rev()
            .map(|action| self.deliver(to, action, now_ms))
            .collect()
    }

    /// Run one retry pass on `team`'s peer.
    pub fn retry(&mut self, team: Team, now_ms: u64) -> RetryReport {
        let peer = &mut self.peers[team];
        peer.reconciler.retry_pending(&mut peer.world, now_ms)
    }

    /// How far the two worlds disagree.
    #[must_use]
    pub fn divergence(&self) -> Divergence {
        compare(&self.peers[Team::Player].world, &self.peers[Team::Enemy].world)
    }

    fn broadcast(&mut self, from: Team, events: &[WorldEvent]) {
        let actions = self.peers[from].reconciler.outbound(events);
        self.peers[from.opponent()].inbox.extend(actions);
    }
}

/// Two full sessions over an in-process link.
pub struct Duel {
    sessions: TeamMap<GameSession>,
    link: LinkTransport,
    now_ms: u64,
}

impl std::fmt::Debug for Duel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duel")
            .field("now_ms", &self.now_ms)
            .field("in_flight", &self.link.in_flight())
            .finish_non_exhaustive()
    }
}

impl Duel {
    /// Two started sessions. Neither side has an AI; drive them through
    /// [`Duel::session_mut`].
    #[must_use]
    pub fn new(config: GameConfig, profile: LinkProfile) -> Self {
        let (player_end, enemy_end) = link_pair(profile);
        let link = player_end.clone();
        let mut sessions = TeamMap::from_fn(|team| {
            let end = match team {
                Team::Player => player_end.clone(),
                Team::Enemy => enemy_end.clone(),
            };
            GameSession::multiplayer(config.clone(), team, Box::new(end))
        });
        for team in Team::ALL {
            sessions[team].start(0);
        }
        Self {
            sessions,
            link,
            now_ms: 0,
        }
    }

    /// The session playing `team`.
    #[must_use]
    pub fn session(&self, team: Team) -> &GameSession {
        &self.sessions[team]
    }

    /// Mutable session playing `team`.
    pub fn session_mut(&mut self, team: Team) -> &mut GameSession {
        &mut self.sessions[team]
    }

    /// Current harness time.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Messages still travelling in either direction.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.link.in_flight()
    }

    /// Advance both sessions frame by frame until `until_ms`.
    pub fn run_frames(&mut self, until_ms: u64, frame_ms: u64) {
        let step = frame_ms.max(1);
        while self.now_ms < until_ms {
            self.now_ms = (self.now_ms + step).min(until_ms);
            for team in Team::ALL {
                self.sessions[team].frame(self.now_ms);
            }
        }
    }

    /// Advance both sessions on background wakeups only, as when frames
    /// are throttled.
    pub fn run_background(&mut self, until_ms: u64, wakeup_ms: u64) {
        let step = wakeup_ms.max(1);
        while self.now_ms < until_ms {
            self.now_ms = (self.now_ms + step).min(until_ms);
            for team in Team::ALL {
                self.sessions[team].background(self.now_ms);
            }
        }
    }

    /// Keep waking both sessions until nothing is in flight and no retries
    /// are pending, or `max_ms` of harness time has passed.
    pub fn settle(&mut self, max_ms: u64, wakeup_ms: u64) {
        let deadline = self.now_ms + max_ms;
        while self.now_ms < deadline && !self.is_quiet() {
            self.run_background(self.now_ms + wakeup_ms.max(1), wakeup_ms);
        }
    }

    /// How far the two sessions' worlds disagree.
    #[must_use]
    pub fn divergence(&self) -> Divergence {
        compare(self.sessions[Team::Player].world(), self.sessions[Team::Enemy].world())
    }

    fn is_quiet(&self) -> bool {
        self.link.in_flight() == 0
            && Team::ALL
                .iter()
                .all(|&team| self.sessions[team].reconciler().map_or(true, |r| !r.has_pending()))
    }
}
