//! The session context: everything one peer needs for one match.
//!
//! A [`GameSession`] owns the world, the reconciliation layer, the timers,
//! the relay transport and the input state, and is passed explicitly to
//! whatever drives it. There are two entry points for time:
//!
//! - [`GameSession::frame`] when a frame is rendered: tick the world, run
//!   the AIs, pump the network, broadcast, then fire any due timers
//! - [`GameSession::background`] from a wall-clock wakeup while frames are
//!   throttled: pump the network and fire due timers
//!
//! The background tick, pending-action retries and position resync are
//! timers, so they keep running when no frames arrive.

use skirmish_core::ai::{AiController, Difficulty};
use skirmish_core::combat::Authority;
use skirmish_core::config::GameConfig;
use skirmish_core::events::WorldEvent;
use skirmish_core::player_facade::{PlayerCommand, TeamView};
use skirmish_core::team::Team;
use skirmish_core::world::GameWorld;
use skirmish_protocol::room::{ClientMessage, RelayMessage};
use skirmish_protocol::{Action, ActionEnvelope, ProtocolError};

use crate::camera::{Camera, CameraSettings};
use crate::error::{Result, SessionError};
use crate::input::{InputController, InputEvent};
use crate::reconciler::{ApplyOutcome, Reconciler};
use crate::scheduler::{Scheduler, TimerTask};
use crate::transport::Transport;
use crate::victory::{MatchState, MatchStats};

/// The multiplayer half of a session.
struct PeerLink {
    reconciler: Reconciler,
    transport: Box<dyn Transport>,
    reported_game_over: bool,
}

/// Network counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NetStats {
    /// Actions sent.
    pub sent: u64,
    /// Actions received.
    pub received: u64,
    /// Received actions with a tag this build does not know.
    pub unknown: u64,
    /// Received actions that failed to decode.
    pub malformed: u64,
    /// Messages the transport refused.
    pub send_failures: u64,
}

/// One peer's match.
pub struct GameSession {
    world: GameWorld,
    local_team: Team,
    scheduler: Scheduler,
    link: Option<PeerLink>,
    opponent_ai: Option<AiController>,
    autopilot: Option<AiController>,
    input: Option<InputController>,
    state: MatchState,
    stats: MatchStats,
    net: NetStats,
    started_ms: Option<u64>,
}

impl GameSession {
    /// A single-player match: the local player is [`Team::Player`], an AI
    /// plays [`Team::Enemy`].
    #[must_use]
    pub fn solo(config: GameConfig, difficulty: Difficulty) -> Self {
        let opponent = AiController::new(difficulty);
        let mut session = Self::with_world(GameWorld::new_match(config), Team::Player);
        session.opponent_ai = Some(opponent);
        session
    }

    /// One of two reconciling peers, talking through `transport`.
    #[must_use]
    pub fn multiplayer(
        config: GameConfig,
        local_team: Team,
        transport: Box<dyn Transport>,
    ) -> Self {
        let reconciler = Reconciler::new(local_team, &config);
        let mut world = GameWorld::new_match(config);
        world.configure_peer(Authority::Peer { local_team }, local_team.as_str());
        let mut session = Self::with_world(world, local_team);
        session.link = Some(PeerLink {
            reconciler,
            transport,
            reported_game_over: false,
        });
        session
    }

    fn with_world(world: GameWorld, local_team: Team) -> Self {
        Self {
            scheduler: Scheduler::new(world.config()),
            world,
            local_team,
            link: None,
            opponent_ai: None,
            autopilot: None,
            input: None,
            state: MatchState::Playing,
            stats: MatchStats::default(),
            net: NetStats::default(),
            started_ms: None,
        }
    }

    /// Let an AI play the local team too.
    #[must_use]
    pub fn with_autopilot(mut self, difficulty: Difficulty) -> Self {
        self.autopilot = Some(AiController::new(difficulty));
        self
    }

    /// Attach pointer and keyboard handling for a viewport of the given size.
    #[must_use]
    pub fn with_input(mut self, viewport: (f64, f64)) -> Self {
        let mut camera =
            Camera::new(viewport, self.world.config().world_size(), CameraSettings::default());
        camera.center_on(self.world.config().base_position(self.local_team));
        self.input = Some(InputController::new(self.local_team, camera));
        self
    }

    /// The match world.
    #[must_use]
    pub const fn world(&self) -> &GameWorld {
        &self.world
    }

    /// Mutable world access for hosts and tests.
    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    /// Team this session plays.
    #[must_use]
    pub const fn local_team(&self) -> Team {
        self.local_team
    }

    /// Result so far.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        self.state
    }

    /// Local statistics.
    #[must_use]
    pub const fn stats(&self) -> MatchStats {
        self.stats
    }

    /// Network counters.
    #[must_use]
    pub const fn net_stats(&self) -> NetStats {
        self.net
    }

    /// The reconciliation layer, in multiplayer.
    #[must_use]
    pub fn reconciler(&self) -> Option<&Reconciler> {
        self.link.as_ref().map(|link| &link.reconciler)
    }

    /// The timers.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The input state, if attached.
    #[must_use]
    pub fn input(&self) -> Option<&InputController> {
        self.input.as_ref()
    }

    /// Whether the match is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.started_ms.is_some() && !self.state.is_over()
    }

    /// Whether this is a multiplayer session.
    #[must_use]
    pub const fn is_multiplayer(&self) -> bool {
        self.link.is_some()
    }

    /// Begin the match and its timers. Multiplayer sessions call this when
    /// the relay announces the game start.
    pub fn start(&mut self, now_ms: u64) {
        if self.started_ms.is_some() {
            return;
        }
        self.started_ms = Some(now_ms);
        let tasks: &[TimerTask] = if self.link.is_some() {
            &[TimerTask::BackgroundTick, TimerTask::PositionSync]
        } else {
            &[TimerTask::BackgroundTick]
        };
        self.scheduler.start(now_ms, tasks);
        tracing::info!(team = %self.local_team, multiplayer = self.link.is_some(), "Match started");
    }

    /// Rendered-frame step. Returns the world events of this step.
    pub fn frame(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        if !self.is_running() {
            self.pump_network(now_ms);
            return Vec::new();
        }

        let mut events = self.world.tick(now_ms);
        events.extend(self.drive_ais(now_ms));
        self.pump_network(now_ms);
        self.after_events(&events, now_ms);
        events.extend(self.run_due_timers(now_ms));
        events
    }

    /// Wakeup without a frame.
    pub fn background(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        self.pump_network(now_ms);
        self.run_due_timers(now_ms)
    }

    /// Fire whichever timers are due.
    pub fn run_due_timers(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let mut produced = Vec::new();
        for task in self.scheduler.due(now_ms) {
            match task {
                TimerTask::BackgroundTick => {
                    let events = self.world.background_tick(now_ms);
                    self.after_events(&events, now_ms);
                    produced.extend(events);
                }
                TimerTask::PendingRetry => self.retry_pending(now_ms),
                TimerTask::PositionSync => {
                    let sync = self
                        .link
                        .as_ref()
                        .map(|link| link.reconciler.position_sync(&self.world));
                    if let Some(sync) = sync {
                        self.send_action(sync);
                    }
                }
            }
        }
        produced
    }

    /// Issue a command for the local team.
    ///
    /// Rejections never reach the network.
    pub fn issue(&mut self, command: PlayerCommand, now_ms: u64) -> Result<Vec<WorldEvent>> {
        if self.state.is_over() {
            return Err(SessionError::GameOver);
        }
        if self.started_ms.is_none() {
            return Err(SessionError::NotStarted);
        }
        let events = self.world.issue(self.local_team, command, now_ms)?;
        self.after_events(&events, now_ms);
        Ok(events)
    }

    /// Feed one input event. Returns the errors of any rejected commands.
    pub fn handle_input(&mut self, event: InputEvent, now_ms: u64) -> Vec<SessionError> {
        let Some(input) = self.input.as_mut() else {
            return Vec::new();
        };
        let commands = input.handle(event, &mut self.world);
        commands
            .into_iter()
            .filter_map(|command| match self.issue(command, now_ms) {
                Ok(_) => None,
                Err(error) => {
                    tracing::debug!(%error, "Command rejected");
                    Some(error)
                }
            })
            .collect()
    }

    /// React to one relay message.
    pub fn handle_relay(&mut self, message: RelayMessage, now_ms: u64) {
        match message {
            RelayMessage::GameAction(value) => self.receive_action(value, now_ms),
            RelayMessage::GameStarted => self.start(now_ms),
            RelayMessage::GameOver { winner, reason } => {
                tracing::info!(%winner, %reason, "Relay declared game over");
                if let Some(link) = self.link.as_mut() {
                    link.reported_game_over = true;
                }
                self.world.declare_winner(winner);
                self.finish(now_ms);
            }
            RelayMessage::PlayerDisconnected { player_id, grace_ms } => {
                tracing::info!(player_id, grace_ms, "Opponent disconnected");
            }
            RelayMessage::Identity { player_id } => tracing::info!(player_id, "Connected to relay"),
            RelayMessage::RoomCreated { room_code, team }
            | RelayMessage::RoomJoined { room_code, team } => {
                tracing::info!(%room_code, %team, "In room");
            }
            RelayMessage::PlayersReady { can_start } => {
                tracing::info!(can_start, "Readiness changed");
            }
            RelayMessage::Error { message } => tracing::warn!(%message, "Relay refused a request"),
        }
    }

    /// Leave the match: stop timers, drop pending work and tell the relay.
    pub fn leave(&mut self) {
        self.scheduler.stop();
        if let Some(link) = self.link.as_mut() {
            link.reconciler.clear();
            if let Err(error) = link.transport.send(ClientMessage::LeaveRoom) {
                tracing::warn!(%error, "Failed to notify relay");
            }
        }
    }

    fn drive_ais(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        if let Some(ai) = self.opponent_ai.as_mut() {
            let mut view = TeamView::new(&mut self.world, self.local_team.opponent(), now_ms);
            ai.update(&mut view);
            events.extend(view.into_events());
        }
        if let Some(ai) = self.autopilot.as_mut() {
            let mut view = TeamView::new(&mut self.world, self.local_team, now_ms);
            ai.update(&mut view);
            events.extend(view.into_events());
        }
        events
    }

    fn pump_network(&mut self, now_ms: u64) {
        loop {
            let Some(link) = self.link.as_mut() else {
                return;
            };
            let Some(message) = link.transport.receive(now_ms) else {
                return;
            };
            self.handle_relay(message, now_ms);
        }
    }

    fn receive_action(&mut self, value: serde_json::Value, now_ms: u64) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        self.net.received += 1;
        let envelope = match ActionEnvelope::from_value(value) {
            Ok(envelope) => envelope,
            Err(ProtocolError::UnknownAction(tag)) => {
                tracing::warn!(action = %tag, "Ignoring unknown remote action");
                self.net.unknown += 1;
                return;
            }
            Err(error) => {
                tracing::warn!(%error, "Ignoring undecodable remote action");
                self.net.malformed += 1;
                return;
            }
        };
        if self.state.is_over() {
            return;
        }
        let outcome = link.reconciler.apply_remote(&mut self.world, envelope.action, now_ms);
        if outcome == ApplyOutcome::Deferred {
            self.scheduler.arm(TimerTask::PendingRetry, now_ms);
        }
    }

    fn retry_pending(&mut self, now_ms: u64) {
        let Some(link) = self.link.as_mut() else {
            self.scheduler.disarm(TimerTask::PendingRetry);
            return;
        };
        let report = link.reconciler.retry_pending(&mut self.world, now_ms);
        if report.remaining == 0 {
            self.scheduler.disarm(TimerTask::PendingRetry);
        }
    }

    fn after_events(&mut self, events: &[WorldEvent], now_ms: u64) {
        self.stats.record(events, self.local_team);
        let outbound = self
            .link
            .as_ref()
            .map(|link| link.reconciler.outbound(events))
            .unwrap_or_default();
        for action in outbound {
            self.send_action(action);
        }
        if self.world.is_over() && !self.state.is_over() {
            self.finish(now_ms);
        }
    }

    fn send_action(&mut self, action: Action) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let tag = action.tag();
        let result = ActionEnvelope::new(action)
            .to_value()
            .map_err(SessionError::from)
            .and_then(|value| link.transport.send(ClientMessage::GameAction(value)));
        match result {
            Ok(()) => self.net.sent += 1,
            Err(error) => {
                tracing::warn!(action = tag, %error, "Failed to send action");
                self.net.send_failures += 1;
            }
        }
    }

    fn finish(&mut self, now_ms: u64) {
        if self.state.is_over() {
            return;
        }
        self.state = MatchState::from_winner(self.world.winner(), self.local_team);
        self.stats.duration_ms = self.started_ms.map_or(0, |start| now_ms.saturating_sub(start));
        self.scheduler.stop();
        tracing::info!(state = ?self.state, duration_ms = self.stats.duration_ms, "Match finished");

        let Some(link) = self.link.as_mut() else {
            return;
        };
        link.reconciler.clear();
        if let Some(winner) = self.world.winner().filter(|_| !link.reported_game_over) {
            link.reported_game_over = true;
            if let Err(error) = link.transport.send(ClientMessage::GameOver { winner }) {
                tracing::warn!(%error, "Failed to report game over");
            }
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("local_team", &self.local_team)
            .field("state", &self.state)
            .field("multiplayer", &self.link.is_some())
            .field("started_ms", &self.started_ms)
            .finish_non_exhaustive()
    }
}
