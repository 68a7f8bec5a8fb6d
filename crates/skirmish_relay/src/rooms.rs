//! Room bookkeeping.
//!
//! [`Rooms`] is a plain state machine: every request returns the messages it
//! causes, addressed by player id, and the server delivers them. Time only
//! enters through the `now_ms` arguments, so the whole lifecycle is testable
//! without sockets.
//!
//! A room holds two seats. The creator plays [`Team::Player`], the joiner
//! [`Team::Enemy`]. Once both are ready the creator may start the match;
//! from then on game actions from one seat are relayed to the other with the
//! sender's id stamped in. A player who drops mid-match has a grace window
//! to rejoin with the room code; when it runs out the other player wins.

use std::collections::{BTreeMap, HashMap};

use skirmish_core::team::{Team, TeamMap};
use skirmish_protocol::envelope::stamp_sender;
use skirmish_protocol::room::{ClientMessage, PlayerId, RelayMessage, RoomCode};

use crate::error::{RelayError, Result};

/// A message for one connection.
pub type Delivery = (PlayerId, RelayMessage);

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const CODE_LENGTH: u32 = 4;
/// Odd and not a multiple of 3, so it permutes the code space.
const CODE_STRIDE: u64 = 7_919;

/// Where a room is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for players to join and ready up.
    Lobby,
    /// Match running; actions are relayed.
    Playing,
    /// A winner has been announced.
    Finished,
}

/// A seat whose player dropped mid-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Absence {
    team: Team,
    player: PlayerId,
    deadline_ms: u64,
}

/// One two-player room.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    seats: TeamMap<Option<PlayerId>>,
    ready: TeamMap<bool>,
    phase: Phase,
    absence: Option<Absence>,
}

impl Room {
    fn new(code: RoomCode, creator: PlayerId) -> Self {
        Self {
            code,
            seats: TeamMap {
                player: Some(creator),
                enemy: None,
            },
            ready: TeamMap::default(),
            phase: Phase::Lobby,
            absence: None,
        }
    }

    /// Join code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Player in `team`'s seat.
    #[must_use]
    pub fn seat(&self, team: Team) -> Option<PlayerId> {
        *self.seats.get(team)
    }

    /// Team of a seated player.
    #[must_use]
    pub fn team_of(&self, player: PlayerId) -> Option<Team> {
        Team::ALL.into_iter().find(|&team| self.seat(team) == Some(player))
    }

    fn can_start(&self) -> bool {
        Team::ALL
            .into_iter()
            .all(|team| self.seat(team).is_some() && *self.ready.get(team))
    }

    fn occupants(&self) -> impl Iterator<Item = PlayerId> + '_ {
        Team::ALL.into_iter().filter_map(|team| self.seat(team))
    }

    fn to_all(&self, message: &RelayMessage) -> Vec<Delivery> {
        self.occupants().map(|player| (player, message.clone())).collect()
    }

    fn is_empty(&self) -> bool {
        self.occupants().next().is_none()
    }
}

/// Every room on the relay.
#[derive(Debug)]
pub struct Rooms {
    rooms: BTreeMap<RoomCode, Room>,
    members: HashMap<PlayerId, RoomCode>,
    grace_ms: u64,
    codes_issued: u64,
}

impl Rooms {
    /// An empty relay whose disconnected players get `grace_ms` to return.
    #[must_use]
    pub fn new(grace_ms: u64) -> Self {
        Self {
            rooms: BTreeMap::new(),
            members: HashMap::new(),
            grace_ms,
            codes_issued: 0,
        }
    }

    /// Number of open rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Look up a room.
    #[must_use]
    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Room a player sits in.
    #[must_use]
    pub fn room_of(&self, player: PlayerId) -> Option<&Room> {
        self.members.get(&player).and_then(|code| self.rooms.get(code))
    }

    /// Apply one client request.
    ///
    /// # Errors
    ///
    /// Returns why the request was refused; nothing changes then.
    pub fn handle(
        &mut self,
        player: PlayerId,
        message: ClientMessage,
        now_ms: u64,
    ) -> Result<Vec<Delivery>> {
        match message {
            ClientMessage::CreateRoom => self.create(player),
            ClientMessage::JoinRoom { room_code } => {
                self.join(player, &room_code.to_ascii_uppercase())
            }
            ClientMessage::Ready => self.ready(player),
            ClientMessage::StartGame => self.start(player),
            ClientMessage::GameAction(value) => self.relay(player, value),
            ClientMessage::GameOver { winner } => self.report_game_over(player, winner),
            ClientMessage::LeaveRoom => Ok(self.leave(player, now_ms)),
        }
    }

    fn create(&mut self, player: PlayerId) -> Result<Vec<Delivery>> {
        if let Some(code) = self.members.get(&player) {
            return Err(RelayError::AlreadyInRoom(player, code.clone()));
        }
        let code = self.next_code();
        self.rooms.insert(code.clone(), Room::new(code.clone(), player));
        self.members.insert(player, code.clone());
        tracing::info!(player, room = %code, "Room created");
        Ok(vec![(
            player,
            RelayMessage::RoomCreated {
                room_code: code,
                team: Team::Player,
            },
        )])
    }

    fn join(&mut self, player: PlayerId, code: &str) -> Result<Vec<Delivery>> {
        if let Some(current) = self.members.get(&player) {
            return Err(RelayError::AlreadyInRoom(player, current.clone()));
        }
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RelayError::RoomNotFound(code.to_string()))?;

        let team = match (room.phase, room.absence) {
            (Phase::Lobby, _) if room.seats.enemy.is_none() => Team::Enemy,
            (Phase::Playing, Some(absence)) => absence.team,
            (Phase::Lobby, _) => return Err(RelayError::RoomFull(code.to_string())),
            _ => return Err(RelayError::AlreadyStarted(code.to_string())),
        };
        *room.seats.get_mut(team) = Some(player);
        self.members.insert(player, code.to_string());

        let mut deliveries = vec![(
            player,
            RelayMessage::RoomJoined {
                room_code: code.to_string(),
                team,
            },
        )];
        if let Some(absence) = room.absence.take() {
            tracing::info!(
                player,
                replaces = absence.player,
                room = %code,
                %team,
                "Player rejoined"
            );
            deliveries.push((player, RelayMessage::GameStarted));
        } else {
            tracing::info!(player, room = %code, "Room joined");
            let can_start = room.can_start();
            deliveries.extend(room.to_all(&RelayMessage::PlayersReady { can_start }));
        }
        Ok(deliveries)
    }

    fn ready(&mut self, player: PlayerId) -> Result<Vec<Delivery>> {
        let room = self.room_mut(player)?;
        if room.phase != Phase::Lobby {
            return Err(RelayError::AlreadyStarted(room.code.clone()));
        }
        let team = room.team_of(player).ok_or(RelayError::NotInRoom(player))?;
        *room.ready.get_mut(team) = true;
        let can_start = room.can_start();
        tracing::debug!(player, room = %room.code, can_start, "Player ready");
        Ok(room.to_all(&RelayMessage::PlayersReady { can_start }))
    }

    fn start(&mut self, player: PlayerId) -> Result<Vec<Delivery>> {
        let room = self.room_mut(player)?;
        if room.phase != Phase::Lobby {
            return Err(RelayError::AlreadyStarted(room.code.clone()));
        }
        if room.seat(Team::Player) != Some(player) {
            return Err(RelayError::NotCreator);
        }
        if !room.can_start() {
            return Err(RelayError::NotReady);
        }
        room.phase = Phase::Playing;
        tracing::info!(room = %room.code, "Match started");
        Ok(room.to_all(&RelayMessage::GameStarted))
    }

    fn relay(&mut self, player: PlayerId, value: serde_json::Value) -> Result<Vec<Delivery>> {
        let room = self.room_mut(player)?;
        if room.phase == Phase::Lobby {
            return Err(RelayError::NotStarted(room.code.clone()));
        }
        let team = room.team_of(player).ok_or(RelayError::NotInRoom(player))?;
        let Some(recipient) = room.seat(team.opponent()) else {
            tracing::debug!(player, room = %room.code, "No one to relay to, dropping action");
            return Ok(Vec::new());
        };
        Ok(vec![(recipient, RelayMessage::GameAction(stamp_sender(value, player)))])
    }

    fn report_game_over(&mut self, player: PlayerId, winner: Team) -> Result<Vec<Delivery>> {
        let room = self.room_mut(player)?;
        match room.phase {
            Phase::Lobby => Err(RelayError::NotStarted(room.code.clone())),
            Phase::Finished => Ok(Vec::new()),
            Phase::Playing => {
                room.phase = Phase::Finished;
                tracing::info!(room = %room.code, %winner, reporter = player, "Match over");
                Ok(room.to_all(&RelayMessage::GameOver {
                    winner,
                    reason: "base destroyed".to_string(),
                }))
            }
        }
    }

    /// A player left on purpose. Mid-match, the opponent wins at once.
    pub fn leave(&mut self, player: PlayerId, now_ms: u64) -> Vec<Delivery> {
        self.vacate(player, now_ms, false)
    }

    /// A connection dropped. Mid-match, the opponent is told and the grace
    /// window starts.
    pub fn disconnect(&mut self, player: PlayerId, now_ms: u64) -> Vec<Delivery> {
        self.vacate(player, now_ms, true)
    }

    fn vacate(&mut self, player: PlayerId, now_ms: u64, dropped: bool) -> Vec<Delivery> {
        let Some(code) = self.members.remove(&player) else {
            return Vec::new();
        };
        let grace_ms = self.grace_ms;
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };
        let Some(team) = room.team_of(player) else {
            return Vec::new();
        };
        *room.seats.get_mut(team) = None;
        *room.ready.get_mut(team) = false;

        let mut deliveries = Vec::new();
        match room.phase {
            Phase::Lobby if team == Team::Player => {
                tracing::info!(room = %code, "Creator left, closing room");
                deliveries.extend(room.to_all(&RelayMessage::Error {
                    message: format!("room {code} was closed by its creator"),
                }));
                for member in room.occupants() {
                    self.members.remove(&member);
                }
                self.rooms.remove(&code);
                return deliveries;
            }
            Phase::Lobby => {
                tracing::info!(player, room = %code, "Player left lobby");
                deliveries.extend(room.to_all(&RelayMessage::PlayersReady { can_start: false }));
            }
            Phase::Playing if dropped && room.absence.is_none() => {
                tracing::info!(player, room = %code, grace_ms, "Player disconnected mid-match");
                room.absence = Some(Absence {
                    team,
                    player,
                    deadline_ms: now_ms + grace_ms,
                });
                deliveries.extend(room.to_all(&RelayMessage::PlayerDisconnected {
                    player_id: player,
                    grace_ms,
                }));
            }
            Phase::Playing => {
                room.phase = Phase::Finished;
                room.absence = None;
                let winner = team.opponent();
                tracing::info!(player, room = %code, %winner, "Player left mid-match");
                deliveries.extend(room.to_all(&RelayMessage::GameOver {
                    winner,
                    reason: "opponent left".to_string(),
                }));
            }
            Phase::Finished => {}
        }

        if room.is_empty() {
            tracing::debug!(room = %code, "Room empty, removing");
            self.rooms.remove(&code);
        }
        deliveries
    }

    /// Close grace windows that ran out by `now_ms`, declaring the remaining
    /// player the winner.
    pub fn expire(&mut self, now_ms: u64) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        for room in self.rooms.values_mut() {
            let Some(absence) = room.absence.filter(|a| a.deadline_ms <= now_ms) else {
                continue;
            };
            room.absence = None;
            room.phase = Phase::Finished;
            let winner = absence.team.opponent();
            tracing::info!(
                room = %room.code,
                %winner,
                absent = absence.player,
                "Grace window expired"
            );
            deliveries.extend(room.to_all(&RelayMessage::GameOver {
                winner,
                reason: "opponent disconnected".to_string(),
            }));
        }
        deliveries
    }

    fn room_mut(&mut self, player: PlayerId) -> Result<&mut Room> {
        self.members
            .get(&player)
            .and_then(|code| self.rooms.get_mut(code))
            .ok_or(RelayError::NotInRoom(player))
    }

    fn next_code(&mut self) -> RoomCode {
        loop {
            let code = room_code(self.codes_issued);
            self.codes_issued += 1;
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

/// The `n`th join code. Consecutive codes look unrelated.
fn room_code(n: u64) -> RoomCode {
    let radix = CODE_ALPHABET.len() as u64;
    let mut value = n.wrapping_mul(CODE_STRIDE) % radix.pow(CODE_LENGTH);
    (0..CODE_LENGTH)
        .map(|_| {
            let letter = CODE_ALPHABET[(value % radix) as usize];
            value /= radix;
            char::from(letter)
        })
        .collect()
}
