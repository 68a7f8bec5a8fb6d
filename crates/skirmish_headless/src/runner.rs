//! Match runners.
//!
//! All time is simulated: runs are bounded by match time, never wall
//! clock, and the same settings always produce the same match.

use std::collections::HashSet;

use skirmish_client::divergence::compare;
use skirmish_client::session::GameSession;
use skirmish_client::transport::{link_pair, LinkProfile, LinkTransport};
use skirmish_core::ai::Difficulty;
use skirmish_core::config::GameConfig;
use skirmish_core::team::{Team, TeamMap};
use tracing::{debug, info};

use crate::error::{HeadlessError, Result};
use crate::report::{DuelReport, LinkReport, SoloReport};

/// Match time between progress log lines.
const PROGRESS_INTERVAL_MS: u64 = 60_000;

/// Settings for an AI-vs-AI match in one world.
#[derive(Debug, Clone)]
pub struct SoloSettings {
    /// Match configuration.
    pub config: GameConfig,
    /// AI playing [`Team::Player`].
    pub player: Difficulty,
    /// AI playing [`Team::Enemy`].
    pub enemy: Difficulty,
    /// Match time limit.
    pub max_ms: u64,
    /// Simulated frame length.
    pub frame_ms: u64,
}

impl Default for SoloSettings {
    fn default() -> Self {
        Self {
            config: GameConfig::default(),
            player: Difficulty::Normal,
            enemy: Difficulty::Normal,
            max_ms: 10 * 60_000,
            frame_ms: 16,
        }
    }
}

/// Settings for a match between two reconciling peers.
#[derive(Debug, Clone)]
pub struct DuelSettings {
    /// The match itself.
    pub solo: SoloSettings,
    /// Link between the peers.
    pub profile: LinkProfile,
    /// Extra time allowed for traffic to drain after the match.
    pub settle_ms: u64,
    /// Wakeup spacing while draining.
    pub wakeup_ms: u64,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            solo: SoloSettings::default(),
            profile: LinkProfile {
                latency_ms: 80,
                jitter_ms: 40,
                seed: 0,
            },
            settle_ms: 5_000,
            wakeup_ms: 50,
        }
    }
}

/// Play one AI-vs-AI match in a single world.
#[must_use]
pub fn run_solo(settings: &SoloSettings) -> SoloReport {
    let mut session = GameSession::solo(settings.config.clone(), settings.enemy)
        .with_autopilot(settings.player);
    session.start(0);
    info!(
        player = ?settings.player,
        enemy = ?settings.enemy,
        max_ms = settings.max_ms,
        "Solo match started"
    );

    let step = settings.frame_ms.max(1);
    let mut now_ms = 0;
    let mut next_progress = PROGRESS_INTERVAL_MS;
    while now_ms < settings.max_ms && !session.world().is_over() {
        now_ms = (now_ms + step).min(settings.max_ms);
        session.frame(now_ms);
        if now_ms >= next_progress {
            debug!(now_ms, entities = session.world().sim().entities().len(), "Progress");
            next_progress += PROGRESS_INTERVAL_MS;
        }
    }

    let world = session.world();
    let report = SoloReport {
        winner: world.winner(),
        duration_ms: now_ms,
        timed_out: !world.is_over(),
        stats: session.stats(),
        entities: world.sim().entities().iter().filter(|e| !e.is_dead()).count(),
        state_hash: world.sim().state_hash(),
    };
    info!(winner = ?report.winner, duration_ms = report.duration_ms, "Solo match finished");
    report
}

/// Two autopiloted peers over an in-process link.
struct DuelRun {
    sessions: TeamMap<GameSession>,
    link: LinkTransport,
    now_ms: u64,
}

impl DuelRun {
    fn new(settings: &DuelSettings) -> Self {
        let (player_end, enemy_end) = link_pair(settings.profile);
        let link = player_end.clone();
        let difficulty = TeamMap {
            player: settings.solo.player,
            enemy: settings.solo.enemy,
        };
        let mut sessions = TeamMap::from_fn(|team| {
            let end = match team {
                Team::Player => player_end.clone(),
                Team::Enemy => enemy_end.clone(),
            };
            GameSession::multiplayer(settings.solo.config.clone(), team, Box::new(end))
                .with_autopilot(difficulty[team])
        });
        for team in Team::ALL {
            sessions[team].start(0);
        }
        Self { sessions, link, now_ms: 0 }
    }

    fn both_over(&self) -> bool {
        Team::ALL.iter().all(|&team| self.sessions[team].world().is_over())
    }

    fn is_quiet(&self) -> bool {
        self.link.in_flight() == 0
            && Team::ALL
                .iter()
                .all(|&team| self.sessions[team].reconciler().map_or(true, |r| !r.has_pending()))
    }

    fn play(&mut self, max_ms: u64, frame_ms: u64) {
        let step = frame_ms.max(1);
        while self.now_ms < max_ms && !self.both_over() {
            self.now_ms = (self.now_ms + step).min(max_ms);
            for team in Team::ALL {
                self.sessions[team].frame(self.now_ms);
            }
        }
    }

    fn settle(&mut self, settle_ms: u64, wakeup_ms: u64) {
        let deadline = self.now_ms + settle_ms;
        let step = wakeup_ms.max(1);
        while self.now_ms < deadline && !self.is_quiet() {
            self.now_ms += step;
            for team in Team::ALL {
                self.sessions[team].background(self.now_ms);
            }
        }
    }

    fn report(&self, settings: &DuelSettings, timed_out: bool) -> DuelReport {
        let winners = TeamMap::from_fn(|team| self.sessions[team].world().winner());
        let (sent, delivered) = self.link.counters();
        DuelReport {
            profile: settings.profile,
            winners_agree: winners.player == winners.enemy,
            winners,
            duration_ms: self.now_ms,
            timed_out,
            divergence: compare(
                self.sessions[Team::Player].world(),
                self.sessions[Team::Enemy].world(),
            ),
            stats: TeamMap::from_fn(|team| self.sessions[team].stats()),
            net: TeamMap::from_fn(|team| self.sessions[team].net_stats()),
            reconcile: TeamMap::from_fn(|team| {
                self.sessions[team]
                    .reconciler()
                    .map(|r| r.stats())
                    .unwrap_or_default()
            }),
            link: LinkReport {
                sent,
                delivered,
                in_flight: self.link.in_flight(),
            },
        }
    }
}

/// Play one match between two reconciling peers, then let traffic drain
/// and measure how far apart they ended up.
#[must_use]
pub fn run_duel(settings: &DuelSettings) -> DuelReport {
    info!(
        latency_ms = settings.profile.latency_ms,
        jitter_ms = settings.profile.jitter_ms,
        seed = settings.profile.seed,
        "Duel started"
    );
    let mut run = DuelRun::new(settings);
    run.play(settings.solo.max_ms, settings.solo.frame_ms);
    let timed_out = !run.both_over();
    run.settle(settings.settle_ms, settings.wakeup_ms);

    let report = run.report(settings, timed_out);
    info!(
        winners_agree = report.winners_agree,
        consistent = report.divergence.is_consistent(),
        max_drift = report.divergence.max_position_drift,
        "Duel finished"
    );
    report
}

/// Play the same solo match `runs` times and check every run ends with the
/// same state hash. Returns that hash.
pub fn verify_determinism(settings: &SoloSettings, runs: u32) -> Result<u64> {
    let hashes: Vec<u64> = (0..runs.max(1)).map(|_| run_solo(settings).state_hash).collect();
    let unique: HashSet<u64> = hashes.iter().copied().collect();
    if unique.len() > 1 {
        return Err(HeadlessError::NonDeterministic {
            runs: runs.max(1),
            unique: unique.len(),
        });
    }
    Ok(hashes[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short() -> SoloSettings {
        SoloSettings {
            max_ms: 20_000,
            ..SoloSettings::default()
        }
    }

    #[test]
    fn test_solo_respects_time_limit() {
        let report = run_solo(&short());
        assert!(report.duration_ms <= 20_000);
        assert_eq!(report.timed_out, report.winner.is_none());
        assert!(report.entities > 0);
    }

    #[test]
    fn test_solo_is_deterministic() {
        let settings = SoloSettings {
            max_ms: 8_000,
            ..SoloSettings::default()
        };
        assert!(verify_determinism(&settings, 3).is_ok());
    }

    #[test]
    fn test_duel_reports_traffic() {
        let settings = DuelSettings {
            solo: short(),
            profile: LinkProfile::INSTANT,
            ..DuelSettings::default()
        };
        let report = run_duel(&settings);
        assert!(report.winners_agree);
        assert_eq!(report.link.in_flight, 0);
        for team in Team::ALL {
            assert!(report.net[team].sent > 0);
            assert_eq!(report.net[team].malformed, 0);
        }
    }
}
