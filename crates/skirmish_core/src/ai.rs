//! Scripted AI opponent.
//!
//! The controller only sees and acts through a [`PlayerFacade`], the same
//! surface a human player's input goes through. Each activation evaluates
//! five concerns in a fixed order:
//! - tactical refresh: prune dead units from role lists, find threats near the base
//! - economy: build missing depots, barracks, reactors and turrets up to the preset caps
//! - production: queue units at idle barracks, weighted toward the target army mix
//! - attack waves: every wave interval, send available units at the best enemy target
//! - defense: point idle defenders at the nearest threat, recall the wave on panic

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, UnitState};
use crate::entity_kind::{BuildingKind, UnitKind};
use crate::math::{fx, Vec2Fixed};
use crate::player_facade::{PlayerCommand, PlayerFacade, UnitInfo, VisibleEnemy};

/// Enemies within this distance of the base count as threats.
pub const THREAT_RADIUS: i32 = 500;

/// Target army composition, in percent.
const ARMY_MIX: [(UnitKind, u32); 3] = [
    (UnitKind::Marine, 50),
    (UnitKind::Warthog, 30),
    (UnitKind::Scorpion, 20),
];

/// AI strength preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Slow, small waves.
    Easy,
    /// The default.
    #[default]
    Normal,
    /// Faster, larger waves and turrets.
    Hard,
    /// Minimum intervals and unlimited wave size.
    Legendary,
}

/// Tunables derived from a [`Difficulty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiSettings {
    /// Time between activations.
    pub decision_interval_ms: u64,
    /// Time between attack waves; also the grace period before the first.
    pub wave_interval_ms: u64,
    /// Units needed before a wave launches.
    pub min_wave_size: usize,
    /// Largest wave. `None` sends every available unit.
    pub max_wave_size: Option<usize>,
    /// Supply depot cap.
    pub max_depots: usize,
    /// Barracks cap.
    pub max_barracks: usize,
    /// Reactor cap.
    pub max_reactors: usize,
    /// Turret cap.
    pub max_turrets: usize,
    /// Units kept home as base defenders.
    pub defenders: usize,
    /// Threat count that recalls the attack force.
    pub panic_threshold: usize,
}

impl Difficulty {
    /// All presets, weakest first.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Legendary,
    ];

    /// Settings for this preset.
    #[must_use]
    pub const fn settings(self) -> AiSettings {
        match self {
            Self::Easy => AiSettings {
                decision_interval_ms: 3_000,
                wave_interval_ms: 90_000,
                min_wave_size: 6,
                max_wave_size: Some(6),
                max_depots: 1,
                max_barracks: 1,
                max_reactors: 0,
                max_turrets: 0,
                defenders: 2,
                panic_threshold: 8,
            },
            Self::Normal => AiSettings {
                decision_interval_ms: 2_000,
                wave_interval_ms: 60_000,
                min_wave_size: 5,
                max_wave_size: Some(10),
                max_depots: 2,
                max_barracks: 1,
                max_reactors: 1,
                max_turrets: 0,
                defenders: 3,
                panic_threshold: 6,
            },
            Self::Hard => AiSettings {
                decision_interval_ms: 1_500,
                wave_interval_ms: 40_000,
                min_wave_size: 4,
                max_wave_size: Some(16),
                max_depots: 2,
                max_barracks: 2,
                max_reactors: 1,
                max_turrets: 1,
                defenders: 4,
                panic_threshold: 5,
            },
            Self::Legendary => AiSettings {
                decision_interval_ms: 1_000,
                wave_interval_ms: 25_000,
                min_wave_size: 3,
                max_wave_size: None,
                max_depots: 3,
                max_barracks: 3,
                max_reactors: 2,
                max_turrets: 2,
                defenders: 4,
                panic_threshold: 4,
            },
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            "legendary" => Ok(Self::Legendary),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Decision loop for one AI-controlled team.
#[derive(Debug, Clone)]
pub struct AiController {
    difficulty: Difficulty,
    settings: AiSettings,
    last_decision_ms: Option<u64>,
    next_wave_ms: u64,
    wave_number: u32,
    attack_force: Vec<EntityId>,
    defenders: Vec<EntityId>,
    threats: Vec<VisibleEnemy>,
}

impl AiController {
    /// Controller using `difficulty`'s preset.
    #[must_use]
    pub fn new(difficulty: Difficulty) -> Self {
        let settings = difficulty.settings();
        Self {
            difficulty,
            settings,
            last_decision_ms: None,
            next_wave_ms: settings.wave_interval_ms,
            wave_number: 0,
            attack_force: Vec::new(),
            defenders: Vec::new(),
            threats: Vec::new(),
        }
    }

    /// Override the activation interval.
    #[must_use]
    pub fn with_decision_interval(mut self, interval_ms: u64) -> Self {
        self.settings.decision_interval_ms = interval_ms;
        self
    }

    /// Active preset.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &AiSettings {
        &self.settings
    }

    /// Waves launched so far.
    #[must_use]
    pub const fn wave_number(&self) -> u32 {
        self.wave_number
    }

    /// Units currently assigned to the attack force.
    #[must_use]
    pub fn attack_force(&self) -> &[EntityId] {
        &self.attack_force
    }

    /// Units currently kept home.
    #[must_use]
    pub fn defenders(&self) -> &[EntityId] {
        &self.defenders
    }

    /// Run an activation if the decision interval has elapsed.
    ///
    /// Returns whether an activation ran.
    pub fn update<P: PlayerFacade + ?Sized>(&mut self, player: &mut P) -> bool {
        let now = player.now_ms();
        if let Some(last) = self.last_decision_ms {
            if now.saturating_sub(last) < self.settings.decision_interval_ms {
                return false;
            }
        }
        self.last_decision_ms = Some(now);
        self.decide(player);
        true
    }

    /// Evaluate every concern once, regardless of the interval.
    pub fn decide<P: PlayerFacade + ?Sized>(&mut self, player: &mut P) {
        let units = player.own_units();
        self.refresh_tactical(player, &units);
        self.run_economy(player);
        self.run_production(player, &units);
        self.run_attack_wave(player, &units);
        self.run_defense(player, &units);
    }

    fn refresh_tactical<P: PlayerFacade + ?Sized>(&mut self, player: &P, units: &[UnitInfo]) {
        let alive = |id: &EntityId| units.iter().any(|unit| &unit.id == id);
        self.attack_force.retain(|id| alive(id));
        self.defenders.retain(|id| alive(id));

        let base = player.base_position();
        let radius_sq = fx(THREAT_RADIUS) * fx(THREAT_RADIUS);
        self.threats = player
            .visible_enemies()
            .into_iter()
            .filter(|enemy| enemy.is_unit && enemy.position.distance_squared(base) <= radius_sq)
            .collect();
        if !self.threats.is_empty() {
            tracing::debug!(
                team = %player.team(),
                threats = self.threats.len(),
                "Threats near base"
            );
        }
    }

    fn run_economy<P: PlayerFacade + ?Sized>(&mut self, player: &mut P) {
        let buildings = player.own_buildings();
        if buildings.iter().any(|b| b.under_construction) {
            return;
        }
        let count = |kind: BuildingKind| buildings.iter().filter(|b| b.kind == kind).count();

        let wanted = [
            (BuildingKind::SupplyDepot, self.settings.max_depots),
            (BuildingKind::Barracks, self.settings.max_barracks),
            (BuildingKind::Reactor, self.settings.max_reactors),
            (BuildingKind::Turret, self.settings.max_turrets),
        ]
        .into_iter()
        .find(|&(kind, cap)| count(kind) < cap);
        let Some((kind, _)) = wanted else {
            return;
        };

        let resources = player.resources();
        let cost = kind.stats().cost;
        if resources.supplies < cost.supplies || resources.power < cost.power {
            return;
        }
        let Some(position) = player.free_building_spots().first().copied() else {
            return;
        };
        match player.issue(PlayerCommand::Build { kind, position }) {
            Ok(()) => tracing::info!(team = %player.team(), ?kind, "AI started construction"),
            Err(error) => {
                tracing::debug!(team = %player.team(), ?kind, %error, "AI build rejected");
            }
        }
    }

    fn run_production<P: PlayerFacade + ?Sized>(&mut self, player: &mut P, units: &[UnitInfo]) {
        let producers: Vec<EntityId> = player
            .own_buildings()
            .into_iter()
            .filter(|b| b.kind == BuildingKind::Barracks && !b.under_construction && !b.busy)
            .map(|b| b.id)
            .collect();

        let mut counts: Vec<u32> = ARMY_MIX
            .iter()
            .map(|(kind, _)| {
                u32::try_from(units.iter().filter(|u| u.kind == *kind).count()).unwrap_or(u32::MAX)
            })
            .collect();

        for building in producers {
            let power = player.resources().power;
            let unit_kind = pick_unit(&counts, power);
            match player.issue(PlayerCommand::Produce {
                building: building.clone(),
                unit_kind,
            }) {
                Ok(()) => {
                    tracing::debug!(team = %player.team(), %building, ?unit_kind, "AI queued unit");
                    if let Some(slot) = ARMY_MIX.iter().position(|(kind, _)| *kind == unit_kind) {
                        counts[slot] += 1;
                    }
                }
                Err(error) => {
                    tracing::debug!(
                        team = %player.team(),
                        %building,
                        %error,
                        "AI production rejected"
                    );
                    break;
                }
            }
        }
    }

    fn run_attack_wave<P: PlayerFacade + ?Sized>(&mut self, player: &mut P, units: &[UnitInfo]) {
        let now = player.now_ms();
        if now < self.next_wave_ms {
            return;
        }
        let mut available: Vec<EntityId> = units
            .iter()
            .filter(|u| u.state == UnitState::Idle)
            .filter(|u| !self.defenders.contains(&u.id) && !self.attack_force.contains(&u.id))
            .map(|u| u.id.clone())
            .collect();
        if available.len() < self.settings.min_wave_size {
            return;
        }
        if let Some(max) = self.settings.max_wave_size {
            available.truncate(max);
        }

        let base = player.base_position();
        let Some(target) = player.visible_enemies().into_iter().min_by_key(|enemy| {
            (
                !enemy.is_base,
                enemy.is_unit,
                enemy.position.distance_squared(base),
                enemy.id.clone(),
            )
        }) else {
            return;
        };

        let size = available.len();
        match player.issue(PlayerCommand::AttackMove {
            units: available.clone(),
            destination: target.position,
        }) {
            Ok(()) => {
                self.wave_number += 1;
                self.next_wave_ms = now + self.settings.wave_interval_ms;
                self.attack_force.extend(available);
                tracing::info!(
                    team = %player.team(),
                    wave = self.wave_number,
                    size,
                    target = %target.id,
                    "AI launched attack wave"
                );
            }
            Err(error) => tracing::debug!(team = %player.team(), %error, "AI wave rejected"),
        }
    }

    fn run_defense<P: PlayerFacade + ?Sized>(&mut self, player: &mut P, units: &[UnitInfo]) {
        for unit in units {
            if self.defenders.len() >= self.settings.defenders {
                break;
            }
            if !self.defenders.contains(&unit.id) && !self.attack_force.contains(&unit.id) {
                self.defenders.push(unit.id.clone());
            }
        }

        if self.threats.is_empty() {
            return;
        }
        let base = player.base_position();

        if self.threats.len() >= self.settings.panic_threshold && !self.attack_force.is_empty() {
            let recalled = std::mem::take(&mut self.attack_force);
            tracing::info!(
                team = %player.team(),
                threats = self.threats.len(),
                recalled = recalled.len(),
                "AI recalling attack force"
            );
            if let Err(error) = player.issue(PlayerCommand::AttackMove {
                units: recalled.clone(),
                destination: base,
            }) {
                tracing::debug!(team = %player.team(), %error, "AI recall rejected");
            }
            self.defenders.extend(recalled);
        }

        for unit in units {
            if unit.state != UnitState::Idle || !self.defenders.contains(&unit.id) {
                continue;
            }
            let Some(threat) = nearest(&self.threats, unit.position) else {
                continue;
            };
            if let Err(error) = player.issue(PlayerCommand::Attack {
                units: vec![unit.id.clone()],
                target: threat.id.clone(),
            }) {
                tracing::debug!(
                    team = %player.team(),
                    unit = %unit.id,
                    %error,
                    "AI defense order rejected"
                );
            }
        }
    }
}

fn nearest(enemies: &[VisibleEnemy], from: Vec2Fixed) -> Option<&VisibleEnemy> {
    enemies
        .iter()
        .min_by_key(|enemy| (enemy.position.distance_squared(from), enemy.id.clone()))
}

/// Unit kind furthest below its share of the army mix that `power` allows.
fn pick_unit(counts: &[u32], power: u32) -> UnitKind {
    let total: u32 = counts.iter().sum::<u32>() + 1;
    ARMY_MIX
        .iter()
        .zip(counts)
        .filter(|((kind, _), _)| kind.stats().cost.power <= power)
        .max_by_key(|((_, weight), count)| {
            let wanted = i64::from(*weight) * i64::from(total);
            let have = i64::from(**count) * 100;
            wanted - have
        })
        .map_or(UnitKind::Marine, |((kind, _), _)| *kind)
}
