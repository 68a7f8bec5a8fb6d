//! Pointer and keyboard handling.
//!
//! Turns raw input into [`PlayerCommand`]s for the local team:
//! - left click selects, left drag box-selects, shift adds to the selection
//! - right click moves, attacks the enemy under the cursor, or attack-moves
//!   after `A`
//! - `S` stops, `Escape` leaves any mode
//! - `1`-`5` enter placement mode for a building; the next left click places it
//! - `Q`/`W`/`E` queue Marine/Warthog/Scorpion at every selected barracks
//! - `U` upgrades the base, `X` cancels selected constructions
//!
//! Selection lives in the simulation's local selection set. Nothing here
//! changes shared state directly; every order goes through the returned
//! commands.

use skirmish_core::components::EntityId;
use skirmish_core::entity::Entity;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::math::{fx, Vec2Fixed};
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::Team;
use skirmish_core::world::GameWorld;

use crate::camera::Camera;

/// Screen distance a press must travel before it becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

/// Extra world distance around an entity that still counts as a hit.
pub const CLICK_SLOP: i32 = 6;

/// Mouse buttons the game uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Select and place.
    Left,
    /// Order.
    Right,
}

/// A raw input event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The pointer moved.
    PointerMoved {
        /// Screen x.
        x: f64,
        /// Screen y.
        y: f64,
    },
    /// A button went down.
    PointerDown {
        /// Which button.
        button: MouseButton,
        /// Screen x.
        x: f64,
        /// Screen y.
        y: f64,
    },
    /// A button came up.
    PointerUp {
        /// Which button.
        button: MouseButton,
        /// Screen x.
        x: f64,
        /// Screen y.
        y: f64,
        /// Whether shift was held.
        shift: bool,
    },
    /// Wheel scrolled; positive zooms in.
    Wheel {
        /// Notches.
        notches: f64,
    },
    /// A key was pressed.
    Key(Key),
    /// Scroll the camera for `elapsed_ms` in a direction.
    Pan {
        /// Horizontal direction.
        dx: f64,
        /// Vertical direction.
        dy: f64,
        /// Duration of the scroll.
        elapsed_ms: u64,
    },
}

/// Keys with a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A letter or digit, lowercase.
    Char(char),
    /// Leave the current mode.
    Escape,
}

/// What a right or left click currently means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Right click moves or attacks.
    #[default]
    Normal,
    /// The next right click attack-moves.
    AttackMove,
    /// The next left click places a building.
    Placing(BuildingKind),
}

/// Input state for the local player.
#[derive(Debug, Clone)]
pub struct InputController {
    team: Team,
    camera: Camera,
    mode: InputMode,
    pointer: (f64, f64),
    drag_start: Option<(f64, f64)>,
    dragging: bool,
    hovered: Option<EntityId>,
}

impl InputController {
    /// Input for `team` seen through `camera`.
    #[must_use]
    pub fn new(team: Team, camera: Camera) -> Self {
        Self {
            team,
            camera,
            mode: InputMode::Normal,
            pointer: (0.0, 0.0),
            drag_start: None,
            dragging: false,
            hovered: None,
        }
    }

    /// The camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> InputMode {
        self.mode
    }

    /// Entity under the pointer.
    #[must_use]
    pub fn hovered(&self) -> Option<&EntityId> {
        self.hovered.as_ref()
    }

    /// World-space selection rectangle while dragging.
    #[must_use]
    pub fn selection_box(&self) -> Option<(Vec2Fixed, Vec2Fixed)> {
        let start = self.drag_start.filter(|_| self.dragging)?;
        Some((
            self.camera.screen_to_world(start.0, start.1),
            self.camera.screen_to_world(self.pointer.0, self.pointer.1),
        ))
    }

    /// Handle one event. Returns the commands it produced.
    pub fn handle(&mut self, event: InputEvent, world: &mut GameWorld) -> Vec<PlayerCommand> {
        match event {
            InputEvent::PointerMoved { x, y } => {
                self.pointer = (x, y);
                if let Some(start) = self.drag_start {
                    if (x - start.0).hypot(y - start.1) > DRAG_THRESHOLD_PX {
                        self.dragging = true;
                    }
                }
                let point = self.camera.screen_to_world(x, y);
                self.hovered = entity_at(world, point, |_| true).map(|e| e.id.clone());
                Vec::new()
            }
            InputEvent::PointerDown {
                button: MouseButton::Left,
                x,
                y,
            } => {
                self.pointer = (x, y);
                if let InputMode::Placing(kind) = self.mode {
                    self.mode = InputMode::Normal;
                    return vec![PlayerCommand::Build {
                        kind,
                        position: self.camera.screen_to_world(x, y),
                    }];
                }
                self.drag_start = Some((x, y));
                self.dragging = false;
                Vec::new()
            }
            InputEvent::PointerUp {
                button: MouseButton::Left,
                x,
                y,
                shift,
            } => {
                self.pointer = (x, y);
                self.release_left(world, shift);
                Vec::new()
            }
            InputEvent::PointerDown {
                button: MouseButton::Right,
                x,
                y,
            } => {
                self.pointer = (x, y);
                self.right_click(world)
            }
            InputEvent::PointerUp {
                button: MouseButton::Right,
                ..
            } => Vec::new(),
            InputEvent::Wheel { notches } => {
                self.camera.zoom_at(notches, self.pointer);
                Vec::new()
            }
            InputEvent::Pan { dx, dy, elapsed_ms } => {
                self.camera.pan(dx, dy, elapsed_ms);
                Vec::new()
            }
            InputEvent::Key(key) => self.key(key, world),
        }
    }

    fn release_left(&mut self, world: &mut GameWorld, shift: bool) {
        let Some(start) = self.drag_start.take() else {
            return;
        };
        let dragged = std::mem::take(&mut self.dragging);
        let sim = world.sim_mut();
        if !shift {
            sim.clear_selection();
        }

        if dragged {
            let a = self.camera.screen_to_world(start.0, start.1);
            let b = self.camera.screen_to_world(self.pointer.0, self.pointer.1);
            let picked: Vec<EntityId> = sim
                .get_entities_in_area(a.x, a.y, b.x - a.x, b.y - a.y)
                .into_iter()
                .filter(|e| e.team == self.team && e.is_unit() && !e.is_dead())
                .map(|e| e.id.clone())
                .collect();
            tracing::trace!(count = picked.len(), "Box selection");
            for id in &picked {
                sim.select(id);
            }
        } else {
            let point = self.camera.screen_to_world(self.pointer.0, self.pointer.1);
            let team = self.team;
            if let Some(id) = entity_at(world, point, |e| e.team == team).map(|e| e.id.clone()) {
                world.sim_mut().select(&id);
            }
        }
    }

    fn right_click(&mut self, world: &GameWorld) -> Vec<PlayerCommand> {
        if matches!(self.mode, InputMode::Placing(_)) {
            self.mode = InputMode::Normal;
            return Vec::new();
        }
        let units = self.selected_units(world);
        if units.is_empty() {
            return Vec::new();
        }

        let point = self.camera.screen_to_world(self.pointer.0, self.pointer.1);
        let team = self.team;
        if let Some(enemy) = entity_at(world, point, |e| e.team != team) {
            return vec![PlayerCommand::Attack {
                units,
                target: enemy.id.clone(),
            }];
        }
        let command = match self.mode {
            InputMode::AttackMove => PlayerCommand::AttackMove {
                units,
                destination: point,
            },
            _ => PlayerCommand::Move {
                units,
                destination: point,
            },
        };
        self.mode = InputMode::Normal;
        vec![command]
    }

    fn key(&mut self, key: Key, world: &GameWorld) -> Vec<PlayerCommand> {
        let Key::Char(c) = key else {
            self.mode = InputMode::Normal;
            return Vec::new();
        };
        match c {
            'a' => {
                if !self.selected_units(world).is_empty() {
                    self.mode = InputMode::AttackMove;
                }
                Vec::new()
            }
            's' => {
                let units = self.selected_units(world);
                if units.is_empty() {
                    Vec::new()
                } else {
                    vec![PlayerCommand::Stop { units }]
                }
            }
            '1'..='5' => {
                let index = c as usize - '1' as usize;
                if let Some(kind) = BuildingKind::PLACEABLE.get(index) {
                    self.mode = InputMode::Placing(*kind);
                }
                Vec::new()
            }
            'q' | 'w' | 'e' => {
                let unit_kind = match c {
                    'q' => UnitKind::Marine,
                    'w' => UnitKind::Warthog,
                    _ => UnitKind::Scorpion,
                };
                self.selected_entities(world)
                    .filter(|e| {
                        e.as_building().is_some_and(|b| {
                            !b.under_construction && b.can_produce.contains(&unit_kind)
                        })
                    })
                    .map(|e| PlayerCommand::Produce {
                        building: e.id.clone(),
                        unit_kind,
                    })
                    .collect()
            }
            'u' => vec![PlayerCommand::UpgradeBase],
            'x' => self
                .selected_entities(world)
                .filter(|e| e.as_building().is_some_and(|b| b.under_construction))
                .map(|e| PlayerCommand::CancelConstruction {
                    building: e.id.clone(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn selected_entities<'w>(&self, world: &'w GameWorld) -> impl Iterator<Item = &'w Entity> + 'w {
        let team = self.team;
        let sim = world.sim();
        sim.selection()
            .filter_map(move |id| sim.get_entity(id))
            .filter(move |e| e.team == team && !e.is_dead())
    }

    fn selected_units(&self, world: &GameWorld) -> Vec<EntityId> {
        self.selected_entities(world)
            .filter(|e| e.is_unit())
            .map(|e| e.id.clone())
            .collect()
    }
}

/// Closest live entity accepted by `filter` whose footprint covers `point`.
fn entity_at<'w>(
    world: &'w GameWorld,
    point: Vec2Fixed,
    filter: impl Fn(&Entity) -> bool,
) -> Option<&'w Entity> {
    world
        .sim()
        .entities()
        .iter()
        .filter(|e| !e.is_dead() && filter(e))
        .filter_map(|e| {
            let reach = e.radius() + fx(CLICK_SLOP);
            let distance = e.position.distance_squared(point);
            (distance <= reach.saturating_mul(reach)).then_some((distance, e))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, e)| e)
}
