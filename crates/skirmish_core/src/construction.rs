//! Per-team construction queue with a single active slot.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// Outcome of submitting a building to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The slot was free; construction starts now.
    Started,
    /// Another building is under construction; this one waits.
    Queued,
}

/// Buildings waiting for the team's one construction slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionQueue {
    active: Option<EntityId>,
    waiting: VecDeque<EntityId>,
}

impl ConstructionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a placed building.
    pub fn submit(&mut self, building: EntityId) -> Submission {
        if self.active.is_none() {
            self.active = Some(building);
            Submission::Started
        } else {
            self.waiting.push_back(building);
            Submission::Queued
        }
    }

    /// The building holding the slot.
    #[must_use]
    pub fn active(&self) -> Option<&EntityId> {
        self.active.as_ref()
    }

    /// Buildings waiting behind the active one, oldest first.
    pub fn waiting(&self) -> impl Iterator<Item = &EntityId> {
        self.waiting.iter()
    }

    /// Whether `building` is active or waiting.
    #[must_use]
    pub fn contains(&self, building: &EntityId) -> bool {
        self.active.as_ref() == Some(building) || self.waiting.contains(building)
    }

    /// Number of buildings in the queue, including the active one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiting.len() + usize::from(self.active.is_some())
    }

    /// Whether nothing is queued or building.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.waiting.is_empty()
    }

    /// Take `building` out of the queue because it finished, died or was
    /// cancelled.
    ///
    /// Returns the next building to start when the slot was freed.
    pub fn release(&mut self, building: &EntityId) -> Option<EntityId> {
        if self.active.as_ref() == Some(building) {
            self.active = self.waiting.pop_front();
            return self.active.clone();
        }
        self.waiting.retain(|id| id != building);
        None
    }
}
