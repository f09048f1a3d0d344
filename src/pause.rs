//! Scene-scoped subscription registry and the pause switch that gates it.

use log::{info, trace};

use crate::player::Player;

/// Input or update handler a scene installs on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    PointerDown,
    PointerRelease,
    KeyRelease,
    KeyDown,
    Resize,
    CameraFollow,
    Collide(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

#[derive(Debug, Clone)]
struct Entry {
    kind: Subscription,
    paused: bool,
}

/// Subscriptions owned by the active scene. Pausing only gates them;
/// they stay registered until the scene is torn down.
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    entries: Vec<Entry>,
    paused: bool,
}

impl SceneContext {
    /// New context whose subscriptions start with the given pause state.
    pub fn new(paused: bool) -> Self {
        Self {
            entries: Vec::new(),
            paused,
        }
    }

    pub fn register(&mut self, kind: Subscription) -> SubscriptionId {
        self.entries.push(Entry {
            kind,
            paused: self.paused,
        });
        SubscriptionId(self.entries.len() - 1)
    }

    /// Whether the handler behind `id` should run. Unknown ids never run.
    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.entries.get(id.0).map_or(false, |entry| !entry.paused)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        for entry in &mut self.entries {
            entry.paused = paused;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every subscription; returns how many were removed.
    pub fn teardown(&mut self) -> usize {
        let removed = self.entries.len();
        for entry in self.entries.drain(..) {
            trace!("dropping {:?} subscription", entry.kind);
        }
        removed
    }
}

/// Pause switch exposed to the host page and the CRT buttons.
pub trait PauseControl {
    fn set_paused(&mut self, paused: bool);

    fn is_paused(&self) -> bool;

    fn toggle_pause(&mut self) {
        let next = !self.is_paused();
        self.set_paused(next);
    }
}

/// Process-wide pause state, applied to whichever scene is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseCoordinator {
    paused: bool,
}

impl PauseCoordinator {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Reapplies `paused` to every subscription and, when pausing, drops
    /// the player's in-flight movement target.
    pub fn apply(&mut self, paused: bool, context: &mut SceneContext, player: Option<&mut Player>) {
        if self.paused != paused {
            info!("game {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
        context.set_paused(paused);
        if paused {
            if let Some(player) = player {
                player.clear_move_target();
            }
        }
    }
}
