//! Turns polled input into player motion and animation, and collider
//! contacts into trigger actions.

use glam::Vec2;
use log::debug;

use crate::config::GameConfig;
use crate::input::{Direction, HeldDirections};
use crate::map::{SceneId, TriggerAction};
use crate::player::{Facing, LockReason, Player};

impl From<Direction> for Facing {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Right => Facing::Right,
            Direction::Left => Facing::Left,
            Direction::Up => Facing::Up,
            Direction::Down => Facing::Down,
        }
    }
}

/// Degrees from `from` toward `to`, measured so that a target straight
/// above on the page reads 90 and one straight to the right reads 180.
pub fn pointer_angle(from: Vec2, to: Vec2) -> f32 {
    (from.y - to.y).atan2(from.x - to.x).to_degrees()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionController {
    lower_bound: f32,
    upper_bound: f32,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

impl MotionController {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            lower_bound: config.angle_lower_bound,
            upper_bound: config.angle_upper_bound,
        }
    }

    /// Facing for a pointer angle. Both thresholds are exclusive, so angles
    /// landing exactly on them select nothing.
    pub fn classify_angle(&self, angle: f32) -> Option<Facing> {
        let (lower, upper) = (self.lower_bound, self.upper_bound);
        if angle > lower && angle < upper {
            Some(Facing::Up)
        } else if angle < -lower && angle > -upper {
            Some(Facing::Down)
        } else if angle.abs() > upper {
            Some(Facing::Right)
        } else if angle.abs() < lower {
            Some(Facing::Left)
        } else {
            None
        }
    }

    /// Per-frame handler while any key is held. Returns whether the player
    /// moved.
    pub fn on_keys_held(&self, player: &mut Player, held: HeldDirections, dt: f32) -> bool {
        if held.len() > 1 || player.is_in_dialogue() {
            return false;
        }
        let Some(direction) = held.single() else {
            return false;
        };
        player.walk(direction.into());
        player.position += direction.unit() * player.speed * dt;
        true
    }

    /// Per-frame handler while the left pointer button is held. `target`
    /// is the pointer in world space.
    pub fn on_pointer_held(&self, player: &mut Player, target: Vec2, dt: f32) -> bool {
        if player.is_in_dialogue() {
            return false;
        }
        let angle = pointer_angle(player.position, target);
        player.set_move_target(target);
        player.step_toward_target(dt);

        if let Some(facing) = self.classify_angle(angle) {
            player.walk(facing);
        }
        true
    }

    /// Key or pointer release: settle into the idle pose for the facing.
    pub fn on_release(&self, player: &mut Player) {
        player.clear_move_target();
        player.stop();
    }

    /// Contact-begin with a tagged collider. Ignored while the player is
    /// locked. Scene switches take the lock here; dialogue locking is left
    /// to whoever opens the session.
    pub fn on_collide(&self, player: &Player, tag: &str, scene: SceneId) -> Option<TriggerAction> {
        if player.is_in_dialogue() {
            debug!("ignoring contact with `{tag}` while locked");
            return None;
        }
        let action = TriggerAction::bind(tag, scene)?;
        if let TriggerAction::SwitchScene(_) = action {
            player.lock(LockReason::SceneTransition);
        }
        Some(action)
    }
}
