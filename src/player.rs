//! Player state: position, facing, animation and the interaction lock.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::collision::Rect;
use crate::config::GameConfig;

/// Hitbox in unscaled sprite pixels, centred below the sprite origin.
const HITBOX_SIZE: f32 = 10.0;
const HITBOX_OFFSET_Y: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Sprite animations. Left and right share the side animations and differ
/// only by the player's mirror bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimState {
    IdleDown,
    WalkDown,
    IdleUp,
    WalkUp,
    IdleSide,
    WalkSide,
}

impl AnimState {
    pub fn walk(facing: Facing) -> Self {
        match facing {
            Facing::Up => Self::WalkUp,
            Facing::Down => Self::WalkDown,
            Facing::Left | Facing::Right => Self::WalkSide,
        }
    }

    pub fn idle(facing: Facing) -> Self {
        match facing {
            Facing::Up => Self::IdleUp,
            Facing::Down => Self::IdleDown,
            Facing::Left | Facing::Right => Self::IdleSide,
        }
    }

    /// Sprite sheet animation id.
    pub fn name(self) -> &'static str {
        match self {
            Self::IdleDown => "idle-down",
            Self::WalkDown => "walk-down",
            Self::IdleUp => "idle-up",
            Self::WalkUp => "walk-up",
            Self::IdleSide => "idle-side",
            Self::WalkSide => "walk-side",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    Dialogue,
    SceneTransition,
}

/// Shared interaction lock. Clones observe and release the same lock, so a
/// dialogue completion callback can unlock the player it was opened for.
#[derive(Debug, Clone, Default)]
pub struct InteractionLock(Rc<Cell<Option<LockReason>>>);

impl InteractionLock {
    pub fn acquire(&self, reason: LockReason) {
        self.0.set(Some(reason));
    }

    pub fn release(&self) {
        self.0.set(None);
    }

    pub fn reason(&self) -> Option<LockReason> {
        self.0.get()
    }

    pub fn is_locked(&self) -> bool {
        self.0.get().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec2,
    pub speed: f32,
    facing: Facing,
    anim: AnimState,
    flip_x: bool,
    lock: InteractionLock,
    move_target: Option<Vec2>,
    scale: f32,
}

impl Player {
    pub fn new(position: Vec2, config: &GameConfig) -> Self {
        Self {
            position,
            speed: config.player_speed,
            facing: Facing::Down,
            anim: AnimState::IdleDown,
            flip_x: false,
            lock: InteractionLock::default(),
            move_target: None,
            scale: config.scale_factor,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn anim(&self) -> AnimState {
        self.anim
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    /// True while a dialogue or a scene transition holds the lock.
    pub fn is_in_dialogue(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn lock_reason(&self) -> Option<LockReason> {
        self.lock.reason()
    }

    pub fn lock(&self, reason: LockReason) {
        self.lock.acquire(reason);
    }

    pub fn unlock(&self) {
        self.lock.release();
    }

    pub fn lock_handle(&self) -> InteractionLock {
        self.lock.clone()
    }

    /// Starts `anim` unless it is already playing.
    pub fn play(&mut self, anim: AnimState) -> bool {
        if self.anim == anim {
            return false;
        }
        self.anim = anim;
        true
    }

    /// Turns to `facing`; left mirrors the side sprite, right restores it.
    pub fn face(&mut self, facing: Facing) {
        self.facing = facing;
        match facing {
            Facing::Left => self.flip_x = true,
            Facing::Right => self.flip_x = false,
            Facing::Up | Facing::Down => {}
        }
    }

    pub fn walk(&mut self, facing: Facing) {
        self.face(facing);
        self.play(AnimState::walk(facing));
    }

    /// Plays the idle animation for the current facing.
    pub fn stop(&mut self) {
        self.play(AnimState::idle(self.facing));
    }

    pub fn move_target(&self) -> Option<Vec2> {
        self.move_target
    }

    pub fn set_move_target(&mut self, target: Vec2) {
        self.move_target = Some(target);
    }

    pub fn clear_move_target(&mut self) {
        self.move_target = None;
    }

    /// Moves toward the current target by at most `speed * dt`, snapping
    /// onto it when close enough. Returns the distance travelled.
    pub fn step_toward_target(&mut self, dt: f32) -> f32 {
        let Some(target) = self.move_target else {
            return 0.0;
        };
        let diff = target - self.position;
        let step = self.speed * dt;
        let distance = diff.length();
        if distance <= step {
            self.position = target;
            return distance;
        }
        self.position += diff / distance * step;
        step
    }

    pub fn hitbox(&self) -> Rect {
        let center = self.position + Vec2::new(0.0, HITBOX_OFFSET_Y * self.scale);
        Rect::from_center(center, Vec2::splat(HITBOX_SIZE * self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(Vec2::new(100.0, 100.0), &GameConfig::default())
    }

    #[test]
    fn play_is_idempotent() {
        let mut p = player();
        assert!(p.play(AnimState::WalkUp));
        assert!(!p.play(AnimState::WalkUp));
        assert_eq!(p.anim().name(), "walk-up");
    }

    #[test]
    fn idle_matches_facing() {
        let mut p = player();
        p.walk(Facing::Left);
        assert!(p.flip_x());
        p.stop();
        assert_eq!(p.anim(), AnimState::IdleSide);
        p.walk(Facing::Up);
        assert!(p.flip_x(), "vertical facing keeps the mirror bit");
        p.stop();
        assert_eq!(p.anim(), AnimState::IdleUp);
    }

    #[test]
    fn lock_handle_releases_owner() {
        let p = player();
        p.lock(LockReason::Dialogue);
        let handle = p.lock_handle();
        assert!(p.is_in_dialogue());
        handle.release();
        assert!(!p.is_in_dialogue());
    }

    #[test]
    fn transition_lock_counts_as_dialogue() {
        let p = player();
        p.lock(LockReason::SceneTransition);
        assert!(p.is_in_dialogue());
        assert_eq!(p.lock_reason(), Some(LockReason::SceneTransition));
    }

    #[test]
    fn steps_toward_target_and_snaps() {
        let mut p = player();
        p.set_move_target(Vec2::new(200.0, 100.0));
        let travelled = p.step_toward_target(0.2);
        assert!((travelled - 50.0).abs() < 1e-4);
        assert!((p.position.x - 150.0).abs() < 1e-4);
        p.step_toward_target(1.0);
        assert_eq!(p.position, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn hitbox_sits_below_origin() {
        let hitbox = player().hitbox();
        assert_eq!(hitbox.center(), Vec2::new(100.0, 112.0));
        assert_eq!(hitbox.size(), Vec2::splat(40.0));
    }
}
