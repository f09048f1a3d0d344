use std::collections::HashSet;
use std::fmt;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }

    /// Movement direction bound to this key (arrows and WASD).
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Named(NamedKey::Right) | Self::Character('D') => Some(Direction::Right),
            Self::Named(NamedKey::Left) | Self::Character('A') => Some(Direction::Left),
            Self::Named(NamedKey::Up) | Self::Character('W') => Some(Direction::Up),
            Self::Named(NamedKey::Down) | Self::Character('S') => Some(Direction::Down),
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" | " " => Space,
        "Enter" | "Return" => Enter,
        "Escape" | "Esc" => Escape,
        "Left" | "ArrowLeft" => Left,
        "Right" | "ArrowRight" => Right,
        "Up" | "ArrowUp" => Up,
        "Down" | "ArrowDown" => Down,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Keys the portfolio reacts to by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Escape,
    Left,
    Right,
    Up,
    Down,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// One of the four movement directions, in polling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Up,
        Direction::Down,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "right" => Some(Self::Right),
            "left" => Some(Self::Left),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    /// The arrow key bound to this direction.
    pub fn arrow_key(self) -> KeyCode {
        KeyCode::Named(match self {
            Self::Right => NamedKey::Right,
            Self::Left => NamedKey::Left,
            Self::Up => NamedKey::Up,
            Self::Down => NamedKey::Down,
        })
    }

    /// Unit step in page coordinates (y grows downward).
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Right => Vec2::X,
            Self::Left => Vec2::NEG_X,
            Self::Up => Vec2::NEG_Y,
            Self::Down => Vec2::Y,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Right => 1,
            Self::Left => 2,
            Self::Up => 4,
            Self::Down => 8,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Right => "right",
            Self::Left => "left",
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Set of directions held during a tick. Arrow and WASD keys for the same
/// direction count once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldDirections(u8);

impl HeldDirections {
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The held direction when exactly one is held.
    pub fn single(self) -> Option<Direction> {
        if self.len() != 1 {
            return None;
        }
        Direction::ALL.into_iter().find(|dir| self.contains(*dir))
    }
}

impl FromIterator<Direction> for HeldDirections {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut held = Self::default();
        for direction in iter {
            held.insert(direction);
        }
        held
    }
}

/// Discrete input event delivered to the game between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    MouseMove(Vec2),
    /// Document-level click at a page position.
    Click(Vec2),
    Resize { width: u32, height: u32 },
    /// Scroll over the stage; positive moves the camera away.
    Wheel(f32),
}

impl InputEvent {
    /// Events for a pointer button changing state at `position`. A release
    /// is also a click there.
    pub fn pointer_button(button: MouseButton, pressed: bool, position: Vec2) -> Vec<InputEvent> {
        if pressed {
            vec![InputEvent::MouseDown(button)]
        } else {
            vec![InputEvent::MouseUp(button), InputEvent::Click(position)]
        }
    }
}

/// Input snapshot polled once per frame, shared with the window callbacks.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    mouse_position: RwLock<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a discrete event into the held-state snapshot.
    pub fn apply(&self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown(key) => self.set_key_down(key),
            InputEvent::KeyUp(key) => self.set_key_up(key),
            InputEvent::MouseDown(button) => self.set_mouse_button_down(button),
            InputEvent::MouseUp(button) => self.set_mouse_button_up(button),
            InputEvent::MouseMove(position) => self.set_mouse_position(position),
            InputEvent::Click(_) | InputEvent::Resize { .. } | InputEvent::Wheel(_) => {}
        }
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    pub fn set_mouse_position(&self, position: Vec2) {
        *self.mouse_position.write() = position;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn any_key_down(&self) -> bool {
        !self.keys.read().is_empty()
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        *self.mouse_position.read()
    }

    pub fn held_directions(&self) -> HeldDirections {
        self.keys
            .read()
            .iter()
            .filter_map(|key| key.direction())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("ArrowUp"),
            Some(KeyCode::Named(NamedKey::Up))
        );
        assert_eq!(KeyCode::from_name("w"), Some(KeyCode::Character('W')));
        assert_eq!(KeyCode::from_name("Enter"), Some(KeyCode::Named(NamedKey::Enter)));
        assert_eq!(KeyCode::from_name("Shift"), None);
    }

    #[test]
    fn arrow_and_wasd_share_a_direction() {
        let state = InputState::new();
        state.set_key_down(KeyCode::Named(NamedKey::Left));
        state.set_key_down(KeyCode::Character('A'));
        let held = state.held_directions();
        assert_eq!(held.len(), 1);
        assert_eq!(held.single(), Some(Direction::Left));
    }

    #[test]
    fn arrow_keys_round_trip_through_direction() {
        for direction in Direction::ALL {
            assert_eq!(direction.arrow_key().direction(), Some(direction));
            assert_eq!(Direction::from_name(&direction.to_string()), Some(direction));
        }
    }

    #[test]
    fn two_directions_have_no_single_direction() {
        let held: HeldDirections = [Direction::Up, Direction::Right].into_iter().collect();
        assert_eq!(held.len(), 2);
        assert_eq!(held.single(), None);
    }

    #[test]
    fn events_update_snapshot() {
        let state = InputState::new();
        state.apply(&InputEvent::MouseDown(MouseButton::LEFT));
        state.apply(&InputEvent::MouseMove(Vec2::new(4.0, 2.0)));
        assert!(state.is_mouse_button_down(MouseButton::LEFT));
        assert_eq!(state.mouse_position(), Vec2::new(4.0, 2.0));
        state.apply(&InputEvent::MouseUp(MouseButton::LEFT));
        assert!(!state.is_mouse_button_down(MouseButton::LEFT));
        assert!(!state.any_key_down());
    }
}
