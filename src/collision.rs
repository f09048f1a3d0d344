//! Static rectangle colliders and contact tracking for the 2D scenes.

use std::collections::HashSet;

use glam::Vec2;

/// Penetration below this depth counts as touching, not overlapping.
const CONTACT_EPSILON: f32 = 1e-3;

/// Axis-aligned rectangle in page pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size * 0.5, size)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn translate(self, delta: Vec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Strict overlap; rectangles sharing an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x - CONTACT_EPSILON
            && self.max.x > other.min.x + CONTACT_EPSILON
            && self.min.y < other.max.y - CONTACT_EPSILON
            && self.max.y > other.min.y + CONTACT_EPSILON
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Smallest translation that moves `self` out of `other`, along one axis.
    pub fn push_out(&self, other: &Rect) -> Option<Vec2> {
        if !self.overlaps(other) {
            return None;
        }
        let left = self.max.x - other.min.x;
        let right = other.max.x - self.min.x;
        let up = self.max.y - other.min.y;
        let down = other.max.y - self.min.y;
        let push_x = if left < right { -left } else { right };
        let push_y = if up < down { -up } else { down };
        if push_x.abs() <= push_y.abs() {
            Some(Vec2::new(push_x, 0.0))
        } else {
            Some(Vec2::new(0.0, push_y))
        }
    }
}

/// Static region loaded with a scene. Solid colliders block the player;
/// non-solid ones only report contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub rect: Rect,
    pub tag: Option<String>,
    pub solid: bool,
}

impl Collider {
    pub fn boundary(rect: Rect, tag: Option<String>) -> Self {
        Self {
            rect,
            tag,
            solid: true,
        }
    }

    pub fn trigger(rect: Rect, tag: impl Into<String>) -> Self {
        Self {
            rect,
            tag: Some(tag.into()),
            solid: false,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|tag| !tag.is_empty())
    }
}

/// Result of moving a hitbox through the collider set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Correction to apply to the moved body.
    pub correction: Vec2,
    /// Indices of every collider the attempted hitbox overlapped.
    pub contacts: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColliderSet {
    colliders: Vec<Collider>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    pub fn get(&self, index: usize) -> Option<&Collider> {
        self.colliders.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Unique tags in load order.
    pub fn tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.colliders
            .iter()
            .filter_map(Collider::tag)
            .filter(|tag| seen.insert(*tag))
            .collect()
    }

    /// Records every overlap of `hitbox`, then pushes it out of the solid
    /// colliders one at a time.
    pub fn resolve(&self, hitbox: Rect) -> Resolution {
        let contacts = self
            .colliders
            .iter()
            .enumerate()
            .filter(|(_, collider)| hitbox.overlaps(&collider.rect))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let mut moved = hitbox;
        for &index in &contacts {
            let collider = &self.colliders[index];
            if !collider.solid {
                continue;
            }
            if let Some(push) = moved.push_out(&collider.rect) {
                moved = moved.translate(push);
            }
        }

        Resolution {
            correction: moved.min - hitbox.min,
            contacts,
        }
    }
}

impl FromIterator<Collider> for ColliderSet {
    fn from_iter<I: IntoIterator<Item = Collider>>(iter: I) -> Self {
        Self {
            colliders: iter.into_iter().collect(),
        }
    }
}

/// Turns per-frame overlap lists into contact-begin events.
#[derive(Debug, Clone, Default)]
pub struct ContactTracker {
    touching: HashSet<usize>,
}

impl ContactTracker {
    /// Replaces the touching set and returns the indices that were not
    /// touching last frame, in `contacts` order.
    pub fn update(&mut self, contacts: &[usize]) -> Vec<usize> {
        let began = contacts
            .iter()
            .copied()
            .filter(|index| !self.touching.contains(index))
            .collect();
        self.touching = contacts.iter().copied().collect();
        began
    }
}
