//! Map data as exported by the tile editor, and the scene layouts built
//! from it.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::{Collider, ColliderSet, Rect};
use crate::config::GameConfig;

pub const BOUNDARIES_LAYER: &str = "boundaries";
pub const SPAWNPOINTS_LAYER: &str = "spawnpoints";
pub const PLAYER_SPAWN: &str = "player";
/// Reserved collider name leading from the main room to the town.
pub const EXIT_TAG: &str = "exit";
/// Reserved trigger name leading from the town back to the main room.
pub const HOME_GATE_TAG: &str = "homeGate";

const TOWN_MAP_WIDTH: f32 = 352.0;
const TOWN_MAP_HEIGHT: f32 = 288.0;

/// Structural problems that make a map unusable.
#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("map has no `spawnpoints` entry named `player`")]
    MissingPlayerSpawn,
    #[error("object #{index} in layer `{layer}` has invalid geometry")]
    InvalidObject { layer: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub layers: Vec<MapLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

/// Rectangle or point object placed in a layer, in unscaled map pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl MapObject {
    fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|value| value.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

impl MapData {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid map JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read map {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn layers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MapLayer> {
        self.layers.iter().filter(move |layer| layer.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneId {
    Main,
    Town,
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Town => f.write_str("town"),
        }
    }
}

/// What a named collider does when the player starts touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    OpenDialogue(String),
    SwitchScene(SceneId),
}

impl TriggerAction {
    /// Binds a collider tag to its action in `scene`. Reserved tags only
    /// act in the scene they belong to and are inert elsewhere.
    pub fn bind(tag: &str, scene: SceneId) -> Option<Self> {
        match (tag, scene) {
            (EXIT_TAG, SceneId::Main) => Some(Self::SwitchScene(SceneId::Town)),
            (HOME_GATE_TAG, SceneId::Town) => Some(Self::SwitchScene(SceneId::Main)),
            (EXIT_TAG | HOME_GATE_TAG, _) => None,
            ("", _) => None,
            (name, _) => Some(Self::OpenDialogue(name.to_string())),
        }
    }
}

/// Static arrangement of one scene: colliders and the player spawn point.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub id: SceneId,
    pub colliders: ColliderSet,
    pub spawn: Vec2,
    pub background: &'static str,
}

impl SceneLayout {
    /// Builds the main room from map data. Map coordinates are scaled by the
    /// configured scale factor.
    pub fn from_map(map: &MapData, config: &GameConfig) -> Result<Self, MapError> {
        let scale = config.scale_factor;
        let mut colliders = ColliderSet::new();
        for layer in map.layers_named(BOUNDARIES_LAYER) {
            for (index, object) in layer.objects.iter().enumerate() {
                if !object.is_valid() {
                    return Err(MapError::InvalidObject {
                        layer: layer.name.clone(),
                        index,
                    });
                }
                let rect = Rect::new(
                    Vec2::new(object.x, object.y) * scale,
                    Vec2::new(object.width, object.height) * scale,
                );
                let tag = Some(object.name.clone()).filter(|name| !name.is_empty());
                colliders.push(Collider::boundary(rect, tag));
            }
        }

        let spawn = map
            .layers_named(SPAWNPOINTS_LAYER)
            .flat_map(|layer| layer.objects.iter())
            .find(|object| object.name == PLAYER_SPAWN)
            .ok_or(MapError::MissingPlayerSpawn)?;
        if !spawn.x.is_finite() || !spawn.y.is_finite() {
            return Err(MapError::InvalidObject {
                layer: SPAWNPOINTS_LAYER.to_string(),
                index: 0,
            });
        }

        Ok(Self {
            id: SceneId::Main,
            colliders,
            spawn: Vec2::new(spawn.x, spawn.y) * scale,
            background: "#311047",
        })
    }

    /// The town has a fixed tile layout.
    pub fn town(config: &GameConfig) -> Self {
        let tile = config.tile_size();
        let block = |tx: f32, ty: f32, tw: f32, th: f32| {
            Collider::boundary(
                Rect::new(Vec2::new(tx, ty) * tile, Vec2::new(tw, th) * tile),
                None,
            )
        };

        let mut colliders: ColliderSet = [
            // perimeter
            block(-1.0, -1.0, 24.0, 1.0),
            block(-1.0, 18.0, 24.0, 1.0),
            block(-1.0, -1.0, 1.0, 20.0),
            block(22.0, -1.0, 1.0, 20.0),
            // buildings and props
            block(8.0, 2.0, 7.0, 4.0),
            block(16.0, 2.0, 4.0, 4.0),
            block(4.0, 2.0, 3.0, 5.0),
            block(9.0, 8.0, 3.0, 3.0),
            block(0.0, 10.0, 6.0, 3.0),
            block(1.0, 13.0, 4.0, 3.0),
            block(9.0, 10.0, 7.0, 4.0),
            block(10.0, 13.0, 5.0, 2.0),
        ]
        .into_iter()
        .collect();
        colliders.push(Collider::trigger(
            Rect::new(
                Vec2::new(11.0, 16.5) * tile,
                Vec2::new(4.0, 1.5) * tile,
            ),
            HOME_GATE_TAG,
        ));

        let width = TOWN_MAP_WIDTH * config.scale_factor;
        let height = TOWN_MAP_HEIGHT * config.scale_factor;
        Self {
            id: SceneId::Town,
            colliders,
            spawn: Vec2::new(width / 2.0, height - tile * 3.0),
            background: "#7dbb5a",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "layers": [
            { "name": "map" },
            { "name": "boundaries", "objects": [
                { "name": "", "x": 0, "y": 0, "width": 10, "height": 2 },
                { "name": "bed", "x": 4, "y": 4, "width": 3, "height": 3 },
                { "name": "exit", "x": 20, "y": 0, "width": 2, "height": 1 }
            ]},
            { "name": "spawnpoints", "objects": [
                { "name": "cat", "x": 1, "y": 1 },
                { "name": "player", "x": 5, "y": 9 }
            ]}
        ]
    }"#;

    #[test]
    fn main_layout_scales_colliders_and_spawn() {
        let map = MapData::from_json(SAMPLE).unwrap();
        let layout = SceneLayout::from_map(&map, &GameConfig::default()).unwrap();
        assert_eq!(layout.colliders.len(), 3);
        assert_eq!(layout.spawn, Vec2::new(20.0, 36.0));
        let bed = layout.colliders.get(1).unwrap();
        assert_eq!(bed.tag(), Some("bed"));
        assert_eq!(bed.rect.min, Vec2::new(16.0, 16.0));
        assert_eq!(bed.rect.size(), Vec2::new(12.0, 12.0));
        assert!(layout.colliders.get(0).unwrap().tag().is_none());
    }

    #[test]
    fn missing_spawn_is_an_error() {
        let map = MapData::from_json(r#"{ "layers": [] }"#).unwrap();
        assert_eq!(
            SceneLayout::from_map(&map, &GameConfig::default()),
            Err(MapError::MissingPlayerSpawn)
        );
    }

    #[test]
    fn negative_size_is_rejected() {
        let map = MapData::from_json(
            r#"{ "layers": [ { "name": "boundaries", "objects": [
                { "x": 0, "y": 0, "width": -1, "height": 2 } ] } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            SceneLayout::from_map(&map, &GameConfig::default()),
            Err(MapError::InvalidObject { index: 0, .. })
        ));
    }

    #[test]
    fn reserved_tags_bind_per_scene() {
        assert_eq!(
            TriggerAction::bind("exit", SceneId::Main),
            Some(TriggerAction::SwitchScene(SceneId::Town))
        );
        assert_eq!(TriggerAction::bind("exit", SceneId::Town), None);
        assert_eq!(
            TriggerAction::bind("homeGate", SceneId::Town),
            Some(TriggerAction::SwitchScene(SceneId::Main))
        );
        assert_eq!(TriggerAction::bind("homeGate", SceneId::Main), None);
        assert_eq!(
            TriggerAction::bind("resume", SceneId::Main),
            Some(TriggerAction::OpenDialogue("resume".into()))
        );
    }

    #[test]
    fn town_layout_uses_tile_grid() {
        let config = GameConfig::default();
        let town = SceneLayout::town(&config);
        assert_eq!(town.spawn, Vec2::new(704.0, 960.0));
        assert_eq!(town.colliders.len(), 13);
        assert_eq!(town.colliders.tags(), vec![HOME_GATE_TAG]);
        let gate = town.colliders.iter().find(|c| !c.solid).unwrap();
        assert_eq!(gate.rect.min, Vec2::new(704.0, 1056.0));
        assert_eq!(gate.rect.size(), Vec2::new(256.0, 96.0));
    }
}
