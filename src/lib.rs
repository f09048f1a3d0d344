//! Core of the CRT portfolio: a top-down exploration game and the 3D
//! television frame that hosts it.
//!
//! The crate keeps rendering and platform integration at the edges. The
//! game, the dialogue presenter and the hotspot projector all run headless,
//! which is how the harness binary and the tests drive them; the `web`
//! module binds them to a browser page on wasm targets.

pub mod app;
pub mod camera;
pub mod collision;
pub mod config;
pub mod controller;
pub mod dialogue;
pub mod input;
pub mod map;
pub mod pause;
pub mod player;
pub mod projector;
pub mod stage;
#[cfg(target_arch = "wasm32")]
pub mod web;
pub mod world;

pub use app::{Portfolio, WindowViewport};
pub use camera::FollowCamera;
pub use collision::{Collider, ColliderSet, ContactTracker, Rect};
pub use config::GameConfig;
pub use controller::MotionController;
pub use dialogue::{BufferSurface, DialoguePresenter, DialogueTable, DismissChannel, TextSurface};
pub use input::{Direction, InputEvent, InputState, KeyCode, MouseButton, NamedKey};
pub use map::{MapData, MapError, SceneId, SceneLayout, TriggerAction};
pub use pause::{PauseControl, PauseCoordinator, SceneContext};
pub use player::{AnimState, Facing, LockReason, Player};
pub use projector::{project_bounds, CornerSet, LocalBounds, PageRect, Ray, ScreenBounds};
pub use stage::{CrtStage, HotspotId, HotspotState, Stage, StageAction, StageOutcome};
pub use world::{Game, GameEvent};
