//! The 3D CRT stage around the game canvas.
//!
//! A [`Stage`] is a camera plus a list of objects, some of which carry an
//! action. [`CrtStage`] keeps one page-space hotspot per action in sync with
//! the projection of its object and resolves pointer picks and hotspot
//! activations against the pause switch.

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};
use roxmltree::{Document, Node};

use crate::pause::PauseControl;
use crate::projector::{project_bounds, CornerSet, LocalBounds, PageRect, Ray, ScreenBounds};

/// Name of the model the fallback screen panel is fitted to.
pub const TELEVISION: &str = "television";

const MIN_ORBIT_DISTANCE: f32 = 2.5;
const MAX_ORBIT_DISTANCE: f32 = 9.0;

/// Fraction of the model bounds a synthesized screen panel covers.
const FALLBACK_SCREEN_SCALE: Vec3 = Vec3::new(0.56, 0.42, 0.0);
const FALLBACK_SCREEN_Y_OFFSET: f32 = 0.04;
const FALLBACK_SCREEN_Z_OFFSET: f32 = 0.02;

/// What an interactive stage object does when picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    Toggle,
    Switch,
    /// The CRT screen surface; acts as a toggle.
    Screen,
}

impl StageAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "toggle" => Some(Self::Toggle),
            "switch" => Some(Self::Switch),
            "screen" => Some(Self::Screen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageObject {
    pub name: String,
    pub action: Option<StageAction>,
    pub position: Vec3,
    /// Euler angles in degrees, applied Z then Y then X.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub bounds: LocalBounds,
}

impl StageObject {
    /// Flat, camera-facing panel of the given size.
    pub fn panel(name: impl Into<String>, action: Option<StageAction>, size: Vec2) -> Self {
        Self {
            name: name.into(),
            action,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            bounds: LocalBounds::from_size(size.extend(0.0)),
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn world_matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians());
        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale)
    }

    /// Axis-aligned world bounds of the transformed object.
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let world = self.world_matrix();
        self.bounds.corners().iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), corner| {
                let point = world.transform_point3(*corner);
                (min.min(point), max.max(point))
            },
        )
    }

    /// Screen panel synthesized on the camera-facing side of a model whose
    /// world bounds are `model_min..model_max` and which is turned `yaw`
    /// degrees about Y. Used when the model carries no screen mesh.
    pub fn fallback_screen(model_min: Vec3, model_max: Vec3, yaw: f32, eye: Vec3) -> Self {
        let size = model_max - model_min;
        let center = (model_min + model_max) * 0.5;
        let mut forward = Mat4::from_rotation_y(yaw.to_radians()).transform_vector3(Vec3::Z);
        if forward.dot(eye - center) < 0.0 {
            forward = -forward;
        }
        let offset = forward * (size.z * 0.5 + FALLBACK_SCREEN_Z_OFFSET);
        let panel = Vec2::new(
            size.x * FALLBACK_SCREEN_SCALE.x,
            size.y * FALLBACK_SCREEN_SCALE.y,
        );
        let mut screen = Self::panel("screen", Some(StageAction::Screen), panel).at(Vec3::new(
            center.x + offset.x,
            center.y + size.y * FALLBACK_SCREEN_Y_OFFSET,
            center.z + offset.z,
        ));
        screen.rotation = Vec3::new(0.0, yaw, 0.0);
        screen
    }
}

/// Perspective camera looking at a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageCamera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for StageCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.6, 6.5),
            target: Vec3::new(0.0, 1.1, 0.0),
            fov: 38.0,
            near: 0.1,
            far: 100.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl StageCamera {
    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, Vec3::Y);
        let projection =
            Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect.max(0.01), self.near, self.far);
        projection * view
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Moves the eye along its line of sight, keeping the orbit distance
    /// inside the allowed range.
    pub fn dolly(&mut self, delta: f32) {
        let offset = self.eye - self.target;
        let Some(direction) = offset.try_normalize() else {
            return;
        };
        let distance = (offset.length() + delta).clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
        self.eye = self.target + direction * distance;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub camera: StageCamera,
    pub objects: Vec<StageObject>,
    /// Corners projected when placing hotspots.
    pub corners: CornerSet,
}

impl Stage {
    /// The CRT set: camera, television, play/pause and switch buttons,
    /// and the screen panel fitted to the television.
    pub fn crt_default() -> Self {
        let button = Vec2::new(0.9, 0.35);
        let television = StageObject {
            name: TELEVISION.to_string(),
            action: None,
            position: Vec3::ZERO,
            rotation: Vec3::new(0.0, 180.0, 0.0),
            scale: Vec3::ONE,
            bounds: LocalBounds::new(Vec3::new(-1.0, 0.45, -0.8), Vec3::new(1.0, 2.05, 0.8)),
        };
        let mut stage = Self {
            camera: StageCamera::default(),
            objects: vec![
                television,
                StageObject::panel("playButton", Some(StageAction::Toggle), button)
                    .at(Vec3::new(-1.6, 0.9, 1.15)),
                StageObject::panel("switchButton", Some(StageAction::Switch), button)
                    .at(Vec3::new(1.6, 0.9, 1.15)),
            ],
            corners: CornerSet::default(),
        };
        stage.ensure_screen();
        stage
    }

    /// Parses a stage description:
    /// `<stage><camera>..</camera><object>..</object>..</stage>`. The root
    /// may set `corners="all"` to project every box corner.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid stage XML")?;
        let root = document.root_element();
        if !root.has_tag_name("stage") {
            bail!("expected <stage> root, found <{}>", root.tag_name().name());
        }
        let corners = match root.attribute("corners") {
            None | Some("front") => CornerSet::FrontFace,
            Some("all") => CornerSet::All,
            Some(other) => bail!("unknown corner set `{other}`"),
        };

        let mut camera = StageCamera::default();
        if let Some(node) = root.children().find(|n| n.has_tag_name("camera")) {
            camera.eye = parse_vec3(optional_text(&node, "position"), camera.eye)?;
            camera.target = parse_vec3(optional_text(&node, "target"), camera.target)?;
            camera.fov = parse_f32(optional_text(&node, "fov"), camera.fov)?;
            camera.near = parse_f32(optional_text(&node, "near"), camera.near)?;
            camera.far = parse_f32(optional_text(&node, "far"), camera.far)?;
        }

        let mut objects = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let action = match optional_text(&node, "action") {
                Some(action) => Some(
                    StageAction::from_name(&action)
                        .ok_or_else(|| anyhow!("object `{name}` has unknown action `{action}`"))?,
                ),
                None => None,
            };
            let size = parse_vec3(optional_text(&node, "size"), Vec3::new(1.0, 1.0, 0.0))
                .with_context(|| format!("bad <size> on `{name}`"))?;
            objects.push(StageObject {
                action,
                position: parse_vec3(optional_text(&node, "position"), Vec3::ZERO)?,
                rotation: parse_vec3(optional_text(&node, "rotation"), Vec3::ZERO)?,
                scale: parse_vec3(optional_text(&node, "scale"), Vec3::ONE)?,
                bounds: LocalBounds::from_size(size),
                name,
            });
        }

        debug!("parsed stage with {} objects", objects.len());
        let mut stage = Self {
            camera,
            objects,
            corners,
        };
        if stage.ensure_screen() {
            debug!("fitted screen panel to `{TELEVISION}`");
        }
        Ok(stage)
    }

    pub fn object(&self, name: &str) -> Option<&StageObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    /// First object carrying `action`.
    pub fn object_for(&self, action: StageAction) -> Option<&StageObject> {
        self.objects.iter().find(|object| object.action == Some(action))
    }

    /// Fits a screen panel to the television when no object carries the
    /// screen action. Returns whether one was added.
    pub fn ensure_screen(&mut self) -> bool {
        if self.object_for(StageAction::Screen).is_some() {
            return false;
        }
        let Some(television) = self.object(TELEVISION) else {
            return false;
        };
        let (min, max) = television.world_bounds();
        let screen = StageObject::fallback_screen(min, max, television.rotation.y, self.camera.eye);
        self.attach_screen(screen);
        true
    }

    /// Adds the screen panel, replacing any previous one.
    pub fn attach_screen(&mut self, screen: StageObject) {
        self.objects
            .retain(|object| object.action != Some(StageAction::Screen));
        self.objects.push(screen);
    }
}

/// Page overlays backing the stage buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotspotId {
    PlayPause,
    Switch,
    Screen,
}

impl HotspotId {
    pub const ALL: [HotspotId; 3] = [HotspotId::PlayPause, HotspotId::Switch, HotspotId::Screen];

    pub fn action(self) -> StageAction {
        match self {
            HotspotId::PlayPause => StageAction::Toggle,
            HotspotId::Switch => StageAction::Switch,
            HotspotId::Screen => StageAction::Screen,
        }
    }

    pub fn aria_label(self) -> &'static str {
        match self {
            HotspotId::PlayPause => "Play/Pause",
            HotspotId::Switch => "Switch Game",
            HotspotId::Screen => "Toggle Play",
        }
    }

    fn index(self) -> usize {
        match self {
            HotspotId::PlayPause => 0,
            HotspotId::Switch => 1,
            HotspotId::Screen => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum HotspotState {
    #[default]
    Hidden,
    Visible(ScreenBounds),
}

impl HotspotState {
    pub fn bounds(&self) -> Option<ScreenBounds> {
        match self {
            HotspotState::Hidden => None,
            HotspotState::Visible(bounds) => Some(*bounds),
        }
    }
}

/// Result of activating a stage action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Toggled { paused: bool },
    /// Forwarded to the host; the stage does not switch games itself.
    SwitchRequested,
}

pub struct CrtStage {
    stage: Stage,
    hotspots: [HotspotState; 3],
    showing_paused: bool,
}

impl CrtStage {
    pub fn new(stage: Stage, paused: bool) -> Self {
        Self {
            stage,
            hotspots: [HotspotState::Hidden; 3],
            showing_paused: paused,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.stage.camera.resize(width, height);
    }

    /// Wheel zoom on the stage camera.
    pub fn dolly(&mut self, delta: f32) {
        self.stage.camera.dolly(delta);
    }

    /// Recomputes every hotspot rectangle from the current camera. Missing
    /// objects and unplaceable projections hide their hotspot.
    pub fn sync_overlay(&mut self, page: &PageRect) -> &[HotspotState; 3] {
        let view_proj = self.stage.camera.view_proj();
        for id in HotspotId::ALL {
            let projected = self.stage.object_for(id.action()).and_then(|object| {
                project_bounds(
                    &object.bounds,
                    &object.world_matrix(),
                    &view_proj,
                    page,
                    self.stage.corners,
                )
            });
            self.hotspots[id.index()] = projected.map_or(HotspotState::Hidden, HotspotState::Visible);
        }
        &self.hotspots
    }

    pub fn hotspot(&self, id: HotspotId) -> HotspotState {
        self.hotspots[id.index()]
    }

    pub fn hotspots(&self) -> impl Iterator<Item = (HotspotId, HotspotState)> + '_ {
        HotspotId::ALL
            .into_iter()
            .map(|id| (id, self.hotspots[id.index()]))
    }

    /// Visible hotspot under a page point, as of the last sync.
    pub fn hotspot_at(&self, point: Vec2) -> Option<HotspotId> {
        self.hotspots()
            .find(|(_, state)| state.bounds().map_or(false, |b| b.contains(point)))
            .map(|(id, _)| id)
    }

    /// Action of the nearest interactive object under the pointer. Objects
    /// without an action never block the ones behind them.
    pub fn pick(&self, pointer: Vec2, page: &PageRect) -> Option<StageAction> {
        if page.is_degenerate() {
            return None;
        }
        let ray = Ray::from_ndc(page.to_ndc(pointer), &self.stage.camera.view_proj())?;
        self.stage
            .objects
            .iter()
            .filter_map(|object| {
                let action = object.action?;
                let distance = ray.intersect_bounds(&object.bounds, &object.world_matrix())?;
                Some((distance, action))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, action)| action)
    }

    pub fn activate(&mut self, action: StageAction, pause: &mut impl PauseControl) -> StageOutcome {
        match action {
            StageAction::Toggle | StageAction::Screen => {
                pause.toggle_pause();
                let paused = pause.is_paused();
                self.showing_paused = paused;
                StageOutcome::Toggled { paused }
            }
            StageAction::Switch => {
                info!("switch game requested");
                StageOutcome::SwitchRequested
            }
        }
    }

    pub fn activate_hotspot(&mut self, id: HotspotId, pause: &mut impl PauseControl) -> StageOutcome {
        self.activate(id.action(), pause)
    }

    /// Label painted on the play/pause button.
    pub fn play_label(&self) -> &'static str {
        if self.showing_paused {
            "PLAY"
        } else {
            "PAUSE"
        }
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| component.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("failed to parse vector `{value}`: {err}"))?;
    match components[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(anyhow!("vector `{value}` needs exactly three components")),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}
