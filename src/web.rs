#![cfg(target_arch = "wasm32")]

//! Browser bindings: a DOM-backed dialogue box and the hotspot overlay.
//! The host page owns the event listeners and forwards them here.

use glam::Vec2;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element, HtmlElement};

use crate::app::Portfolio;
use crate::config::GameConfig;
use crate::dialogue::{DialogueTable, TextSurface};
use crate::input::{InputEvent, InputState, KeyCode, MouseButton};
use crate::map::{MapData, SceneLayout};
use crate::pause::PauseControl;
use crate::projector::PageRect;
use crate::stage::{CrtStage, HotspotId, HotspotState, Stage, StageOutcome};
use crate::world::{Game, GameEvent};

/// Stage camera travel per scrolled pixel.
const WHEEL_PIXEL_STEP: f32 = 0.01;

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn document() -> Result<Document, JsValue> {
    window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("document not available"))
}

fn element_by_id(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("#{id} not found")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not an HTML element")))
}

/// Dialogue box made of a container toggled visible, an element receiving
/// the markup, and the textbox used for outside-click checks.
pub struct DomTextSurface {
    container: HtmlElement,
    dialogue: HtmlElement,
    textbox: HtmlElement,
    buffer: String,
}

impl DomTextSurface {
    pub fn from_document(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            container: element_by_id(document, "textbox-container")?,
            dialogue: element_by_id(document, "dialogue")?,
            textbox: element_by_id(document, "textbox")?,
            buffer: String::new(),
        })
    }

    fn set_visible(&self, visible: bool) {
        let display = if visible { "block" } else { "none" };
        if let Err(err) = self.container.style().set_property("display", display) {
            warn!("unable to set dialogue display to {display}: {err:?}");
        }
    }
}

impl TextSurface for DomTextSurface {
    fn show(&mut self, text: &str) {
        self.buffer.clear();
        self.buffer.push_str(text);
        self.dialogue.set_inner_html(&self.buffer);
        self.set_visible(true);
    }

    fn append_glyph(&mut self, glyph: char) {
        self.buffer.push(glyph);
        self.dialogue.set_inner_html(&self.buffer);
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.dialogue.set_inner_html("");
        self.set_visible(false);
    }

    fn contains(&self, point: Vec2) -> bool {
        let rect = self.textbox.get_bounding_client_rect();
        let (x, y) = (point.x as f64, point.y as f64);
        x >= rect.left() && x <= rect.right() && y >= rect.top() && y <= rect.bottom()
    }
}

/// Positions `element` over `state`, or hides it.
pub fn apply_hotspot(element: &HtmlElement, state: HotspotState) -> Result<(), JsValue> {
    let style = element.style();
    match state {
        HotspotState::Hidden => style.set_property("display", "none"),
        HotspotState::Visible(bounds) => {
            style.set_property("display", "block")?;
            style.set_property("left", &format!("{}px", bounds.min_x))?;
            style.set_property("top", &format!("{}px", bounds.min_y))?;
            style.set_property("width", &format!("{}px", bounds.width()))?;
            style.set_property("height", &format!("{}px", bounds.height()))
        }
    }
}

fn create_overlay(document: &Document) -> Result<Vec<(HotspotId, HtmlElement)>, JsValue> {
    let overlay: HtmlElement = document.create_element("div")?.dyn_into()?;
    overlay.set_id("crt-ui-overlay");
    let style = overlay.style();
    style.set_property("position", "fixed")?;
    style.set_property("inset", "0")?;
    style.set_property("pointer-events", "none")?;
    style.set_property("z-index", "10")?;

    let mut hotspots = Vec::with_capacity(HotspotId::ALL.len());
    for id in HotspotId::ALL {
        let button: Element = document.create_element("button")?;
        button.set_attribute("type", "button")?;
        button.set_attribute("aria-label", id.aria_label())?;
        button.set_attribute("data-hotspot", &format!("{id:?}"))?;
        let button: HtmlElement = button.dyn_into()?;
        let style = button.style();
        style.set_property("position", "absolute")?;
        style.set_property("pointer-events", "auto")?;
        style.set_property("opacity", "0")?;
        style.set_property("display", "none")?;
        overlay.append_child(&button)?;
        hotspots.push((id, button));
    }

    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&overlay)?;
    Ok(hotspots)
}

fn hotspot_from_index(index: u32) -> Option<HotspotId> {
    HotspotId::ALL.get(index as usize).copied()
}

#[wasm_bindgen]
pub struct WebPortfolio {
    app: Portfolio<DomTextSurface>,
    input: InputState,
    pending: Vec<InputEvent>,
    hotspots: Vec<(HotspotId, HtmlElement)>,
}

impl WebPortfolio {
    fn push(&mut self, event: InputEvent) {
        self.input.apply(&event);
        self.pending.push(event);
    }
}

#[wasm_bindgen]
impl WebPortfolio {
    /// Builds the game from the map and dialogue JSON the page fetched.
    #[wasm_bindgen(constructor)]
    pub fn new(map_json: &str, dialogue_json: &str) -> Result<WebPortfolio, JsValue> {
        let config = GameConfig::default();
        let map = MapData::from_json(map_json).map_err(js_error)?;
        let layout = SceneLayout::from_map(&map, &config).map_err(js_error)?;
        let table = DialogueTable::from_json(dialogue_json).map_err(js_error)?;

        let document = document()?;
        let surface = DomTextSurface::from_document(&document)?;
        let hotspots = create_overlay(&document)?;
        info!("loaded map with {} colliders", layout.colliders.len());

        let game = Game::new(config, layout, table, surface);
        Ok(WebPortfolio {
            app: Portfolio::new(game, CrtStage::new(Stage::crt_default(), false)),
            input: InputState::new(),
            pending: Vec::new(),
            hotspots,
        })
    }

    pub fn key_down(&mut self, key: &str) {
        if let Some(key) = KeyCode::from_name(key) {
            self.push(InputEvent::KeyDown(key));
        }
    }

    pub fn key_up(&mut self, key: &str) {
        if let Some(key) = KeyCode::from_name(key) {
            self.push(InputEvent::KeyUp(key));
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.push(InputEvent::MouseMove(Vec2::new(x, y)));
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.pointer_move(x, y);
        self.push(InputEvent::MouseDown(MouseButton::LEFT));
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) {
        self.pointer_move(x, y);
        self.push(InputEvent::MouseUp(MouseButton::LEFT));
    }

    /// Document-level click, used to dismiss a fully revealed dialogue.
    pub fn click(&mut self, x: f32, y: f32) {
        self.pending.push(InputEvent::Click(Vec2::new(x, y)));
    }

    /// Wheel over the 3D canvas, in the browser's `deltaY` pixels.
    pub fn wheel(&mut self, delta_y: f32) {
        self.pending.push(InputEvent::Wheel(delta_y * WHEEL_PIXEL_STEP));
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.pending.push(InputEvent::Resize { width, height });
    }

    /// Pointer press on the 3D canvas. Returns true when it hit something.
    pub fn stage_pointer(&mut self, x: f32, y: f32, left: f32, top: f32, width: f32, height: f32) -> bool {
        let page = PageRect::new(left, top, width, height);
        self.app.pointer(Vec2::new(x, y), &page).is_some()
    }

    /// Activates hotspot `index` (0 play/pause, 1 switch, 2 screen). Returns
    /// true when the host should switch games.
    pub fn activate_hotspot(&mut self, index: u32) -> bool {
        let Some(id) = hotspot_from_index(index) else {
            return false;
        };
        self.app.activate_hotspot(id) == StageOutcome::SwitchRequested
    }

    /// One animation frame. `left`..`height` is the 3D canvas's client rect.
    pub fn frame(&mut self, dt: f32, left: f32, top: f32, width: f32, height: f32) -> Result<(), JsValue> {
        let page = PageRect::new(left, top, width, height);
        let events = std::mem::take(&mut self.pending);
        self.app.frame(&self.input, &events, dt, &page);
        for event in self.app.game_mut().drain_events() {
            if let GameEvent::SceneChanged(scene) = event {
                info!("entered {scene} scene");
            }
        }
        for (id, element) in &self.hotspots {
            apply_hotspot(element, self.app.stage().hotspot(*id))?;
        }
        Ok(())
    }

    pub fn close_dialogue(&mut self) -> bool {
        self.app.game_mut().close_dialogue()
    }

    pub fn toggle_pause(&mut self) {
        self.app.game_mut().toggle_pause();
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.app.game_mut().set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.app.game().is_paused()
    }

    pub fn play_label(&self) -> String {
        self.app.stage().play_label().to_string()
    }

    pub fn player_x(&self) -> f32 {
        self.app.game().player().position.x
    }

    pub fn player_y(&self) -> f32 {
        self.app.game().player().position.y
    }

    pub fn animation(&self) -> String {
        self.app.game().player().anim().name().to_string()
    }

    pub fn flip_x(&self) -> bool {
        self.app.game().player().flip_x()
    }
}
