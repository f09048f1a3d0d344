use std::time::Duration;

use glam::Vec2;
use parking_lot::RwLock;

use crate::dialogue::TextSurface;
use crate::input::{InputEvent, InputState};
use crate::projector::PageRect;
use crate::stage::{CrtStage, HotspotId, StageOutcome};
use crate::world::Game;

/// Window size shared between the event loop and the frame driver.
#[derive(Debug)]
pub struct WindowViewport {
    size: RwLock<(u32, u32)>,
}

impl WindowViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width.max(1), height.max(1))),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }

    /// Full-window page rectangle for the 3D canvas.
    pub fn page_rect(&self) -> PageRect {
        let (width, height) = self.size();
        PageRect::sized(width as f32, height as f32)
    }
}

/// The 2D game and the CRT stage wrapped around it, driven one frame at a
/// time.
pub struct Portfolio<S: TextSurface> {
    game: Game<S>,
    stage: CrtStage,
    on_switch: Option<Box<dyn FnMut()>>,
}

impl<S: TextSurface> Portfolio<S> {
    pub fn new(game: Game<S>, stage: CrtStage) -> Self {
        Self {
            game,
            stage,
            on_switch: None,
        }
    }

    /// Host callback for the switch button.
    pub fn on_switch(&mut self, callback: impl FnMut() + 'static) {
        self.on_switch = Some(Box::new(callback));
    }

    pub fn game(&self) -> &Game<S> {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game<S> {
        &mut self.game
    }

    pub fn stage(&self) -> &CrtStage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut CrtStage {
        &mut self.stage
    }

    /// Runs one rendered frame. The overlay is synced last so it always
    /// matches this frame's camera.
    pub fn frame(&mut self, input: &InputState, events: &[InputEvent], dt: f32, page: &PageRect) {
        self.game
            .advance_dialogue(Duration::from_secs_f32(dt.max(0.0)));
        for event in events {
            match *event {
                InputEvent::Resize { width, height } => self.stage.resize(width, height),
                InputEvent::Wheel(delta) => self.stage.dolly(delta),
                _ => {}
            }
        }
        self.game.frame(input, events, dt);
        self.stage.sync_overlay(page);
    }

    /// Pointer press on the page: hotspots first, then a pick through the
    /// 3D scene. Returns `None` when nothing interactive was under it.
    pub fn pointer(&mut self, point: Vec2, page: &PageRect) -> Option<StageOutcome> {
        let action = match self.stage.hotspot_at(point) {
            Some(id) => id.action(),
            None => self.stage.pick(point, page)?,
        };
        let outcome = self.stage.activate(action, &mut self.game);
        self.forward(outcome);
        Some(outcome)
    }

    pub fn activate_hotspot(&mut self, id: HotspotId) -> StageOutcome {
        let outcome = self.stage.activate_hotspot(id, &mut self.game);
        self.forward(outcome);
        outcome
    }

    fn forward(&mut self, outcome: StageOutcome) {
        if outcome == StageOutcome::SwitchRequested {
            if let Some(callback) = self.on_switch.as_mut() {
                callback();
            }
        }
    }
}

/// One-line summary of the player, as printed by the harness.
pub fn player_summary<S: TextSurface>(game: &Game<S>) -> String {
    let player = game.player();
    format!(
        "scene={} pos=({:.2}, {:.2}) facing={} anim={} locked={}",
        game.scene_id(),
        player.position.x,
        player.position.y,
        player.facing(),
        player.anim().name(),
        player.is_in_dialogue()
    )
}

pub fn print_final_state<S: TextSurface>(game: &Game<S>) {
    println!("Final player state:");
    println!(" - {}", player_summary(game));
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::GameConfig;
    use crate::dialogue::{BufferSurface, DialogueTable};
    use crate::map::SceneLayout;
    use crate::pause::PauseControl;
    use crate::stage::{HotspotState, Stage};

    fn portfolio() -> Portfolio<BufferSurface> {
        let config = GameConfig::default();
        let layout = SceneLayout::town(&config);
        let game = Game::new(config, layout, DialogueTable::new(), BufferSurface::default());
        Portfolio::new(game, CrtStage::new(Stage::crt_default(), false))
    }

    #[test]
    fn viewport_never_reports_zero() {
        let viewport = WindowViewport::new(0, 0);
        assert_eq!(viewport.size(), (1, 1));
        viewport.update(1280, 720);
        assert_eq!(viewport.page_rect(), PageRect::sized(1280.0, 720.0));
    }

    #[test]
    fn frame_syncs_overlay() {
        let mut app = portfolio();
        let page = PageRect::sized(1600.0, 900.0);
        assert_eq!(app.stage().hotspot(HotspotId::PlayPause), HotspotState::Hidden);
        app.frame(&InputState::new(), &[], 1.0 / 60.0, &page);
        assert!(app.stage().hotspot(HotspotId::PlayPause).bounds().is_some());
    }

    #[test]
    fn pointer_on_play_hotspot_pauses_game() {
        let mut app = portfolio();
        let page = PageRect::sized(1600.0, 900.0);
        app.frame(&InputState::new(), &[], 1.0 / 60.0, &page);
        let bounds = app.stage().hotspot(HotspotId::PlayPause).bounds().unwrap();
        let centre = Vec2::new(
            (bounds.min_x + bounds.max_x) * 0.5,
            (bounds.min_y + bounds.max_y) * 0.5,
        );
        assert_eq!(
            app.pointer(centre, &page),
            Some(StageOutcome::Toggled { paused: true })
        );
        assert!(app.game().is_paused());
        assert_eq!(app.stage().play_label(), "PLAY");
        assert_eq!(app.pointer(Vec2::new(800.0, 5.0), &page), None);
    }

    #[test]
    fn wheel_zooms_stage_camera_within_range() {
        let mut app = portfolio();
        let page = PageRect::sized(1600.0, 900.0);
        app.frame(&InputState::new(), &[InputEvent::Wheel(100.0)], 1.0 / 60.0, &page);
        let camera = app.stage().stage().camera;
        assert!(((camera.eye - camera.target).length() - 9.0).abs() < 1e-4);
        assert!(app.stage().hotspot(HotspotId::Screen).bounds().is_some());
    }

    #[test]
    fn switch_runs_host_callback() {
        let mut app = portfolio();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        app.on_switch(move || counter.set(counter.get() + 1));
        assert_eq!(app.activate_hotspot(HotspotId::Switch), StageOutcome::SwitchRequested);
        assert_eq!(calls.get(), 1);
        assert!(!app.game().is_paused());
    }

    #[test]
    fn summary_reports_scene_and_pose() {
        let app = portfolio();
        let summary = player_summary(app.game());
        assert!(summary.starts_with("scene=town pos=(704.00, 960.00)"), "{summary}");
        assert!(summary.ends_with("facing=down anim=idle-down locked=false"));
    }
}
