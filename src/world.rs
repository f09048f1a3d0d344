//! The 2D exploration game: active scene, player, dialogue and pause.

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec2;
use log::{debug, info};

use crate::camera::FollowCamera;
use crate::collision::ContactTracker;
use crate::config::GameConfig;
use crate::controller::MotionController;
use crate::dialogue::{DialoguePresenter, DialogueTable, DismissChannel, TextSurface};
use crate::input::{InputEvent, InputState, KeyCode, MouseButton, NamedKey};
use crate::map::{SceneId, SceneLayout, TriggerAction};
use crate::pause::{PauseControl, PauseCoordinator, SceneContext, Subscription, SubscriptionId};
use crate::player::{LockReason, Player};

/// Something observable that happened during a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    DialogueOpened(String),
    DialogueClosed,
    SceneChanged(SceneId),
    PauseChanged(bool),
}

struct Handlers {
    pointer_down: SubscriptionId,
    pointer_release: SubscriptionId,
    key_release: SubscriptionId,
    key_down: SubscriptionId,
    resize: SubscriptionId,
    camera_follow: SubscriptionId,
    collide: HashMap<String, SubscriptionId>,
}

struct ActiveScene {
    layout: SceneLayout,
    player: Player,
    camera: FollowCamera,
    context: SceneContext,
    contacts: ContactTracker,
    handlers: Handlers,
}

impl ActiveScene {
    fn enter(layout: SceneLayout, config: &GameConfig, viewport: (u32, u32), paused: bool) -> Self {
        let player = Player::new(layout.spawn, config);
        let mut camera = FollowCamera::new(viewport.0, viewport.1, config.camera_offset_y);
        camera.follow(player.position);

        let mut context = SceneContext::new(paused);
        let collide = layout
            .colliders
            .tags()
            .into_iter()
            .filter(|tag| TriggerAction::bind(tag, layout.id).is_some())
            .map(|tag| {
                let id = context.register(Subscription::Collide(tag.to_string()));
                (tag.to_string(), id)
            })
            .collect();
        let handlers = Handlers {
            camera_follow: context.register(Subscription::CameraFollow),
            resize: context.register(Subscription::Resize),
            pointer_down: context.register(Subscription::PointerDown),
            pointer_release: context.register(Subscription::PointerRelease),
            key_release: context.register(Subscription::KeyRelease),
            key_down: context.register(Subscription::KeyDown),
            collide,
        };

        Self {
            layout,
            player,
            camera,
            context,
            contacts: ContactTracker::default(),
            handlers,
        }
    }
}

pub struct Game<S: TextSurface> {
    config: GameConfig,
    main_layout: SceneLayout,
    dialogue_table: DialogueTable,
    controller: MotionController,
    presenter: DialoguePresenter<S>,
    pause: PauseCoordinator,
    scene: ActiveScene,
    viewport: (u32, u32),
    pending_scene: Option<SceneId>,
    events: Vec<GameEvent>,
}

impl<S: TextSurface> Game<S> {
    /// Starts in the main scene built from `main_layout`.
    pub fn new(
        config: GameConfig,
        main_layout: SceneLayout,
        dialogue_table: DialogueTable,
        surface: S,
    ) -> Self {
        let viewport = (config.canvas_width, config.canvas_height);
        let scene = ActiveScene::enter(main_layout.clone(), &config, viewport, false);
        info!(
            "entered {} scene with {} colliders",
            scene.layout.id,
            scene.layout.colliders.len()
        );
        Self {
            controller: MotionController::new(&config),
            presenter: DialoguePresenter::new(surface, config.reveal_interval()),
            pause: PauseCoordinator::default(),
            main_layout,
            dialogue_table,
            scene,
            viewport,
            pending_scene: None,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn scene_id(&self) -> SceneId {
        self.scene.layout.id
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.scene.layout
    }

    pub fn player(&self) -> &Player {
        &self.scene.player
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.scene.camera
    }

    pub fn context(&self) -> &SceneContext {
        &self.scene.context
    }

    pub fn presenter(&self) -> &DialoguePresenter<S> {
        &self.presenter
    }

    /// Close control of the dialogue box.
    pub fn close_dialogue(&mut self) -> bool {
        self.dismiss(DismissChannel::CloseControl)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Reveal clock; runs independently of the frame tick.
    pub fn advance_dialogue(&mut self, elapsed: Duration) -> u32 {
        self.presenter.advance(elapsed)
    }

    /// One rendered frame: discrete events, held-input polling and
    /// movement, collisions, then the camera follow. A scene switch
    /// requested during the frame takes effect at its end.
    pub fn frame(&mut self, input: &InputState, events: &[InputEvent], dt: f32) {
        for event in events {
            self.handle_event(event);
        }
        self.poll_held_input(input, dt);
        self.resolve_collisions();

        let scene = &mut self.scene;
        if scene.context.is_active(scene.handlers.camera_follow) {
            scene.camera.follow(scene.player.position);
        }

        if let Some(target) = self.pending_scene.take() {
            self.go(target);
        }
    }

    fn handle_event(&mut self, event: &InputEvent) {
        let scene = &mut self.scene;
        match *event {
            InputEvent::KeyUp(_) => {
                if scene.context.is_active(scene.handlers.key_release) {
                    self.controller.on_release(&mut scene.player);
                }
            }
            InputEvent::MouseUp(button) if button == MouseButton::LEFT => {
                if scene.context.is_active(scene.handlers.pointer_release) {
                    self.controller.on_release(&mut scene.player);
                }
            }
            InputEvent::KeyDown(KeyCode::Named(NamedKey::Enter)) => {
                self.dismiss(DismissChannel::EnterKey);
            }
            InputEvent::Click(point) => {
                self.dismiss(DismissChannel::OutsideClick(point));
            }
            InputEvent::Resize { width, height } => {
                self.viewport = (width, height);
                if scene.context.is_active(scene.handlers.resize) {
                    scene.camera.resize(width, height);
                }
            }
            _ => {}
        }
    }

    fn poll_held_input(&mut self, input: &InputState, dt: f32) {
        let scene = &mut self.scene;
        if input.is_mouse_button_down(MouseButton::LEFT)
            && scene.context.is_active(scene.handlers.pointer_down)
        {
            let target = scene.camera.screen_to_world(input.mouse_position());
            self.controller.on_pointer_held(&mut scene.player, target, dt);
        }
        if input.any_key_down() && scene.context.is_active(scene.handlers.key_down) {
            self.controller
                .on_keys_held(&mut scene.player, input.held_directions(), dt);
        }
    }

    fn resolve_collisions(&mut self) {
        let scene = &mut self.scene;
        let resolution = scene.layout.colliders.resolve(scene.player.hitbox());
        scene.player.position += resolution.correction;

        // contacts that begin while paused fire once the game resumes
        if self.pause.is_paused() {
            return;
        }
        let began = scene.contacts.update(&resolution.contacts);
        let tags: Vec<String> = began
            .into_iter()
            .filter_map(|index| scene.layout.colliders.get(index)?.tag())
            .map(str::to_string)
            .collect();
        for tag in tags {
            self.on_contact(&tag);
        }
    }

    fn on_contact(&mut self, tag: &str) {
        let scene = &self.scene;
        let Some(&handler) = scene.handlers.collide.get(tag) else {
            return;
        };
        if !scene.context.is_active(handler) {
            return;
        }
        match self.controller.on_collide(&scene.player, tag, scene.layout.id) {
            Some(TriggerAction::SwitchScene(target)) => {
                debug!("`{tag}` requested switch to {target}");
                self.pending_scene = Some(target);
            }
            Some(TriggerAction::OpenDialogue(name)) => self.open_dialogue(&name),
            None => {}
        }
    }

    fn open_dialogue(&mut self, name: &str) {
        let Some(text) = self.dialogue_table.get(name) else {
            debug!("no dialogue entry for `{name}`");
            return;
        };
        let player = &self.scene.player;
        player.lock(LockReason::Dialogue);
        let lock = player.lock_handle();
        self.presenter.open(text, move || lock.release());
        self.events.push(GameEvent::DialogueOpened(name.to_string()));
    }

    fn dismiss(&mut self, channel: DismissChannel) -> bool {
        let closed = self.presenter.request_dismiss(channel);
        if closed {
            self.events.push(GameEvent::DialogueClosed);
        }
        closed
    }

    /// Tears down the active scene and enters `target` with a fresh,
    /// unlocked player.
    pub fn go(&mut self, target: SceneId) {
        let layout = match target {
            SceneId::Main => self.main_layout.clone(),
            SceneId::Town => SceneLayout::town(&self.config),
        };
        let removed = self.scene.context.teardown();
        debug!("tore down {removed} subscriptions");
        self.presenter.close();
        self.scene = ActiveScene::enter(layout, &self.config, self.viewport, self.pause.is_paused());
        info!("entered {target} scene");
        self.events.push(GameEvent::SceneChanged(target));
    }
}

impl<S: TextSurface> PauseControl for Game<S> {
    fn set_paused(&mut self, paused: bool) {
        let scene = &mut self.scene;
        self.pause
            .apply(paused, &mut scene.context, Some(&mut scene.player));
        self.events.push(GameEvent::PauseChanged(paused));
    }

    fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Collider, ColliderSet, Rect};
    use crate::dialogue::BufferSurface;
    use crate::input::Direction;
    use crate::player::{AnimState, Facing};

    const DT: f32 = 1.0 / 60.0;

    /// Room with the player spawning at (400, 400), a `bed` above, an
    /// `exit` below, and an unnamed wall to the right.
    fn layout() -> SceneLayout {
        let colliders: ColliderSet = [
            Collider::boundary(
                Rect::new(Vec2::new(350.0, 250.0), Vec2::new(100.0, 50.0)),
                Some("bed".into()),
            ),
            Collider::boundary(
                Rect::new(Vec2::new(350.0, 500.0), Vec2::new(100.0, 50.0)),
                Some("exit".into()),
            ),
            Collider::boundary(Rect::new(Vec2::new(500.0, 0.0), Vec2::new(50.0, 900.0)), None),
            Collider::boundary(
                Rect::new(Vec2::new(100.0, 350.0), Vec2::new(50.0, 50.0)),
                Some("plant".into()),
            ),
        ]
        .into_iter()
        .collect();
        SceneLayout {
            id: SceneId::Main,
            colliders,
            spawn: Vec2::new(400.0, 400.0),
            background: "#311047",
        }
    }

    fn game() -> Game<BufferSurface> {
        let table: DialogueTable = [("bed", "Where I sleep.")].into_iter().collect();
        Game::new(GameConfig::default(), layout(), table, BufferSurface::default())
    }

    fn hold(input: &InputState, direction: Direction) -> InputEvent {
        let event = InputEvent::KeyDown(direction.arrow_key());
        input.apply(&event);
        event
    }

    fn walk_until<F>(game: &mut Game<BufferSurface>, input: &InputState, mut done: F) -> usize
    where
        F: FnMut(&Game<BufferSurface>) -> bool,
    {
        for frame in 0..600 {
            game.frame(input, &[], DT);
            if done(game) {
                return frame;
            }
        }
        panic!("condition never reached");
    }

    #[test]
    fn walking_into_named_collider_opens_dialogue_and_locks() {
        let mut game = game();
        let input = InputState::new();
        let pressed = hold(&input, Direction::Up);
        game.frame(&input, &[pressed], DT);
        walk_until(&mut game, &input, |g| g.presenter().is_open());

        assert!(game.player().is_in_dialogue());
        assert_eq!(game.player().lock_reason(), Some(LockReason::Dialogue));
        assert!(game.drain_events().contains(&GameEvent::DialogueOpened("bed".into())));

        let frozen = game.player().position;
        game.frame(&input, &[], DT);
        assert_eq!(game.player().position, frozen);

        game.advance_dialogue(Duration::from_secs(1));
        assert_eq!(game.presenter().revealed(), "Where I sleep.");
        let release = InputEvent::KeyUp(KeyCode::Named(NamedKey::Up));
        input.apply(&release);
        let enter = InputEvent::KeyDown(KeyCode::Named(NamedKey::Enter));
        game.frame(&input, &[release, enter], DT);
        assert!(!game.presenter().is_open());
        assert!(!game.player().is_in_dialogue());
        assert_eq!(game.drain_events(), vec![GameEvent::DialogueClosed]);
    }

    #[test]
    fn solid_collider_blocks_movement() {
        let mut game = game();
        let input = InputState::new();
        hold(&input, Direction::Right);
        for _ in 0..120 {
            game.frame(&input, &[], DT);
        }
        let hitbox = game.player().hitbox();
        assert!(hitbox.max.x <= 500.0 + 1e-3);
        assert!(hitbox.max.x > 495.0);
        assert_eq!(game.player().facing(), Facing::Right);
    }

    #[test]
    fn missing_dialogue_entry_is_inert() {
        let mut game = game();
        let input = InputState::new();
        hold(&input, Direction::Left);
        for _ in 0..120 {
            game.frame(&input, &[], DT);
        }
        // pressed against the plant, which has no dialogue entry
        assert!(game.player().hitbox().min.x <= 150.0 + 1e-3);
        assert!(!game.presenter().is_open());
        assert!(!game.player().is_in_dialogue());
    }

    #[test]
    fn exit_switches_scene_exactly_once() {
        let mut game = game();
        let input = InputState::new();
        hold(&input, Direction::Down);
        walk_until(&mut game, &input, |g| g.scene_id() == SceneId::Town);
        let events = game.drain_events();
        let switches = events
            .iter()
            .filter(|event| matches!(event, GameEvent::SceneChanged(_)))
            .count();
        assert_eq!(switches, 1);
        assert!(!game.player().is_in_dialogue(), "new scene starts unlocked");
        assert_eq!(game.player().position, SceneLayout::town(game.config()).spawn);
    }

    #[test]
    fn simultaneous_keys_freeze_until_one_is_released() {
        let mut game = game();
        let input = InputState::new();
        let up = hold(&input, Direction::Up);
        game.frame(&input, &[up], DT);
        assert_eq!(game.player().anim(), AnimState::WalkUp);

        let left = hold(&input, Direction::Left);
        let before = game.player().position;
        game.frame(&input, &[left], DT);
        assert_eq!(game.player().position, before);
        assert_eq!(game.player().anim(), AnimState::WalkUp);

        let release = InputEvent::KeyUp(KeyCode::Named(NamedKey::Left));
        input.apply(&release);
        game.frame(&input, &[release], DT);
        assert_eq!(game.player().facing(), Facing::Up);
        assert!(game.player().position.y < before.y);
    }

    #[test]
    fn pause_freezes_scene_handlers() {
        let mut game = game();
        let input = InputState::new();
        game.set_paused(true);
        game.set_paused(true);
        assert!(game.is_paused());
        let right = hold(&input, Direction::Right);
        let start = game.player().position;
        game.frame(&input, &[right], DT);
        assert_eq!(game.player().position, start);
        assert_eq!(game.context().len(), 9);

        game.toggle_pause();
        game.frame(&input, &[], DT);
        assert!(game.player().position.x > start.x);
        assert_eq!(
            game.drain_events(),
            vec![
                GameEvent::PauseChanged(true),
                GameEvent::PauseChanged(true),
                GameEvent::PauseChanged(false)
            ]
        );
    }

    #[test]
    fn pointer_hold_moves_toward_world_target() {
        let mut game = game();
        let input = InputState::new();
        // camera sits 100px above the player; the viewport centre maps there
        let above = Vec2::new(480.0, 270.0 - 60.0);
        input.apply(&InputEvent::MouseMove(above));
        input.apply(&InputEvent::MouseDown(MouseButton::LEFT));
        game.frame(&input, &[], DT);
        assert_eq!(game.player().facing(), Facing::Up);
        assert!(game.player().position.y < 400.0);

        input.apply(&InputEvent::MouseUp(MouseButton::LEFT));
        game.frame(&input, &[InputEvent::MouseUp(MouseButton::LEFT)], DT);
        assert_eq!(game.player().anim(), AnimState::IdleUp);
        assert_eq!(game.player().move_target(), None);
    }

    #[test]
    fn window_pointer_release_settles_into_idle() {
        let mut game = game();
        let input = InputState::new();
        let above = Vec2::new(480.0, 210.0);
        input.apply(&InputEvent::MouseMove(above));
        let replay = |game: &mut Game<BufferSurface>, pressed: bool| {
            let events = InputEvent::pointer_button(MouseButton::LEFT, pressed, above);
            for event in &events {
                input.apply(event);
            }
            game.frame(&input, &events, DT);
        };

        replay(&mut game, true);
        assert_eq!(game.player().anim(), AnimState::WalkUp);
        replay(&mut game, false);
        assert!(!input.is_mouse_button_down(MouseButton::LEFT));

        let rest = game.player().position;
        for _ in 0..30 {
            game.frame(&input, &[], DT);
        }
        assert_eq!(game.player().anim(), AnimState::IdleUp);
        assert_eq!(game.player().position, rest);
    }

    #[test]
    fn home_gate_returns_to_main_spawn() {
        let mut game = game();
        game.go(SceneId::Town);
        assert_eq!(game.drain_events(), vec![GameEvent::SceneChanged(SceneId::Town)]);

        let input = InputState::new();
        let down = hold(&input, Direction::Down);
        game.frame(&input, &[down], DT);
        walk_until(&mut game, &input, |g| g.scene_id() == SceneId::Main);

        assert_eq!(game.drain_events(), vec![GameEvent::SceneChanged(SceneId::Main)]);
        assert!(!game.player().is_in_dialogue());
        assert_eq!(game.player().position, Vec2::new(400.0, 400.0));
    }

    #[test]
    fn contact_made_while_paused_fires_on_resume() {
        let mut layout = layout();
        layout.colliders.push(Collider::trigger(
            Rect::from_center(Vec2::new(400.0, 412.0), Vec2::splat(60.0)),
            "sign",
        ));
        let table: DialogueTable = [("sign", "Welcome.")].into_iter().collect();
        let mut game = Game::new(GameConfig::default(), layout, table, BufferSurface::default());
        let input = InputState::new();

        game.set_paused(true);
        game.frame(&input, &[], DT);
        assert!(!game.presenter().is_open());

        game.set_paused(false);
        game.frame(&input, &[], DT);
        assert!(game.presenter().is_open());
        assert_eq!(game.player().lock_reason(), Some(LockReason::Dialogue));
        game.frame(&input, &[], DT);
        let opened = game
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, GameEvent::DialogueOpened(_)))
            .count();
        assert_eq!(opened, 1);
    }

    #[test]
    fn camera_follows_player_after_movement() {
        let mut game = game();
        let input = InputState::new();
        hold(&input, Direction::Up);
        game.frame(&input, &[], DT);
        let player = game.player().position;
        assert_eq!(game.camera().position, Vec2::new(player.x, player.y - 100.0));
    }
}
