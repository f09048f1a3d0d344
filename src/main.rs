use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::info;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton as WinitMouseButton, MouseScrollDelta,
    WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Window, WindowBuilder};

use crt_portfolio::app::{player_summary, print_final_state, Portfolio, WindowViewport};
use crt_portfolio::{
    BufferSurface, CrtStage, DialogueTable, Direction, Game, GameConfig, GameEvent, InputEvent,
    InputState, KeyCode, MapData, MouseButton, NamedKey, SceneLayout, Stage, TriggerAction,
};

/// Scripted walks run at a fixed 60 Hz.
const FRAME_DT: f32 = 1.0 / 60.0;

/// Stage camera travel per wheel notch and per scrolled pixel.
const WHEEL_LINE_STEP: f32 = 0.5;
const WHEEL_PIXEL_STEP: f32 = 0.01;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let map = MapData::load(&options.map)
        .with_context(|| format!("failed to load map {}", options.map))?;
    let layout = SceneLayout::from_map(&map, &config).context("failed to build main scene")?;
    let table = match &options.dialogue {
        Some(path) => DialogueTable::load(path)?,
        None => DialogueTable::new(),
    };
    let stage = match &options.stage {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("unable to read stage {path}"))?;
            Stage::from_xml(&xml).context("failed to parse stage XML")?
        }
        None => Stage::crt_default(),
    };

    print_layout(&layout);
    println!(
        "Stage with {} objects ({} interactive)",
        stage.objects.len(),
        stage.objects.iter().filter(|object| object.action.is_some()).count()
    );

    let viewport = WindowViewport::new(config.canvas_width, config.canvas_height);
    let game = Game::new(config, layout, table, BufferSurface::default());
    let mut app = Portfolio::new(game, CrtStage::new(stage, false));
    app.on_switch(|| println!("Switch game requested"));
    let input = InputState::new();

    if options.summary_only {
        run_headless(&mut app, &input, &viewport, &options.walks);
    } else {
        match run_interactive(&mut app, &input, &viewport) {
            Ok(()) => {}
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to open a window)."
                    );
                    run_headless(&mut app, &input, &viewport, &options.walks);
                } else {
                    return Err(err);
                }
            }
        }
    }

    print_final_state(app.game());
    Ok(())
}

fn print_layout(layout: &SceneLayout) {
    let triggers: Vec<(&str, TriggerAction)> = layout
        .colliders
        .tags()
        .into_iter()
        .filter_map(|tag| TriggerAction::bind(tag, layout.id).map(|action| (tag, action)))
        .collect();
    println!(
        "Loaded map with {} colliders ({} triggers)",
        layout.colliders.len(),
        triggers.len()
    );
    for (tag, action) in &triggers {
        match action {
            TriggerAction::OpenDialogue(_) => println!(" - {tag} (dialogue)"),
            TriggerAction::SwitchScene(target) => println!(" - {tag} (to {target})"),
        }
    }
    println!("Spawn at ({:.2}, {:.2})", layout.spawn.x, layout.spawn.y);
}

fn report_events(app: &mut Portfolio<BufferSurface>) {
    for event in app.game_mut().drain_events() {
        match event {
            GameEvent::DialogueOpened(name) => println!("Dialogue opened: {name}"),
            GameEvent::DialogueClosed => println!("Dialogue closed"),
            GameEvent::SceneChanged(scene) => println!("Entered {scene} scene"),
            GameEvent::PauseChanged(true) => println!("Paused"),
            GameEvent::PauseChanged(false) => println!("Resumed"),
        }
    }
}

fn run_headless(
    app: &mut Portfolio<BufferSurface>,
    input: &InputState,
    viewport: &WindowViewport,
    walks: &[WalkStep],
) {
    let page = viewport.page_rect();
    app.frame(input, &[], 0.0, &page);
    report_events(app);

    for step in walks {
        println!("Walking {} for {} frames", step.direction, step.frames);
        let key = step.direction.arrow_key();
        let press = InputEvent::KeyDown(key);
        input.apply(&press);
        let mut pending = vec![press];
        for _ in 0..step.frames {
            app.frame(input, &pending, FRAME_DT, &page);
            pending.clear();
            report_events(app);
        }
        let release = InputEvent::KeyUp(key);
        input.apply(&release);
        app.frame(input, &[release], FRAME_DT, &page);
        report_events(app);

        if app.game().presenter().is_open() {
            // finish the reveal, show it, then dismiss the way a reader would
            app.game_mut().advance_dialogue(Duration::from_secs(60));
            println!("Dialogue text: {}", app.game().presenter().revealed());
            let enter = InputEvent::KeyDown(KeyCode::Named(NamedKey::Enter));
            app.frame(input, &[enter], FRAME_DT, &page);
            report_events(app);
        }
    }
}

fn run_interactive(
    app: &mut Portfolio<BufferSurface>,
    input: &InputState,
    viewport: &WindowViewport,
) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let (width, height) = viewport.size();
    let window = WindowBuilder::new()
        .with_title("CRT Portfolio")
        .with_inner_size(LogicalSize::new(width as f64, height as f64))
        .build(&event_loop)
        .map_err(|err| WindowInitError::from_error("window", err))?;
    let size = window.inner_size();
    viewport.update(size.width, size.height);

    let mut state = WindowState {
        window,
        pending: vec![InputEvent::Resize {
            width: size.width,
            height: size.height,
        }],
        last_frame: Instant::now(),
        title: String::new(),
    };

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        state.process_event(app, input, viewport, &event, control_flow);
    });
    info!("window closed");
    Ok(())
}

struct WindowState {
    window: Window,
    pending: Vec<InputEvent>,
    last_frame: Instant,
    title: String,
}

impl WindowState {
    fn process_event(
        &mut self,
        app: &mut Portfolio<BufferSurface>,
        input: &InputState,
        viewport: &WindowViewport,
        event: &Event<()>,
        control_flow: &mut ControlFlow,
    ) {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        viewport.update(size.width, size.height);
                        self.pending.push(InputEvent::Resize {
                            width: size.width,
                            height: size.height,
                        });
                    }
                    WindowEvent::KeyboardInput { input: key, .. } => {
                        self.handle_keyboard(input, key);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.handle_mouse_button(app, input, viewport, *state, *button);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let amount = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_STEP,
                            MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32) * WHEEL_PIXEL_STEP,
                        };
                        self.pending.push(InputEvent::Wheel(amount));
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        input.set_mouse_position(pos);
                    }
                    _ => {}
                }
            }
            Event::MainEventsCleared => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                app.frame(input, &self.pending, dt, &viewport.page_rect());
                self.pending.clear();
                report_events(app);
                self.refresh_title(app);
            }
            _ => {}
        }
    }

    fn handle_keyboard(&mut self, input: &InputState, key: &KeyboardInput) {
        let Some(keycode) = key.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        let event = match key.state {
            ElementState::Pressed => InputEvent::KeyDown(keycode),
            ElementState::Released => InputEvent::KeyUp(keycode),
        };
        input.apply(&event);
        self.pending.push(event);
    }

    fn handle_mouse_button(
        &mut self,
        app: &mut Portfolio<BufferSurface>,
        input: &InputState,
        viewport: &WindowViewport,
        state: ElementState,
        button: WinitMouseButton,
    ) {
        let index = match button {
            WinitMouseButton::Left => 0,
            WinitMouseButton::Right => 1,
            WinitMouseButton::Middle => 2,
            WinitMouseButton::Other(value) => value,
        } as u8;
        let button = MouseButton::new(index);
        let position = input.mouse_position();
        let pressed = state == ElementState::Pressed;
        if pressed && button == MouseButton::LEFT {
            app.pointer(position, &viewport.page_rect());
        }
        for event in InputEvent::pointer_button(button, pressed, position) {
            input.apply(&event);
            self.pending.push(event);
        }
    }

    fn refresh_title(&mut self, app: &Portfolio<BufferSurface>) {
        let title = format!(
            "CRT Portfolio | {} | [{}]",
            player_summary(app.game()),
            app.stage().play_label()
        );
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Return => KeyCode::Named(NamedKey::Enter),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Left => KeyCode::Named(NamedKey::Left),
        Key::Right => KeyCode::Named(NamedKey::Right),
        Key::Up => KeyCode::Named(NamedKey::Up),
        Key::Down => KeyCode::Named(NamedKey::Down),
        Key::W => KeyCode::Character('W'),
        Key::A => KeyCode::Character('A'),
        Key::S => KeyCode::Character('S'),
        Key::D => KeyCode::Character('D'),
        _ => return None,
    })
}

struct WalkStep {
    direction: Direction,
    frames: u32,
}

impl WalkStep {
    fn parse(value: &str) -> Result<Self> {
        let (direction, frames) = value
            .split_once(':')
            .ok_or_else(|| anyhow!("--walk expects DIR:FRAMES, got `{value}`"))?;
        let direction = Direction::from_name(direction)
            .ok_or_else(|| anyhow!("unknown walk direction `{direction}`"))?;
        let frames = frames
            .parse::<u32>()
            .with_context(|| format!("invalid frame count in `{value}`"))?;
        Ok(Self { direction, frames })
    }
}

struct CliOptions {
    map: String,
    dialogue: Option<String>,
    config: Option<String>,
    stage: Option<String>,
    walks: Vec<WalkStep>,
    summary_only: bool,
}

const USAGE: &str = "Usage: crt-portfolio <map.json> [--dialogue FILE] [--config FILE] [--stage FILE] [--walk DIR:FRAMES]... [--summary-only]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(map) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            map,
            dialogue: None,
            config: None,
            stage: None,
            walks: Vec::new(),
            summary_only: false,
        };
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| anyhow!("{arg} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--dialogue" => options.dialogue = Some(value()?),
                "--config" => options.config = Some(value()?),
                "--stage" => options.stage = Some(value()?),
                "--walk" => options.walks.push(WalkStep::parse(&value()?)?),
                "--summary-only" => options.summary_only = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}
