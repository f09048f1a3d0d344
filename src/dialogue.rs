//! Typewriter dialogue presenter.
//!
//! The presenter owns one [`TextSurface`] and reveals a session's text one
//! character per timer tick. A session can always be closed through its
//! close control; outside clicks and the Enter key only close it once the
//! whole text is visible.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::collision::Rect;

/// Dialogue text keyed by collider name. Markup is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueTable(HashMap<String, String>);

impl DialogueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid dialogue JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read dialogue table {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.0.insert(name.into(), text.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DialogueTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, text)| (name.into(), text.into()))
                .collect(),
        )
    }
}

/// Rendering target for dialogue text.
pub trait TextSurface {
    /// Makes the region visible with `text` as its content.
    fn show(&mut self, text: &str);
    fn append_glyph(&mut self, glyph: char);
    /// Empties and hides the region.
    fn clear(&mut self);
    /// Whether a page position falls inside the text box.
    fn contains(&self, point: Vec2) -> bool;
}

/// In-memory surface used by headless runs and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferSurface {
    pub visible: bool,
    pub text: String,
    /// Page-space box; outside clicks are measured against it.
    pub region: Option<Rect>,
}

impl BufferSurface {
    pub fn with_region(region: Rect) -> Self {
        Self {
            region: Some(region),
            ..Self::default()
        }
    }
}

impl TextSurface for BufferSurface {
    fn show(&mut self, text: &str) {
        self.visible = true;
        self.text.clear();
        self.text.push_str(text);
    }

    fn append_glyph(&mut self, glyph: char) {
        self.text.push(glyph);
    }

    fn clear(&mut self) {
        self.visible = false;
        self.text.clear();
    }

    fn contains(&self, point: Vec2) -> bool {
        self.region.map_or(false, |region| region.contains(point))
    }
}

/// Ways a user can ask to close the open dialogue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DismissChannel {
    CloseControl,
    OutsideClick(Vec2),
    EnterKey,
}

/// Fixed-interval timer fed with elapsed wall time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTimer {
    interval: Duration,
    pending: Duration,
    running: bool,
}

impl RevealTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_micros(1)),
            pending: Duration::ZERO,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.pending = Duration::ZERO;
        self.running = true;
    }

    pub fn cancel(&mut self) {
        self.pending = Duration::ZERO;
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of whole intervals that elapsed, zero when cancelled.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.running {
            return 0;
        }
        self.pending += elapsed;
        let ticks = self.pending.as_nanos() / self.interval.as_nanos();
        let Ok(ticks) = u32::try_from(ticks) else {
            self.pending = Duration::ZERO;
            return u32::MAX;
        };
        self.pending -= self.interval * ticks;
        ticks
    }
}

struct DialogueSession {
    text: String,
    /// Byte offset of the next unrevealed character.
    cursor: usize,
    on_end: Option<Box<dyn FnOnce()>>,
}

impl DialogueSession {
    fn is_complete(&self) -> bool {
        self.cursor >= self.text.len()
    }
}

pub struct DialoguePresenter<S: TextSurface> {
    surface: S,
    timer: RevealTimer,
    session: Option<DialogueSession>,
}

impl<S: TextSurface> DialoguePresenter<S> {
    pub fn new(surface: S, interval: Duration) -> Self {
        Self {
            surface,
            timer: RevealTimer::new(interval),
            session: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Opens a session. `on_end` runs exactly once, whichever way the
    /// session closes. Only one session exists at a time; callers are
    /// expected to hold the player lock while one is open.
    pub fn open(&mut self, text: impl Into<String>, on_end: impl FnOnce() + 'static) {
        if self.session.is_some() {
            warn!("dialogue opened while another session was active; closing it first");
            self.close();
        }
        let text = text.into();
        debug!("dialogue opened ({} chars)", text.chars().count());
        self.surface.show("");
        if text.is_empty() {
            self.timer.cancel();
        } else {
            self.timer.start();
        }
        self.session = Some(DialogueSession {
            text,
            cursor: 0,
            on_end: Some(Box::new(on_end)),
        });
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// True once every character of the open session is visible.
    pub fn is_complete(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, DialogueSession::is_complete)
    }

    /// Text revealed so far.
    pub fn revealed(&self) -> &str {
        self.session
            .as_ref()
            .map_or("", |session| &session.text[..session.cursor])
    }

    pub fn is_revealing(&self) -> bool {
        self.timer.is_running()
    }

    /// One timer tick: reveals the next character. Returns false when there
    /// was nothing left to reveal.
    pub fn tick(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            self.timer.cancel();
            return false;
        };
        let Some(glyph) = session.text[session.cursor..].chars().next() else {
            self.timer.cancel();
            return false;
        };
        session.cursor += glyph.len_utf8();
        self.surface.append_glyph(glyph);
        if session.is_complete() {
            self.timer.cancel();
        }
        true
    }

    /// Feeds elapsed time to the reveal timer and runs the ticks it owes.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let ticks = self.timer.advance(elapsed);
        let mut revealed = 0;
        for _ in 0..ticks {
            if !self.tick() {
                break;
            }
            revealed += 1;
        }
        revealed
    }

    /// Routes a dismissal request. Returns true when it closed the session.
    pub fn request_dismiss(&mut self, channel: DismissChannel) -> bool {
        if !self.is_open() {
            return false;
        }
        match channel {
            DismissChannel::CloseControl => self.close(),
            DismissChannel::EnterKey if self.is_complete() => self.close(),
            DismissChannel::OutsideClick(point)
                if self.is_complete() && !self.surface.contains(point) =>
            {
                self.close()
            }
            _ => false,
        }
    }

    /// Closes the open session: stops the reveal, clears the surface and
    /// runs the completion callback.
    pub fn close(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        self.timer.cancel();
        self.surface.clear();
        if let Some(on_end) = session.on_end.take() {
            on_end();
        }
        debug!("dialogue closed");
        true
    }
}
