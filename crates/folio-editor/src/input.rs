//! Pointer and keyboard input as seen by the canvas tools.

use folio_core::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Delete,
}

/// Canvas-space input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32, modifiers: Modifiers },
    PointerMove { x: f32, y: f32, modifiers: Modifiers },
    PointerUp { x: f32, y: f32, modifiers: Modifiers },
    KeyDown { key: Key, modifiers: Modifiers },
}

impl InputEvent {
    pub fn down(x: f32, y: f32) -> Self {
        InputEvent::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        InputEvent::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn up(x: f32, y: f32) -> Self {
        InputEvent::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: Key) -> Self {
        InputEvent::KeyDown {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Pointer position, for pointer events.
    pub fn position(&self) -> Option<Point> {
        match *self {
            InputEvent::PointerDown { x, y, .. }
            | InputEvent::PointerMove { x, y, .. }
            | InputEvent::PointerUp { x, y, .. } => Some(Point::new(x, y)),
            InputEvent::KeyDown { .. } => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match *self {
            InputEvent::PointerDown { modifiers, .. }
            | InputEvent::PointerMove { modifiers, .. }
            | InputEvent::PointerUp { modifiers, .. }
            | InputEvent::KeyDown { modifiers, .. } => modifiers,
        }
    }
}
