use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::controls::ControlAction;
use crate::model_slot::Axis;

/// Keys the viewer reacts to, independent of the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Character(char),
    Up,
    Down,
    Escape,
}

/// Maps a key press to the control it triggers.
pub fn key_binding(key: Key) -> Option<ControlAction> {
    let action = match key {
        Key::Character('X') => ControlAction::Rotate(Axis::X),
        Key::Character('Y') => ControlAction::Rotate(Axis::Y),
        Key::Character('Z') => ControlAction::Rotate(Axis::Z),
        Key::Character('R') => ControlAction::ResetModel,
        Key::Character('B') => ControlAction::ToggleBackground,
        Key::Character('K') => ControlAction::ToggleBackdrop,
        Key::Up => ControlAction::NudgeLight(1),
        Key::Down => ControlAction::NudgeLight(-1),
        _ => return None,
    };
    Some(action)
}

/// Pointer buttons that drive the orbit camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Camera motion produced by a pointer move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerDrag {
    Orbit(Vec2),
    Pan(Vec2),
}

/// Tracks held pointer buttons and the last cursor position.
#[derive(Debug, Default)]
pub struct PointerState {
    buttons: HashSet<PointerButton>,
    position: Option<Vec2>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: PointerButton) {
        self.buttons.insert(button);
    }

    pub fn release(&mut self, button: PointerButton) {
        self.buttons.remove(&button);
    }

    pub fn is_pressed(&self, button: PointerButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Records a cursor move and returns the drag it represents, if any.
    /// The primary button orbits; secondary or middle pans.
    pub fn moved(&mut self, position: Vec2) -> Option<PointerDrag> {
        let previous = self.position.replace(position)?;
        let delta = position - previous;
        if delta == Vec2::ZERO {
            return None;
        }
        if self.is_pressed(PointerButton::Primary) {
            Some(PointerDrag::Orbit(delta))
        } else if self.is_pressed(PointerButton::Secondary)
            || self.is_pressed(PointerButton::Middle)
        {
            Some(PointerDrag::Pan(delta))
        } else {
            None
        }
    }

    /// Forgets the cursor, e.g. when it leaves the window.
    pub fn leave(&mut self) {
        self.position = None;
        self.buttons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_model_controls() {
        assert_eq!(
            key_binding(Key::Character('Y')),
            Some(ControlAction::Rotate(Axis::Y))
        );
        assert_eq!(
            key_binding(Key::Character('R')),
            Some(ControlAction::ResetModel)
        );
        assert_eq!(key_binding(Key::Down), Some(ControlAction::NudgeLight(-1)));
        assert_eq!(key_binding(Key::Character('Q')), None);
    }

    #[test]
    fn drags_follow_held_buttons() {
        let mut pointer = PointerState::new();
        assert_eq!(pointer.moved(Vec2::new(10.0, 10.0)), None);
        assert_eq!(pointer.moved(Vec2::new(12.0, 10.0)), None);

        pointer.press(PointerButton::Primary);
        assert_eq!(
            pointer.moved(Vec2::new(15.0, 14.0)),
            Some(PointerDrag::Orbit(Vec2::new(3.0, 4.0)))
        );
        pointer.release(PointerButton::Primary);
        pointer.press(PointerButton::Secondary);
        assert_eq!(
            pointer.moved(Vec2::new(15.0, 10.0)),
            Some(PointerDrag::Pan(Vec2::new(0.0, -4.0)))
        );

        pointer.leave();
        assert_eq!(pointer.position(), None);
        assert!(!pointer.is_pressed(PointerButton::Secondary));
    }
}
