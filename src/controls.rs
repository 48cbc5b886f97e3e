use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model_slot::Axis;

/// User interaction coming from a control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    Rotate(Axis),
    ResetModel,
    /// Raw value reported by the light slider's input event.
    LightInput(String),
    /// Moves the light slider by whole steps.
    NudgeLight(i32),
    ToggleBackground,
    ToggleBackdrop,
}

impl ControlAction {
    /// Parses the action names accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name {
            "rotate-x" => Self::Rotate(Axis::X),
            "rotate-y" => Self::Rotate(Axis::Y),
            "rotate-z" => Self::Rotate(Axis::Z),
            "reset" => Self::ResetModel,
            "background" => Self::ToggleBackground,
            "sky" => Self::ToggleBackdrop,
            "light-up" => Self::NudgeLight(1),
            "light-down" => Self::NudgeLight(-1),
            other => Self::LightInput(other.strip_prefix("light=")?.to_string()),
        };
        Some(action)
    }
}

/// Range slider driving the key light intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSlider {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    value: f32,
}

impl Default for LightSlider {
    fn default() -> Self {
        Self::new(0.0, 5.0, 0.1, 1.0)
    }
}

impl LightSlider {
    pub fn new(min: f32, max: f32, step: f32, value: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            step: step.abs(),
            value: value.clamp(min, max),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Applies an input event value. Unparseable input leaves the slider untouched.
    pub fn input(&mut self, raw: &str) -> Option<f32> {
        let parsed = raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())?;
        self.value = parsed.clamp(self.min, self.max);
        Some(self.value)
    }

    /// Moves the slider by `steps` increments, snapping to the step grid.
    pub fn nudge(&mut self, steps: i32) -> f32 {
        if self.step > 0.0 {
            let index = ((self.value - self.min) / self.step).round() + steps as f32;
            self.value = (self.min + index * self.step).clamp(self.min, self.max);
        }
        self.value
    }
}

/// Footer label shown under the canvas.
pub const FOOTER_TEXT: &str = "sudo-3d.vercel.app";
/// Page opened when the footer is clicked.
pub const FOOTER_URL: &str = "https://sudo-3d.vercel.app";

/// Dark or light page background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    dark: bool,
}

impl Default for Background {
    fn default() -> Self {
        Self { dark: true }
    }
}

impl Background {
    pub fn new(dark: bool) -> Self {
        Self { dark }
    }

    pub fn toggle(&mut self) -> bool {
        self.dark = !self.dark;
        self.dark
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn clear_color(&self) -> Vec3 {
        if self.dark {
            Vec3::ZERO
        } else {
            Vec3::ONE
        }
    }

    /// CSS color name for the page background.
    pub fn css_color(&self) -> &'static str {
        if self.dark {
            "black"
        } else {
            "white"
        }
    }

    /// Footer text color contrasting with the background.
    pub fn footer_color(&self) -> &'static str {
        if self.dark {
            "white"
        } else {
            "black"
        }
    }

    /// Inline styles for the clickable footer link.
    pub fn footer_styles(&self) -> [(&'static str, &'static str); 2] {
        [("color", self.footer_color()), ("cursor", "pointer")]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no file selected")]
    NoFile,
    #[error("{name} does not end with {expected}")]
    WrongExtension { name: String, expected: String },
}

/// Checks a picked file name against the accepted extension.
pub fn validate_selection(name: Option<&str>, extension: &str) -> Result<(), SelectionError> {
    let name = name.filter(|name| !name.is_empty()).ok_or(SelectionError::NoFile)?;
    if name.ends_with(extension) {
        Ok(())
    } else {
        Err(SelectionError::WrongExtension {
            name: name.to_string(),
            expected: extension.to_string(),
        })
    }
}
