use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::backdrop::SkyGradient;
use crate::camera::OrbitSettings;
use crate::controls::LightSlider;
use crate::loader::ModelPlacement;

/// Viewer settings. Every field has a default; an XML file may override any
/// subset of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub default_model: String,
    pub accepted_extension: String,
    pub placement: ModelPlacement,
    pub light: LightConfig,
    pub camera: OrbitSettings,
    pub sky: SkyGradient,
    /// Creates the sky, sun and ground at startup.
    pub backdrop: bool,
    pub dark_background: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_model: default_model_location().to_string(),
            accepted_extension: ".glb".to_string(),
            placement: ModelPlacement::default(),
            light: LightConfig::default(),
            camera: OrbitSettings::default(),
            sky: SkyGradient::default(),
            backdrop: false,
            dark_background: true,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_model_location() -> &'static str {
    "public/max90.glb"
}

#[cfg(target_arch = "wasm32")]
fn default_model_location() -> &'static str {
    "/max90.glb"
}

/// Key light placement and slider range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 5.0, 5.0),
            color: Vec3::ONE,
            intensity: 1.0,
            min: 0.0,
            max: 5.0,
            step: 0.1,
        }
    }
}

impl LightConfig {
    pub fn slider(&self) -> LightSlider {
        LightSlider::new(self.min, self.max, self.step, self.intensity)
    }
}

impl ViewerConfig {
    /// Reads and parses a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parses a `<viewer>` document on top of the defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid config XML")?;
        let root = document.root_element();
        if !root.has_tag_name("viewer") {
            return Err(anyhow!(
                "expected <viewer> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut config = Self::default();
        if let Some(model) = optional_text(&root, "model") {
            config.default_model = model;
        }
        if let Some(extension) = optional_text(&root, "extension") {
            config.accepted_extension = extension;
        }
        config.backdrop = parse_bool(optional_text(&root, "backdrop"), config.backdrop)?;
        if let Some(background) = optional_text(&root, "background") {
            config.dark_background = match background.as_str() {
                "dark" | "black" => true,
                "light" | "white" => false,
                other => return Err(anyhow!("unknown background: {other}")),
            };
        }

        if let Some(node) = child(&root, "placement") {
            let placement = &mut config.placement;
            placement.offset = parse_vec3(optional_text(&node, "offset"), placement.offset)?;
            placement.center = parse_bool(optional_text(&node, "center"), placement.center)?;
            placement.startup_yaw =
                parse_degrees(optional_text(&node, "startup-yaw"), placement.startup_yaw)?;
            placement.upload_yaw =
                parse_degrees(optional_text(&node, "upload-yaw"), placement.upload_yaw)?;
        }

        if let Some(node) = child(&root, "light") {
            let light = &mut config.light;
            light.position = parse_vec3(optional_text(&node, "position"), light.position)?;
            light.color = parse_color(optional_text(&node, "color"), light.color)?;
            light.intensity = parse_f32(optional_text(&node, "intensity"), light.intensity)?;
            light.min = parse_f32(optional_text(&node, "min"), light.min)?;
            light.max = parse_f32(optional_text(&node, "max"), light.max)?;
            light.step = parse_f32(optional_text(&node, "step"), light.step)?;
        }

        if let Some(node) = child(&root, "camera") {
            let camera = &mut config.camera;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.target = parse_vec3(optional_text(&node, "target"), camera.target)?;
            camera.fov = parse_f32(optional_text(&node, "fov"), camera.fov)?;
            camera.near = parse_f32(optional_text(&node, "near"), camera.near)?;
            camera.far = parse_f32(optional_text(&node, "far"), camera.far)?;
            camera.damping = parse_f32(optional_text(&node, "damping"), camera.damping)?;
            camera.rotate_speed =
                parse_f32(optional_text(&node, "rotate-speed"), camera.rotate_speed)?;
            camera.zoom_speed = parse_f32(optional_text(&node, "zoom-speed"), camera.zoom_speed)?;
            camera.pan_speed = parse_f32(optional_text(&node, "pan-speed"), camera.pan_speed)?;
            camera.min_distance =
                parse_f32(optional_text(&node, "min-distance"), camera.min_distance)?;
            camera.max_distance =
                parse_f32(optional_text(&node, "max-distance"), camera.max_distance)?;
        }

        if let Some(node) = child(&root, "sky") {
            let sky = &mut config.sky;
            sky.top_color = parse_color(optional_text(&node, "top"), sky.top_color)?;
            sky.bottom_color = parse_color(optional_text(&node, "bottom"), sky.bottom_color)?;
            sky.offset = parse_f32(optional_text(&node, "offset"), sky.offset)?;
            sky.exponent = parse_f32(optional_text(&node, "exponent"), sky.exponent)?;
        }

        Ok(config)
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components(value: &str, what: &str) -> Result<Vec3> {
    let numbers = value
        .split_whitespace()
        .map(parse_number)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid {what}: {value}"))?;
    match numbers[..] {
        [x, y, z, ..] => Ok(Vec3::new(x, y, z)),
        _ => Err(anyhow!("{what} is missing components")),
    }
}

/// Parses a finite float.
fn parse_number(value: &str) -> Result<f32> {
    let number = value
        .parse::<f32>()
        .map_err(|err| anyhow!("failed to parse float: {err}"))?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(anyhow!("expected a finite number, found {value}"))
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_components(&value, "vector"),
        None => Ok(default),
    }
}

/// Colors are written as `r g b` in the 0-255 range.
fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(parse_components(&value, "color")? / 255.0),
        None => Ok(default),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => parse_number(&value),
        None => Ok(default),
    }
}

/// Angles are written in degrees and stored in radians.
fn parse_degrees(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => Ok(parse_f32(Some(value), 0.0)?.to_radians()),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true" | "yes" | "1") => Ok(true),
        Some("false" | "no" | "0") => Ok(false),
        Some(other) => Err(anyhow!("expected a boolean, found {other}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use std::io::Write;

    const SAMPLE: &str = r#"
    <viewer>
        <model>assets/car.glb</model>
        <backdrop>true</backdrop>
        <background>light</background>
        <placement>
            <offset>0 1 0</offset>
            <upload-yaw>90</upload-yaw>
        </placement>
        <light>
            <intensity>2.5</intensity>
            <color>255 128 0</color>
        </light>
        <camera>
            <fov>60</fov>
            <max-distance>50</max-distance>
        </camera>
    </viewer>
    "#;

    #[test]
    fn xml_overrides_defaults() {
        let config = ViewerConfig::from_xml(SAMPLE).unwrap();
        assert_eq!(config.default_model, "assets/car.glb");
        assert!(config.backdrop);
        assert!(!config.dark_background);
        assert_eq!(config.placement.offset, Vec3::new(0.0, 1.0, 0.0));
        assert!((config.placement.upload_yaw - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(config.light.intensity, 2.5);
        assert_eq!(config.light.color, Vec3::new(1.0, 128.0 / 255.0, 0.0));
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.max_distance, 50.0);
    }

    #[test]
    fn missing_tags_keep_defaults() {
        let config = ViewerConfig::from_xml("<viewer/>").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.accepted_extension, ".glb");
        assert_eq!(config.light.slider().value(), 1.0);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(ViewerConfig::from_xml("<scene/>").is_err());
        assert!(ViewerConfig::from_xml("<viewer><backdrop>maybe</backdrop></viewer>").is_err());
        assert!(ViewerConfig::from_xml(
            "<viewer><light><position>1 2</position></light></viewer>"
        )
        .is_err());
        assert!(ViewerConfig::from_xml(
            "<viewer><placement><offset>1 x 2 3</offset></placement></viewer>"
        )
        .is_err());
    }

    #[test]
    fn non_finite_numbers_are_errors() {
        for xml in [
            "<viewer><light><min>NaN</min></light></viewer>",
            "<viewer><light><intensity>inf</intensity></light></viewer>",
            "<viewer><camera><min-distance>inf</min-distance></camera></viewer>",
            "<viewer><camera><damping>NaN</damping></camera></viewer>",
            "<viewer><camera><position>0 NaN 5</position></camera></viewer>",
            "<viewer><placement><upload-yaw>-inf</upload-yaw></placement></viewer>",
        ] {
            assert!(ViewerConfig::from_xml(xml).is_err(), "{xml} was accepted");
        }
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<viewer><model>x.glb</model></viewer>").unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.default_model, "x.glb");
        assert!(ViewerConfig::load("/nonexistent/viewer.xml").is_err());
    }
}
