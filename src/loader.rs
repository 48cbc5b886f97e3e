//! Loading of binary glTF models.
//!
//! A load is described by a [`LoadRequest`] and resolves to a
//! [`LoadOutcome`]. Natively the work happens on a worker thread; in the
//! browser it runs as a local future. Either way the outcome is handed to a
//! [`LoadSink`], which the viewer implements by posting an event back to
//! its event loop.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Aabb, MeshBuilder, MeshData};
use crate::scene::{NodeKind, SceneNode, Transform};

/// Where model bytes come from.
#[derive(Debug, Clone)]
pub enum LoadSource {
    /// A file path natively, or a URL relative to the page in the browser.
    Location(String),
    /// Bytes already resident in memory, such as a picked file.
    Buffer { name: String, bytes: Arc<[u8]> },
}

impl LoadSource {
    pub fn buffer(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Buffer {
            name: name.into(),
            bytes: Arc::from(bytes.into_boxed_slice()),
        }
    }

    /// Human readable name used in logs and model info.
    pub fn label(&self) -> &str {
        match self {
            Self::Location(location) => location,
            Self::Buffer { name, .. } => name,
        }
    }
}

/// Why a model was requested. Controls the initial yaw of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Startup,
    Upload,
}

/// Monotonic identifier of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One-shot request handed to the loader.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub origin: LoadOrigin,
    pub source: LoadSource,
}

/// Result of a finished request.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub origin: LoadOrigin,
    pub result: Result<LoadedModel, LoadError>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read {location}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to fetch {location}: {message}")]
    Fetch { location: String, message: String },
    #[error("{label} is not a valid glTF binary")]
    Decode {
        label: String,
        #[source]
        source: gltf::Error,
    },
    #[error("{label} does not contain any triangles")]
    NoGeometry { label: String },
}

/// Summary of the loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub label: String,
    pub byte_len: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

/// Decoded model ready to be attached to the scene.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub info: ModelInfo,
    pub mesh: Arc<MeshData>,
}

impl LoadedModel {
    /// Builds the scene node for this model using `placement`.
    pub fn into_node(self, placement: &ModelPlacement, origin: LoadOrigin) -> SceneNode {
        let transform = placement.place(&self.mesh.bounds, origin);
        SceneNode::new(self.info.label, NodeKind::Model, self.mesh).with_transform(transform)
    }
}

/// Fixed offset and yaw applied to freshly loaded models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPlacement {
    pub offset: Vec3,
    pub startup_yaw: f32,
    pub upload_yaw: f32,
    /// Moves the bounding box center onto `offset`.
    pub center: bool,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 0.0, 2.0),
            startup_yaw: FRAC_PI_2,
            upload_yaw: PI,
            center: true,
        }
    }
}

impl ModelPlacement {
    pub fn yaw(&self, origin: LoadOrigin) -> f32 {
        match origin {
            LoadOrigin::Startup => self.startup_yaw,
            LoadOrigin::Upload => self.upload_yaw,
        }
    }

    pub fn place(&self, bounds: &Aabb, origin: LoadOrigin) -> Transform {
        let mut transform = Transform::from_position(self.offset)
            .with_rotation(Vec3::new(0.0, self.yaw(origin), 0.0));
        if self.center {
            transform.position -= transform.orientation() * (bounds.center() * transform.scale);
        }
        transform
    }
}

/// Keeps track of the newest request so older results can be discarded.
#[derive(Debug, Default)]
pub struct LoadTracker {
    issued: u64,
    pending: Option<LoadTicket>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier one.
    pub fn issue(&mut self) -> LoadTicket {
        self.issued += 1;
        let ticket = LoadTicket(self.issued);
        self.pending = Some(ticket);
        ticket
    }

    /// Returns `true` when `ticket` is the newest request, clearing it.
    pub fn settle(&mut self, ticket: LoadTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> Option<LoadTicket> {
        self.pending
    }
}

/// Receiver of finished loads.
pub trait LoadSink: 'static {
    fn deliver(&self, outcome: LoadOutcome);
}

impl LoadSink for std::sync::mpsc::Sender<LoadOutcome> {
    fn deliver(&self, outcome: LoadOutcome) {
        if self.send(outcome).is_err() {
            debug!("load outcome dropped: receiver closed");
        }
    }
}

/// Decodes a binary glTF into a single mesh, baking node transforms.
pub fn decode_glb(label: &str, bytes: &[u8]) -> Result<LoadedModel, LoadError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|source| LoadError::Decode {
            label: label.to_string(),
            source,
        })?;

    let mut builder = MeshBuilder::new();
    if let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        for node in scene.nodes() {
            append_node(&node, Mat4::IDENTITY, &buffers, &mut builder);
        }
    }

    if builder.is_empty() {
        return Err(LoadError::NoGeometry {
            label: label.to_string(),
        });
    }

    let mesh = builder.build();
    Ok(LoadedModel {
        info: ModelInfo {
            label: label.to_string(),
            byte_len: bytes.len(),
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
        },
        mesh: Arc::new(mesh),
    })
}

fn append_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    builder: &mut MeshBuilder,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "skipping {:?} primitive in mesh {}",
                    primitive.mode(),
                    mesh.name().unwrap_or("<unnamed>")
                );
                continue;
            }
            let reader = primitive.reader(|buffer| {
                buffers.get(buffer.index()).map(|data| data.0.as_slice())
            });
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
            let normals: Option<Vec<Vec3>> = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from_array).collect());
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            if indices.iter().any(|&index| index as usize >= positions.len()) {
                warn!("skipping primitive with out of range indices");
                continue;
            }
            let [r, g, b, _] = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();
            builder.append(
                transform,
                &positions,
                normals.as_deref(),
                Vec3::new(r, g, b),
                &indices,
            );
        }
    }
    for child in node.children() {
        append_node(&child, transform, buffers, builder);
    }
}

/// Loads a model on the calling thread.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_blocking(source: &LoadSource) -> Result<LoadedModel, LoadError> {
    match source {
        LoadSource::Location(location) => {
            let bytes = std::fs::read(location).map_err(|source| LoadError::Io {
                location: location.clone(),
                source,
            })?;
            decode_glb(location, &bytes)
        }
        LoadSource::Buffer { name, bytes } => decode_glb(name, bytes),
    }
}

/// Runs `request` on a worker thread and hands the outcome to `sink`.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_load<S>(request: LoadRequest, sink: S) -> std::io::Result<()>
where
    S: LoadSink + Send,
{
    let LoadRequest {
        ticket,
        origin,
        source,
    } = request;
    std::thread::Builder::new()
        .name(format!("model-load-{}", ticket.0))
        .spawn(move || {
            debug!("loading {} ({ticket})", source.label());
            let result = load_blocking(&source);
            sink.deliver(LoadOutcome {
                ticket,
                origin,
                result,
            });
        })
        .map(|_| ())
}

/// Fetches and decodes `request` as a browser future.
#[cfg(target_arch = "wasm32")]
pub fn spawn_load<S>(request: LoadRequest, sink: S) -> std::io::Result<()>
where
    S: LoadSink,
{
    let LoadRequest {
        ticket,
        origin,
        source,
    } = request;
    wasm_bindgen_futures::spawn_local(async move {
        debug!("loading {} ({ticket})", source.label());
        let result = match &source {
            LoadSource::Location(location) => match fetch_bytes(location).await {
                Ok(bytes) => decode_glb(location, &bytes),
                Err(err) => Err(err),
            },
            LoadSource::Buffer { name, bytes } => decode_glb(name, bytes),
        };
        sink.deliver(LoadOutcome {
            ticket,
            origin,
            result,
        });
    });
    Ok(())
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(location: &str) -> Result<Vec<u8>, LoadError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_error = |message: String| LoadError::Fetch {
        location: location.to_string(),
        message,
    };
    let window = web_sys::window().ok_or_else(|| fetch_error("window not available".into()))?;
    let response = JsFuture::from(window.fetch_with_str(location))
        .await
        .map_err(|err| fetch_error(format!("{err:?}")))?
        .dyn_into::<web_sys::Response>()
        .map_err(|_| fetch_error("unexpected fetch result".into()))?;
    if !response.ok() {
        return Err(fetch_error(format!("HTTP {}", response.status())));
    }
    let buffer = response
        .array_buffer()
        .map_err(|err| fetch_error(format!("{err:?}")))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|err| fetch_error(format!("{err:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Builds a GLB holding one triangle with corners at the origin, +X
    /// and +Y, translated by `offset` through the node transform.
    pub fn triangle_glb(offset: [f32; 3]) -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
        let json = format!(
            concat!(
                r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"#,
                r#""nodes":[{{"mesh":0,"translation":[{},{},{}]}}],"#,
                r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],"#,
                r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"#,
                r#""type":"VEC3","min":[0,0,0],"max":[1,1,0]}}],"#,
                r#""bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}}],"#,
                r#""buffers":[{{"byteLength":36}}]}}"#
            ),
            offset[0], offset[1], offset[2]
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::triangle_glb;
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn decodes_triangle_and_bakes_node_transform() {
        let model = decode_glb("tri.glb", &triangle_glb([0.0, 0.0, 3.0])).unwrap();
        assert_eq!(model.info.vertex_count, 3);
        assert_eq!(model.info.triangle_count, 1);
        assert_eq!(model.mesh.indices, vec![0, 1, 2]);
        assert_eq!(model.mesh.bounds.min, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(model.mesh.bounds.max, Vec3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn malformed_bytes_are_a_decode_error() {
        let err = decode_glb("broken.glb", b"definitely not gltf").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = LoadSource::Location("/nonexistent/model.glb".to_string());
        let err = load_blocking(&source).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn placement_centers_model_on_offset() {
        let placement = ModelPlacement::default();
        let bounds = Aabb {
            min: Vec3::new(1.0, 1.0, 1.0),
            max: Vec3::new(3.0, 3.0, 3.0),
        };
        let transform = placement.place(&bounds, LoadOrigin::Upload);
        assert_eq!(transform.rotation, Vec3::new(0.0, PI, 0.0));
        let center = transform.matrix().transform_point3(bounds.center());
        assert!((center - placement.offset).length() < 1e-5);
    }

    #[test]
    fn uncentered_placement_uses_offset_directly() {
        let placement = ModelPlacement {
            center: false,
            ..ModelPlacement::default()
        };
        let bounds = Aabb::from_points([Vec3::splat(4.0), Vec3::splat(6.0)]);
        let transform = placement.place(&bounds, LoadOrigin::Startup);
        assert_eq!(transform.position, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(transform.rotation.y, FRAC_PI_2);
    }

    #[test]
    fn tracker_only_settles_newest_ticket() {
        let mut tracker = LoadTracker::new();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(!tracker.settle(first));
        assert_eq!(tracker.pending(), Some(second));
        assert!(tracker.settle(second));
        assert!(!tracker.settle(second));
    }

    #[test]
    fn spawned_load_delivers_outcome() {
        let (sender, receiver) = mpsc::channel();
        let mut tracker = LoadTracker::new();
        let request = LoadRequest {
            ticket: tracker.issue(),
            origin: LoadOrigin::Upload,
            source: LoadSource::buffer("tri.glb", triangle_glb([0.0; 3])),
        };
        spawn_load(request.clone(), sender).unwrap();
        let outcome = receiver.recv().unwrap();
        assert_eq!(outcome.ticket, request.ticket);
        assert_eq!(outcome.result.unwrap().info.byte_len, triangle_glb([0.0; 3]).len());
    }
}
