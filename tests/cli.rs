use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Writes a GLB holding a single triangle spanning the origin, +X and +Y.
fn write_model(dir: &Path, name: &str) -> PathBuf {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut json = concat!(
        r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"#,
        r#""nodes":[{"mesh":0}],"#,
        r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"#,
        r#""accessors":[{"bufferView":0,"componentType":5126,"count":3,"#,
        r#""type":"VEC3","min":[0,0,0],"max":[1,1,0]}],"#,
        r#""bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36}],"#,
        r#""buffers":[{"byteLength":36}]}"#
    )
    .as_bytes()
    .to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut buffer = Vec::with_capacity(total);
    buffer.extend_from_slice(b"glTF");
    buffer.extend_from_slice(&2u32.to_le_bytes());
    buffer.extend_from_slice(&(total as u32).to_le_bytes());
    buffer.extend_from_slice(&(json.len() as u32).to_le_bytes());
    buffer.extend_from_slice(b"JSON");
    buffer.extend_from_slice(&json);
    buffer.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    buffer.extend_from_slice(b"BIN\0");
    buffer.extend_from_slice(&bin);

    let path = dir.join(name);
    fs::write(&path, buffer).expect("write model");
    path
}

fn viewer() -> Command {
    let mut cmd = Command::cargo_bin("sudo3d").expect("binary exists");
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn summary_reports_startup_model_placement() {
    let dir = TempDir::new().expect("temp dir");
    let model = write_model(dir.path(), "max90.glb");
    viewer()
        .current_dir(dir.path())
        .arg(&model)
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Loaded model"))
        .stdout(contains("(3 vertices, 1 triangles"))
        .stdout(contains("rotation=(0.00, 1.57, 0.00)"))
        .stdout(contains("Light intensity: 1.0"))
        .stdout(contains("Background: black"))
        .stdout(contains("Backdrop: off"));
}

#[test]
fn selected_glb_replaces_model_and_text_file_is_ignored() {
    let dir = TempDir::new().expect("temp dir");
    let startup = write_model(dir.path(), "max90.glb");
    let upload = write_model(dir.path(), "car.glb");
    let text = dir.path().join("model.txt");
    fs::write(&text, "not a model").expect("write text");

    viewer()
        .current_dir(dir.path())
        .arg(&startup)
        .arg("--summary-only")
        .arg("--select")
        .arg(&upload)
        .arg("--select")
        .arg(&text)
        .assert()
        .success()
        .stdout(contains("Ignored file selection"))
        .stdout(contains("model.txt does not end with .glb"))
        .stdout(contains("car.glb (3 vertices"))
        .stdout(contains("position=(0.50, -0.50, 2.00) rotation=(0.00, 3.14, 0.00)"))
        .stdout(contains("Scene nodes: 1"));
}

#[test]
fn actions_rotate_reset_and_toggle() {
    let dir = TempDir::new().expect("temp dir");
    let model = write_model(dir.path(), "max90.glb");
    viewer()
        .current_dir(dir.path())
        .arg(&model)
        .args(["--summary-only", "--sky"])
        .args(["--action", "rotate-x", "--action", "rotate-x"])
        .args(["--action", "light=2.5", "--action", "background", "--action", "sky"])
        .assert()
        .success()
        .stdout(contains("rotation=(3.14, 1.57, 0.00)"))
        .stdout(contains("Light intensity: 2.5"))
        .stdout(contains("Background: white"))
        .stdout(contains("Backdrop: hidden"))
        .stdout(contains("Scene nodes: 4"));

    viewer()
        .current_dir(dir.path())
        .arg(&model)
        .args(["--summary-only", "--action", "rotate-z", "--action", "reset"])
        .assert()
        .success()
        .stdout(contains("rotation=(0.00, 1.57, 0.00)"));
}

#[test]
fn missing_model_leaves_scene_empty() {
    let dir = TempDir::new().expect("temp dir");
    viewer()
        .current_dir(dir.path())
        .arg(dir.path().join("absent.glb"))
        .args(["--summary-only", "--action", "rotate-y"])
        .assert()
        .success()
        .stdout(contains("No model loaded"))
        .stdout(contains("had no effect"))
        .stdout(contains("Loaded model").not());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().expect("temp dir");
    write_model(dir.path(), "configured.glb");
    fs::write(
        dir.path().join("sudo3d.xml"),
        "<viewer><model>configured.glb</model><background>light</background></viewer>",
    )
    .expect("write config");

    viewer()
        .current_dir(dir.path())
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Loaded model configured.glb"))
        .stdout(contains("Background: white"));
}

#[test]
fn unknown_action_is_rejected() {
    viewer()
        .args(["--summary-only", "--action", "spin"])
        .assert()
        .failure()
        .stderr(contains("unknown action spin"));
}
