//! Smoke tests for the usdcoll binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

use usd_collections::host::Settings;

const SCENE: &str = r#"{
  "layers": [
    { "name": "root", "opinions": {
        "/World.collection:lights:includes": { "value": { "path_list": ["/World/Rig"] } },
        "/World.collection:lights:excludes": { "value": { "path_list": ["/World/Rig/Fill"] } },
        "/World.collection:shadows:membershipExpression": { "value": { "expression": "/World &" } }
    } }
  ],
  "prims": [
    { "path": "/World" },
    { "path": "/World/Rig" },
    { "path": "/World/Rig/Key" },
    { "path": "/World/Rig/Fill" }
  ]
}"#;

struct Fixture {
    _dir: TempDir,
    scene: PathBuf,
    settings: PathBuf,
}

fn fixture(scene: &str) -> Fixture {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene_path = dir.path().join("shot.json");
    std::fs::write(&scene_path, scene).expect("write scene");
    let settings = dir.path().join("settings.json");
    Settings::default().save_to(&settings).expect("save settings");
    Fixture {
        _dir: dir,
        scene: scene_path,
        settings,
    }
}

fn usdcoll(settings: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_usdcoll"))
        .arg("-q")
        .arg("--settings")
        .arg(settings)
        .args(args)
        .output()
        .expect("run usdcoll")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_check_fails_on_bad_expression() {
    let fx = fixture(SCENE);
    let scene = fx.scene.to_str().expect("utf-8 path");
    let output = usdcoll(&fx.settings, &["check", scene]);

    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("/World.collection:shadows:"), "{}", text);
    assert!(text.contains("1 invalid expression(s), 0 conflict(s)"), "{}", text);
}

#[test]
fn test_check_passes_on_valid_scene() {
    let fx = fixture(&SCENE.replace("/World &", "//Key"));
    let scene = fx.scene.to_str().expect("utf-8 path");
    let output = usdcoll(&fx.settings, &["check", scene]);

    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("0 invalid expression(s), 0 conflict(s)"));
}

#[test]
fn test_print_with_filter() {
    let fx = fixture(SCENE);
    let scene = fx.scene.to_str().expect("utf-8 path");
    let output = usdcoll(
        &fx.settings,
        &["print", scene, "/World", "lights", "--filter", "KEY"],
    );

    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["/World/Rig/Key"]);
}

#[test]
fn test_tree_and_list() {
    let fx = fixture(SCENE);
    let scene = fx.scene.to_str().expect("utf-8 path");

    let tree = usdcoll(&fx.settings, &["tree", scene]);
    assert!(tree.status.success());
    let text = stdout(&tree);
    assert!(text.contains("[collection:lights]"), "{}", text);
    assert!(text.contains("[collection:shadows]"), "{}", text);

    let list = usdcoll(&fx.settings, &["list", scene]);
    assert!(list.status.success());
    let text = stdout(&list);
    assert!(text.contains("/World.collection:lights"), "{}", text);
    assert!(text.contains("rule-based"), "{}", text);
}

#[test]
fn test_missing_scene_argument() {
    let fx = fixture(SCENE);
    let output = usdcoll(&fx.settings, &["check"]);
    assert!(!output.status.success());
}
