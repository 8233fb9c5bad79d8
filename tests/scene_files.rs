//! Integration tests for scene files and settings on disk.

use std::sync::Arc;

use tempfile::{tempdir, NamedTempFile};

use usd_collections::collection::{CollectionApi, CollectionData, ConflictPolicy, ExpansionRule};
use usd_collections::core::{SceneDescription, SceneHierarchy, Stage};
use usd_collections::host::{CollectionContext, MemoryReporter, Settings};
use usd_collections::{Error, ScenePath};

const SCENE: &str = r#"{
  "layers": [
    { "name": "session", "opinions": {
        "/World.collection:shadows:excludes": "block"
    } },
    { "name": "root", "opinions": {
        "/World.collection:lights:includes": { "value": { "path_list": ["/World/Rig"] } },
        "/World.collection:lights:excludes": { "value": { "path_list": ["/World/Rig/Fill"] } },
        "/World.collection:shadows:membershipExpression": { "value": { "expression": "//Key" } },
        "/World.collection:shadows:excludes": { "value": { "path_list": ["/World/Rig/Key"] } }
    } }
  ],
  "prims": [
    { "path": "/World" },
    { "path": "/World/Rig" },
    { "path": "/World/Rig/Key" },
    { "path": "/World/Rig/Fill" },
    { "path": "/World/Rig/Rim", "active": false }
  ]
}"#;

fn p(s: &str) -> ScenePath {
    ScenePath::parse(s).expect("valid path")
}

fn load() -> Arc<Stage> {
    let desc = SceneDescription::from_json(SCENE).expect("parse scene");
    Stage::from_description(&desc).expect("build stage")
}

#[test]
fn test_load_scene_and_resolve() {
    let stage = load();
    assert_eq!(stage.layer_names(), vec!["session", "root"]);
    assert_eq!(
        CollectionApi::collection_names(&stage, &p("/World")),
        vec!["lights", "shadows"]
    );
    assert_eq!(stage.traverse().len(), 4, "inactive Rim is pruned");
    assert_eq!(stage.traverse_all().len(), 5);

    let world = stage.get_prim(&p("/World")).expect("world prim");
    let lights = CollectionData::new(CollectionContext::default(), &world, "lights");
    assert_eq!(
        lights.compute_membership(),
        vec![p("/World/Rig"), p("/World/Rig/Key")]
    );
    assert_eq!(lights.expansion_rule(), ExpansionRule::ExpandPrims);

    // The session block hides the root layer's exclude, so the collection
    // has an expression and no rules.
    let shadows = CollectionData::new(CollectionContext::default(), &world, "shadows");
    assert!(!shadows.has_data_conflict());
    assert_eq!(shadows.compute_membership(), vec![p("/World/Rig/Key")]);
}

#[test]
fn test_scene_roundtrip_through_file() {
    let stage = load();
    let api = CollectionApi::new(&stage, &p("/World"), "lights").expect("api");
    api.set_expansion_rule(ExpansionRule::ExplicitOnly).expect("author");

    let file = NamedTempFile::new().expect("Failed to create temp file");
    stage.export(file.path()).expect("export");
    let reopened = Stage::open(file.path()).expect("reopen");

    assert_eq!(reopened.to_description(), stage.to_description());
    let api = CollectionApi::new(&reopened, &p("/World"), "lights").expect("api");
    assert_eq!(api.expansion_rule(), ExpansionRule::ExplicitOnly);
    assert!(!reopened.is_active(&p("/World/Rig/Rim")));
}

#[test]
fn test_open_missing_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    match Stage::open(dir.path().join("missing.json")) {
        Err(Error::FileNotFound(path)) => assert!(path.ends_with("missing.json")),
        other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_opinion_on_undescribed_prim_is_rejected() {
    let json = r#"{
      "layers": [ { "name": "root", "opinions": {
          "/Ghost.collection:c:includeRoot": { "value": { "bool": true } }
      } } ],
      "prims": [ { "path": "/World" } ]
    }"#;
    let desc = SceneDescription::from_json(json).expect("parse scene");
    assert!(matches!(
        Stage::from_description(&desc),
        Err(Error::PrimNotFound(_))
    ));
}

#[test]
fn test_settings_file_drives_policy() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("settings.json");
    let settings = Settings {
        conflict_policy: ConflictPolicy::RulesWin,
        print_member_limit: Some(1),
        ..Default::default()
    };
    settings.save_to(&path).expect("save settings");
    let loaded = Settings::load_from(&path).expect("load settings");
    assert_eq!(loaded, settings);

    let stage = load();
    let world = stage.get_prim(&p("/World")).expect("world prim");
    let reporter = Arc::new(MemoryReporter::new());
    let data = CollectionData::new(
        CollectionContext::new(loaded, reporter.clone()),
        &world,
        "shadows",
    );
    data.exclude_data().set_strings(&["/World/Rig/Fill"]);
    assert!(data.has_data_conflict());
    // Rules win: excludes alone select nothing.
    assert!(data.compute_membership().is_empty());

    data.print_collection();
    let messages: Vec<String> = reporter.take().into_iter().map(|(_, m)| m).collect();
    assert_eq!(
        messages,
        vec![
            "0 prims included in collection shadows on /World:".to_string(),
            ConflictPolicy::RulesWin.conflict_message().to_string(),
        ]
    );
}
