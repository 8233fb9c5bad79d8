//! JSON scene description files.
//!
//! ```json
//! {
//!   "layers": [
//!     { "name": "session", "opinions": { "/World.collection:lights:includes": "block" } },
//!     { "name": "root", "opinions": {
//!         "/World.collection:lights:includes": { "value": { "path_list": ["/World/Key"] } }
//!     } }
//!   ],
//!   "prims": [ { "path": "/World/Key" }, { "path": "/World/Fill", "active": false } ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Layer, LayerStack, SceneHierarchy, Stage};
use crate::util::{Error, Result, ScenePath};

fn default_true() -> bool {
    true
}

/// One prim entry of a scene description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimDescription {
    pub path: ScenePath,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Serializable form of a [`Stage`]: layers strongest first, then prims.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub prims: Vec<PrimDescription>,
}

impl SceneDescription {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

impl Stage {
    /// Build a stage from a description.
    ///
    /// Every opinion must target a property of a described prim.
    pub fn from_description(desc: &SceneDescription) -> Result<Arc<Stage>> {
        let stage = Stage::with_layers(LayerStack::from_layers(desc.layers.clone()));
        for prim in &desc.prims {
            stage.define_prim(&prim.path)?;
            if !prim.active {
                stage.set_active(&prim.path, false)?;
            }
        }
        for layer in &desc.layers {
            for (path, _) in layer.iter() {
                if !path.is_property_path() {
                    return Err(Error::invalid_path(
                        path.as_str(),
                        format!("layer '{}' holds an opinion on a non-property path", layer.name),
                    ));
                }
                if !stage.is_valid_path(&path.prim_path()) {
                    return Err(Error::PrimNotFound(path.prim_part().to_string()));
                }
            }
        }
        debug!(
            prims = desc.prims.len(),
            layers = desc.layers.len(),
            "stage built from description"
        );
        Ok(stage)
    }

    /// Snapshot the stage as a description.
    pub fn to_description(&self) -> SceneDescription {
        SceneDescription {
            layers: self.layers_snapshot(),
            prims: self
                .prims_snapshot()
                .into_iter()
                .map(|(path, active)| PrimDescription { path, active })
                .collect(),
        }
    }

    /// Open a JSON scene description file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Stage>> {
        let desc = SceneDescription::load(path)?;
        Self::from_description(&desc)
    }

    /// Write the stage to a JSON scene description file.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_description().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Opinion, Value};

    const SCENE: &str = r#"{
        "layers": [
            { "name": "session", "opinions": {
                "/World.collection:lights:includes": "block"
            } },
            { "name": "root", "opinions": {
                "/World.collection:lights:includes": { "value": { "path_list": ["/World/Key"] } },
                "/World.collection:lights:includeRoot": { "value": { "bool": false } }
            } }
        ],
        "prims": [
            { "path": "/World/Key" },
            { "path": "/World/Fill", "active": false }
        ]
    }"#;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    #[test]
    fn test_load_description() {
        let desc = SceneDescription::from_json(SCENE).unwrap();
        let stage = Stage::from_description(&desc).unwrap();
        assert_eq!(stage.layer_names(), vec!["session", "root"]);
        assert!(!stage.is_active(&p("/World/Fill")));
        assert_eq!(stage.get(&p("/World.collection:lights:includes")), None);
        assert_eq!(
            stage.authored_opinion(1, &p("/World.collection:lights:includes")),
            Some(Opinion::Value(Value::PathList(vec![p("/World/Key")])))
        );
    }

    #[test]
    fn test_description_roundtrip() {
        let desc = SceneDescription::from_json(SCENE).unwrap();
        let stage = Stage::from_description(&desc).unwrap();
        let again = stage.to_description();
        let json = again.to_json_pretty().unwrap();
        let reparsed = SceneDescription::from_json(&json).unwrap();
        assert_eq!(reparsed, again);
        assert_eq!(again.prims.len(), 3);
        assert_eq!(again.layers, desc.layers);
    }

    #[test]
    fn test_opinion_on_missing_prim_rejected() {
        let text = r#"{ "layers": [ { "name": "root", "opinions": {
            "/Ghost.x": { "value": { "bool": true } } } } ], "prims": [] }"#;
        let desc = SceneDescription::from_json(text).unwrap();
        assert!(matches!(
            Stage::from_description(&desc),
            Err(Error::PrimNotFound(_))
        ));
    }

    #[test]
    fn test_bad_path_in_file_is_json_error() {
        let text = r#"{ "prims": [ { "path": "relative/path" } ] }"#;
        assert!(matches!(SceneDescription::from_json(text), Err(Error::Json(_))));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scene.json");
        let desc = SceneDescription::from_json(SCENE).unwrap();
        desc.save(&file).unwrap();
        let stage = Stage::open(&file).unwrap();
        assert!(stage.has_prim(&p("/World/Key")));
        assert!(matches!(
            Stage::open(dir.path().join("missing.json")),
            Err(Error::FileNotFound(_))
        ));
    }
}
