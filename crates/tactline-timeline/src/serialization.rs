//! Arrangement documents.
//!
//! A document is pretty-printed JSON wrapping the container fragment
//! produced by [`TrackContainer::save_state`]. There is no schema
//! version; documents are read as they are.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactline_core::{Result, TactlineError};

use crate::container::{ContainerState, TrackContainer};

/// An arrangement as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementFile {
    pub name: String,
    pub arrangement: ContainerState,
    /// Application version that wrote this file.
    #[serde(default)]
    pub app_version: String,
}

impl ArrangementFile {
    pub fn new(name: impl Into<String>, arrangement: ContainerState) -> Self {
        Self {
            name: name.into(),
            arrangement,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Capture the current state of a container.
    pub fn capture(name: impl Into<String>, container: &TrackContainer) -> Self {
        Self::new(name, container.save_state())
    }

    /// Replace the contents of `container` with this arrangement.
    pub fn apply(&self, container: &mut TrackContainer) {
        container.restore_state(&self.arrangement);
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            TactlineError::Serialization(format!("Failed to serialize arrangement: {}", e))
        })
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TactlineError::Serialization(format!("Invalid JSON: {}", e)))?;

        if raw.get("arrangement").is_none() {
            return Err(TactlineError::InvalidDocument(
                "missing \"arrangement\" section".to_string(),
            ));
        }

        serde_json::from_value(raw).map_err(|e| {
            TactlineError::InvalidDocument(format!("Failed to parse arrangement: {}", e))
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| TactlineError::io(e, path))?;
        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockContent;
    use crate::track::TrackType;
    use tactline_core::Ticks;

    fn arrangement() -> TrackContainer {
        let mut container = TrackContainer::default();
        let beats = container.create_track(TrackType::BeatBassline);
        container.create_block(beats, Ticks::ZERO);
        let automation = container.create_track(TrackType::Automation);
        let curve = container.create_block(automation, Ticks::TACT).unwrap();
        container.update_block_content(curve, |content| {
            if let BlockContent::Automation(curve) = content {
                curve.target = "volume".to_string();
            }
        });
        container.set_track_muted(automation, true);
        container
    }

    #[test]
    fn test_arrangement_roundtrip() {
        let source = arrangement();
        let file = ArrangementFile::capture("Demo", &source);

        let json = file.to_json().unwrap();
        let loaded = ArrangementFile::from_json(&json).unwrap();
        assert_eq!(loaded, file);

        let mut target = TrackContainer::default();
        loaded.apply(&mut target);
        assert_eq!(target.save_state(), source.save_state());
    }

    #[test]
    fn test_document_shape() {
        let file = ArrangementFile::capture("Demo", &arrangement());
        let value: serde_json::Value = serde_json::from_slice(&file.to_json().unwrap()).unwrap();

        let tracks = value["arrangement"]["tracks"].as_array().unwrap();
        assert_eq!(tracks[0]["type"], 1);
        assert_eq!(tracks[0]["node"], "bbtrack");
        assert_eq!(tracks[1]["type"], 5);
        assert_eq!(tracks[1]["muted"], true);
        assert_eq!(tracks[1]["blocks"][0]["pos"], 192);
        assert_eq!(tracks[1]["blocks"][0]["node"], "automation");
    }

    #[test]
    fn test_missing_arrangement_rejected() {
        let data = br#"{"name": "x"}"#;
        assert!(matches!(
            ArrangementFile::from_json(data),
            Err(TactlineError::InvalidDocument(_))
        ));
        assert!(matches!(
            ArrangementFile::from_json(b"not json"),
            Err(TactlineError::Serialization(_))
        ));
    }

    #[test]
    fn test_file_io() {
        let path = std::env::temp_dir().join(format!("tactline-{}.json", uuid::Uuid::new_v4()));
        let file = ArrangementFile::capture("Disk", &arrangement());

        file.save_to_file(&path).unwrap();
        let loaded = ArrangementFile::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.name, "Disk");
        assert_eq!(loaded.arrangement.tracks.len(), 2);

        assert!(matches!(
            ArrangementFile::load_from_file(&path),
            Err(TactlineError::NotFound(_))
        ));
    }
}
