use super::chunks::barcode_from_id;
use crate::utils::Result;
use itertools::Itertools;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    pub mean: f64,
    #[serde(default)]
    pub std: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A segmented signal trace as stored on disk, one JSON document per event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub barcode: String,
    pub segments: Vec<Segment>,
}

impl Event {
    pub fn from_json(path: &Path) -> Result<Self> {
        let file =
            File::open(path).map_err(|e| format!("Event file {}: {}", path.display(), e))?;
        let mut event: Event = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("Malformed event {}: {}", path.display(), e))?;

        event.id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if event.barcode.is_empty() {
            event.barcode = barcode_from_id(&event.id).to_string();
        }
        if event.segments.is_empty() {
            return Err(format!("Event {} has no segments", path.display()));
        }
        Ok(event)
    }

    pub fn means(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.mean).collect_vec()
    }
}
