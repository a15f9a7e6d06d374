mod chunking;
mod forward_backward;
pub mod model;

pub use chunking::{chunk_score, chunk_vector, partition_event, ChunkSpan};
pub use forward_backward::Posterior;
pub use model::{Hmm, HmmState, ModelSpec, Region};

use crate::eval::{Chunk, Event, EventModel, ScoredEvent};
use crate::utils::Result;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Model configurations shipped as JSON files in the model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Simple,
    Substep,
}

impl ModelKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelKind::Simple => "simple.json",
            ModelKind::Substep => "substep.json",
        }
    }

    pub fn path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(self.file_name())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(ModelKind::Simple),
            "substep" => Ok(ModelKind::Substep),
            _ => Err(format!("Invalid model kind: {}", s)),
        }
    }
}

impl EventModel for Hmm {
    fn train(&mut self, sequences: &[Vec<f64>]) -> Result<()> {
        self.baum_welch(sequences)
    }

    fn score_event(&self, event: &Event) -> Result<ScoredEvent> {
        let posterior = self.forward_backward(&event.means())?;
        let chunks = partition_event(self, &posterior)
            .iter()
            .filter_map(|span| {
                let vector = chunk_vector(self, &posterior, span.label.clone());
                let (label, _) = vector.argmax()?;
                Some(Chunk::new(chunk_score(self, &posterior, span), label))
            })
            .collect();

        Ok(ScoredEvent {
            id: event.id.clone(),
            barcode: event.barcode.clone(),
            chunks,
            label_vector: Some(chunk_vector(self, &posterior, 0..posterior.len())),
        })
    }
}
