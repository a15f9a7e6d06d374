use itertools::Itertools;

/// A scored sub-region of an event: context confidence plus the barcode
/// called for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub score: f64,
    pub label: String,
}

impl Chunk {
    pub fn new(score: f64, label: impl Into<String>) -> Self {
        Chunk {
            score,
            label: label.into(),
        }
    }
}

/// Posterior label mass accumulated over a whole event, in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelVector {
    entries: Vec<(String, f64)>,
}

impl LabelVector {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        LabelVector { entries }
    }

    pub fn add(&mut self, label: &str, mass: f64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, m)) => *m += mass,
            None => self.entries.push((label.to_string(), mass)),
        }
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, m)| m).sum()
    }

    /// Label with the largest mass; the earliest entry wins ties.
    pub fn argmax(&self) -> Option<(&str, f64)> {
        self.entries
            .iter()
            .fold(None, |best: Option<&(String, f64)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
            .map(|(l, m)| (l.as_str(), *m))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Excluded,
    SingleRead,
    MultiRead,
}

impl Regime {
    pub fn from_count(retained: usize) -> Self {
        match retained {
            0 => Regime::Excluded,
            1 => Regime::SingleRead,
            _ => Regime::MultiRead,
        }
    }
}

/// An event after model scoring: ground truth plus its chunks in original order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvent {
    pub id: String,
    pub barcode: String,
    pub chunks: Vec<Chunk>,
    pub label_vector: Option<LabelVector>,
}

impl ScoredEvent {
    /// Chunks with `score >= cutoff`, original order preserved.
    pub fn retained(&self, cutoff: f64) -> Vec<&Chunk> {
        self.chunks.iter().filter(|c| c.score >= cutoff).collect_vec()
    }

    pub fn regime(&self, cutoff: f64) -> Regime {
        Regime::from_count(self.chunks.iter().filter(|c| c.score >= cutoff).count())
    }
}

/// The ground-truth barcode is the part of an event identifier before the
/// first `-`, ignoring any `@` read suffix.
pub fn barcode_from_id(id: &str) -> &str {
    let id = id.split('@').next().unwrap_or(id);
    id.split('-').next().unwrap_or(id)
}
