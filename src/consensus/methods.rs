use crate::eval::{Chunk, LabelVector};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Everything a calling method may look at for one event.
#[derive(Debug, Clone, Copy)]
pub struct CallInput<'a> {
    /// Chunks retained at `cutoff`, in original order
    pub chunks: &'a [&'a Chunk],
    pub truth: &'a str,
    pub cutoff: f64,
    /// Whole-event posterior label mass, required by [`CallMethod::Hmm`]
    pub label_vector: Option<&'a LabelVector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub soft: f64,
    pub predicted: String,
    pub actual: String,
}

impl CallResult {
    fn new(soft: f64, predicted: &str, actual: &str) -> Self {
        CallResult {
            soft,
            predicted: predicted.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.predicted == self.actual
    }
}

/// Rules turning a set of scored chunks into one hard call and its soft score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallMethod {
    First,
    Last,
    Random,
    Hmm,
    Best,
    Independent,
}

impl CallMethod {
    /// Column order of the cross-validation results matrix.
    pub const ALL: [CallMethod; 6] = [
        CallMethod::First,
        CallMethod::Last,
        CallMethod::Random,
        CallMethod::Hmm,
        CallMethod::Best,
        CallMethod::Independent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CallMethod::First => "first",
            CallMethod::Last => "last",
            CallMethod::Random => "random",
            CallMethod::Hmm => "hmm",
            CallMethod::Best => "best",
            CallMethod::Independent => "independent",
        }
    }

    /// Returns `None` only when the method's precondition does not hold: an
    /// empty chunk set, no chunk at `cutoff` for the independent vote, or a
    /// missing or massless label vector for the HMM consensus.
    pub fn call<R: Rng>(&self, input: &CallInput, rng: &mut R) -> Option<CallResult> {
        let truth = input.truth;
        match self {
            CallMethod::First => first_chunk(input.chunks).map(|c| chunk_call(c, truth)),
            CallMethod::Last => last_chunk(input.chunks).map(|c| chunk_call(c, truth)),
            CallMethod::Random => random_chunk(input.chunks, rng).map(|c| chunk_call(c, truth)),
            CallMethod::Best => best_chunk(input.chunks).map(|c| chunk_call(c, truth)),
            CallMethod::Independent => independent_consensus(input.chunks, input.cutoff)
                .map(|(label, soft)| CallResult::new(soft, label, truth)),
            CallMethod::Hmm => {
                let vector = input.label_vector?;
                let (label, mass) = vector.argmax()?;
                let total = vector.total();
                if total <= 0.0 {
                    return None;
                }
                Some(CallResult::new(mass / total, label, truth))
            }
        }
    }
}

impl fmt::Display for CallMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CallMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallMethod::ALL
            .iter()
            .find(|m| m.name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown calling method: {}", s))
    }
}

fn chunk_call(chunk: &Chunk, truth: &str) -> CallResult {
    CallResult::new(chunk.score, &chunk.label, truth)
}

fn first_chunk<'a>(chunks: &[&'a Chunk]) -> Option<&'a Chunk> {
    chunks.first().copied()
}

fn last_chunk<'a>(chunks: &[&'a Chunk]) -> Option<&'a Chunk> {
    chunks.last().copied()
}

fn random_chunk<'a, R: Rng>(chunks: &[&'a Chunk], rng: &mut R) -> Option<&'a Chunk> {
    if chunks.is_empty() {
        return None;
    }
    Some(chunks[rng.random_range(0..chunks.len())])
}

/// Highest scoring chunk, earliest one on ties.
pub fn best_chunk<'a>(chunks: &[&'a Chunk]) -> Option<&'a Chunk> {
    chunks
        .iter()
        .copied()
        .reduce(|best, chunk| if chunk.score > best.score { chunk } else { best })
}

/// Majority vote over chunks at or above `cutoff`. Ties go to the label seen
/// first; the soft score is the mean score of the winning voters.
pub fn independent_consensus<'a>(chunks: &[&'a Chunk], cutoff: f64) -> Option<(&'a str, f64)> {
    // (label, votes, summed score) in first-seen order
    let mut tally: Vec<(&'a str, usize, f64)> = Vec::new();
    for chunk in chunks.iter().copied().filter(|c| c.score >= cutoff) {
        match tally.iter_mut().find(|(label, _, _)| *label == chunk.label) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += chunk.score;
            }
            None => tally.push((chunk.label.as_str(), 1, chunk.score)),
        }
    }

    tally
        .into_iter()
        .reduce(|best, entry| if entry.1 > best.1 { entry } else { best })
        .map(|(label, votes, sum)| (label, sum / votes as f64))
}
