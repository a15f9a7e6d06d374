use super::forward_backward::Posterior;
use super::model::{Hmm, Region};
use crate::eval::LabelVector;
use itertools::Itertools;
use std::ops::Range;

/// A context run on the posterior path and the label region that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub context: Range<usize>,
    pub label: Range<usize>,
}

fn argmax_path(posterior: &Posterior) -> Vec<usize> {
    posterior
        .emissions
        .iter()
        .map(|row| row.iter().position_max_by(|a, b| a.total_cmp(b)).unwrap_or(0))
        .collect_vec()
}

/// Split an event into chunks: every maximal run of context states on the
/// posterior argmax path opens a chunk whose label region extends up to the
/// next context run or the end of the event.
pub fn partition_event(hmm: &Hmm, posterior: &Posterior) -> Vec<ChunkSpan> {
    let is_context = argmax_path(posterior)
        .into_iter()
        .map(|state| *hmm.region(state) == Region::Context)
        .collect_vec();

    let mut runs = Vec::new();
    let mut pos = 0;
    while pos < is_context.len() {
        if !is_context[pos] {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < is_context.len() && is_context[pos] {
            pos += 1;
        }
        runs.push(start..pos);
    }

    let ends = runs
        .iter()
        .skip(1)
        .map(|run| run.start)
        .chain(std::iter::once(is_context.len()))
        .collect_vec();
    runs.into_iter()
        .zip(ends)
        .map(|(context, end)| ChunkSpan {
            label: context.end..end,
            context,
        })
        .collect_vec()
}

/// Mean posterior mass on context states over the chunk's context run.
pub fn chunk_score(hmm: &Hmm, posterior: &Posterior, span: &ChunkSpan) -> f64 {
    if span.context.is_empty() {
        return 0.0;
    }
    let mass: f64 = posterior.emissions[span.context.clone()]
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(state, _)| *hmm.region(*state) == Region::Context)
                .map(|(_, p)| p)
                .sum::<f64>()
        })
        .sum();
    mass / span.context.len() as f64
}

/// Posterior label mass per barcode over `positions`, in first-seen order.
pub fn chunk_vector(hmm: &Hmm, posterior: &Posterior, positions: Range<usize>) -> LabelVector {
    let mut vector = LabelVector::default();
    for row in &posterior.emissions[positions] {
        for (state, p) in row.iter().enumerate() {
            if let Region::Label(barcode) = hmm.region(state) {
                if *p > 0.0 {
                    vector.add(barcode, *p);
                }
            }
        }
    }
    vector
}
