use super::chunks::{Regime, ScoredEvent};
use crate::consensus::{best_chunk, independent_consensus};
use crate::utils::math::fraction_true;
use itertools::Itertools;
use rayon::prelude::*;

pub struct SweepParams {
    pub steps: usize,
    pub window: usize,
}

/// Accuracy of each regime at one cutoff; `None` when no event fell into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub cutoff: f64,
    pub single: Option<f64>,
    pub multi_independent: Option<f64>,
    pub multi_best: Option<f64>,
    pub num_single: usize,
    pub num_multi: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSeries {
    pub points: Vec<SweepPoint>,
}

impl SweepSeries {
    pub fn cutoffs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.cutoff).collect_vec()
    }

    pub fn single(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.single).collect_vec()
    }

    pub fn multi_independent(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.multi_independent).collect_vec()
    }

    pub fn multi_best(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.multi_best).collect_vec()
    }
}

/// Descending cutoff grid `(steps-1)/steps, ..., 1/steps, 0`.
pub fn sweep_cutoffs(steps: usize) -> Vec<f64> {
    let resolution = 1.0 / steps as f64;
    (0..steps)
        .rev()
        .map(|i| i as f64 * resolution)
        .collect_vec()
}

pub fn evaluate_cutoff(events: &[ScoredEvent], cutoff: f64) -> SweepPoint {
    let mut single = Vec::new();
    let mut multi_independent = Vec::new();
    let mut multi_best = Vec::new();

    for event in events {
        let kept = event.retained(cutoff);
        match Regime::from_count(kept.len()) {
            Regime::Excluded => {}
            Regime::SingleRead => {
                single.push(best_chunk(&kept).is_some_and(|c| c.label == event.barcode));
            }
            Regime::MultiRead => {
                multi_independent.push(
                    independent_consensus(&kept, cutoff)
                        .is_some_and(|(label, _)| label == event.barcode),
                );
                multi_best.push(best_chunk(&kept).is_some_and(|c| c.label == event.barcode));
            }
        }
    }

    SweepPoint {
        cutoff,
        single: fraction_true(&single),
        multi_independent: fraction_true(&multi_independent),
        multi_best: fraction_true(&multi_best),
        num_single: single.len(),
        num_multi: multi_best.len(),
    }
}

/// Evaluate every cutoff; cutoffs are independent so they run in parallel on
/// the current rayon pool, output order follows `cutoffs`.
pub fn run_sweep(events: &[ScoredEvent], cutoffs: &[f64]) -> SweepSeries {
    let points = cutoffs
        .par_iter()
        .map(|&cutoff| {
            let point = evaluate_cutoff(events, cutoff);
            log::trace!(
                "Cutoff {:.3}: single={} multi={}",
                cutoff,
                point.num_single,
                point.num_multi
            );
            point
        })
        .collect::<Vec<_>>();
    SweepSeries { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Chunk;

    fn event(barcode: &str, chunks: &[(f64, &str)]) -> ScoredEvent {
        ScoredEvent {
            id: format!("{}-test", barcode),
            barcode: barcode.to_string(),
            chunks: chunks.iter().map(|(s, l)| Chunk::new(*s, *l)).collect(),
            label_vector: None,
        }
    }

    #[test]
    fn test_sweep_cutoffs_grid() {
        let cutoffs = sweep_cutoffs(1000);
        assert_eq!(cutoffs.len(), 1000);
        assert_eq!(cutoffs[0], 999.0 * 0.001);
        assert_eq!(cutoffs[999], 0.0);
        assert!(cutoffs.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_three_events_three_cutoffs() {
        let events = vec![
            // best chunk right; the A/B vote ties and goes to the first-seen A
            event("A", &[(0.9, "A"), (0.5, "B")]),
            // single wrong chunk
            event("B", &[(0.7, "A")]),
            // majority right, best wrong
            event("C", &[(0.6, "C"), (0.4, "C"), (0.95, "D")]),
        ];
        let series = run_sweep(&events, &[0.8, 0.5, 0.3]);

        assert_eq!(series.cutoffs(), vec![0.8, 0.5, 0.3]);
        // 0.8: A single (correct), C single with D (wrong)
        // 0.5: B single (wrong); A multi [A,B]; C multi [C,D]
        // 0.3: B single (wrong); A multi [A,B]; C multi [C,C,D]
        assert_eq!(series.single(), vec![Some(0.5), Some(0.0), Some(0.0)]);
        assert_eq!(series.multi_independent(), vec![None, Some(1.0), Some(1.0)]);
        assert_eq!(series.multi_best(), vec![None, Some(0.5), Some(0.5)]);
        assert_eq!(series.points[1].num_single, 1);
        assert_eq!(series.points[1].num_multi, 2);
    }

    #[test]
    fn test_no_data_is_not_zero() {
        let events = vec![event("A", &[(0.2, "A")])];
        let point = evaluate_cutoff(&events, 0.5);
        assert_eq!(point.single, None);
        assert_eq!(point.multi_best, None);
        assert_ne!(point.single, Some(0.0));

        let point = evaluate_cutoff(&[event("A", &[(0.9, "B")])], 0.5);
        assert_eq!(point.single, Some(0.0));
    }

    #[test]
    fn test_event_without_chunks_never_counts() {
        let events = vec![event("A", &[])];
        let series = run_sweep(&events, &sweep_cutoffs(10));
        assert!(series.points.iter().all(|p| p.num_single + p.num_multi == 0));
    }
}
