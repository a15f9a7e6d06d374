use super::chunks::ScoredEvent;
use super::event::Event;
use super::folds::{split_folds, training_indices};
use crate::consensus::{CallInput, CallMethod};
use crate::utils::{math::mean, Result};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// The sequence model seen by the harness: trainable on segment-mean
/// sequences, and able to turn one event into scored chunks.
pub trait EventModel: Clone + Send + Sync {
    fn train(&mut self, sequences: &[Vec<f64>]) -> Result<()>;
    fn score_event(&self, event: &Event) -> Result<ScoredEvent>;
}

pub struct CrossValidationParams {
    pub folds: usize,
    pub cutoffs: Vec<f64>,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MethodScore {
    pub hard: Option<f64>,
    pub soft: Option<f64>,
}

/// One row of a results matrix: one score per method in [`CallMethod::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    pub fold: usize,
    pub qualifying: usize,
    pub scores: Vec<MethodScore>,
}

impl FoldResult {
    pub fn score(&self, method: CallMethod) -> MethodScore {
        CallMethod::ALL
            .iter()
            .position(|m| *m == method)
            .and_then(|i| self.scores.get(i).copied())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsMatrix {
    pub cutoff: f64,
    pub rows: Vec<FoldResult>,
}

impl ResultsMatrix {
    pub fn header() -> Vec<String> {
        CallMethod::ALL
            .iter()
            .flat_map(|m| [format!("{}_hard", m), format!("{}_soft", m)])
            .collect_vec()
    }

    /// Folds × (2 · methods) values, hard then soft for each method.
    pub fn values(&self) -> Vec<Vec<Option<f64>>> {
        self.rows
            .iter()
            .map(|row| {
                row.scores
                    .iter()
                    .flat_map(|s| [s.hard, s.soft])
                    .collect_vec()
            })
            .collect_vec()
    }

    pub fn mean_qualifying(&self) -> f64 {
        let counts = self.rows.iter().map(|r| r.qualifying as f64).collect_vec();
        mean(&counts).unwrap_or(0.0)
    }

    /// Floored mean number of qualifying events per fold.
    pub fn sample_size(&self) -> usize {
        self.mean_qualifying().floor() as usize
    }
}

/// Score the held-out events of one fold at `cutoff`. An event qualifies when
/// at least one chunk survives the cutoff; every method is then asked for a
/// call. A method that gives no call on a qualifying event counts as wrong.
pub fn evaluate_fold<R: Rng>(
    held_out: &[ScoredEvent],
    cutoff: f64,
    fold: usize,
    rng: &mut R,
) -> FoldResult {
    let mut correct = vec![0usize; CallMethod::ALL.len()];
    let mut soft_calls = vec![Vec::new(); CallMethod::ALL.len()];
    let mut qualifying = 0;

    for event in held_out {
        let kept = event.retained(cutoff);
        if kept.is_empty() {
            continue;
        }
        qualifying += 1;

        let input = CallInput {
            chunks: &kept,
            truth: &event.barcode,
            cutoff,
            label_vector: event.label_vector.as_ref(),
        };
        for (i, method) in CallMethod::ALL.iter().enumerate() {
            if let Some(call) = method.call(&input, rng) {
                soft_calls[i].push(call.soft);
                if call.is_correct() {
                    correct[i] += 1;
                }
            }
        }
    }

    let scores = (0..CallMethod::ALL.len())
        .map(|i| MethodScore {
            hard: match qualifying {
                0 => None,
                n => Some(correct[i] as f64 / n as f64),
            },
            soft: mean(&soft_calls[i]),
        })
        .collect_vec();

    FoldResult {
        fold,
        qualifying,
        scores,
    }
}

/// Train a fresh copy of `untrained` on every fold but `held_out`, then score
/// the held-out events with it.
pub fn train_and_score<M: EventModel>(
    untrained: &M,
    events: &[Event],
    folds: &[Vec<usize>],
    held_out: usize,
) -> Result<Vec<ScoredEvent>> {
    let sequences = training_indices(folds, held_out)
        .into_iter()
        .map(|i| events[i].means())
        .collect_vec();

    log::info!(
        "Training model: withholding fold {}, training size {}",
        held_out + 1,
        sequences.len()
    );
    let mut model = untrained.clone();
    model
        .train(&sequences)
        .map_err(|e| format!("Training failed for fold {}: {}", held_out + 1, e))?;

    folds[held_out]
        .iter()
        .map(|&i| {
            model
                .score_event(&events[i])
                .map_err(|e| format!("Scoring event {} failed: {}", events[i].id, e))
        })
        .collect()
}

/// Generator for one (cutoff, fold) cell, independent of evaluation order.
pub fn cell_rng(seed: u64, cutoff_index: usize, fold: usize) -> StdRng {
    let stream = ((cutoff_index as u64) << 32) | fold as u64;
    StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// k-fold cross-validation. Each fold's model is trained once and its scored
/// held-out events are reused for every cutoff; folds train in parallel on the
/// current rayon pool. Returns one matrix per cutoff in `params.cutoffs` order.
pub fn cross_validate<M: EventModel>(
    untrained: &M,
    events: &[Event],
    params: &CrossValidationParams,
) -> Result<Vec<ResultsMatrix>> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let folds = split_folds(events.len(), params.folds, &mut rng)?;
    log::info!(
        "Split {} events into {} folds of sizes {}",
        events.len(),
        folds.len(),
        folds.iter().map(|f| f.len()).join(",")
    );

    let scored_folds = (0..folds.len())
        .into_par_iter()
        .map(|fold| train_and_score(untrained, events, &folds, fold))
        .collect::<Result<Vec<_>>>()?;

    let matrices = params
        .cutoffs
        .iter()
        .enumerate()
        .map(|(cutoff_index, &cutoff)| {
            let rows = scored_folds
                .iter()
                .enumerate()
                .map(|(fold, held_out)| {
                    let mut rng = cell_rng(params.seed, cutoff_index, fold);
                    evaluate_fold(held_out, cutoff, fold, &mut rng)
                })
                .collect_vec();
            let matrix = ResultsMatrix { cutoff, rows };
            log::info!(
                "Cutoff {}: qualifying events per fold [{}], sample size ~{:.1}",
                cutoff,
                matrix.rows.iter().map(|r| r.qualifying).join(", "),
                matrix.mean_qualifying()
            );
            matrix
        })
        .collect_vec();

    Ok(matrices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Chunk, LabelVector, Segment};
    use approx::assert_relative_eq;

    fn scored(barcode: &str, chunks: &[(f64, &str)]) -> ScoredEvent {
        let mut vector = LabelVector::default();
        for (score, label) in chunks {
            vector.add(label, *score);
        }
        ScoredEvent {
            id: format!("{}-x", barcode),
            barcode: barcode.to_string(),
            chunks: chunks.iter().map(|(s, l)| Chunk::new(*s, *l)).collect(),
            label_vector: Some(vector),
        }
    }

    /// Remembers its training size; each segment mean becomes one chunk
    /// labelled with the true barcode.
    #[derive(Clone, Default)]
    struct CountingModel {
        trained_on: usize,
        fail: bool,
    }

    impl EventModel for CountingModel {
        fn train(&mut self, sequences: &[Vec<f64>]) -> Result<()> {
            if self.fail {
                return Err("diverged".into());
            }
            self.trained_on = sequences.len();
            Ok(())
        }

        fn score_event(&self, event: &Event) -> Result<ScoredEvent> {
            if self.trained_on == 0 {
                return Err("model used before training".into());
            }
            let chunks = event
                .segments
                .iter()
                .map(|s| Chunk::new(s.mean, event.barcode.clone()))
                .collect_vec();
            Ok(ScoredEvent {
                id: event.id.clone(),
                barcode: event.barcode.clone(),
                chunks,
                label_vector: Some(LabelVector::new(vec![(event.barcode.clone(), 1.0)])),
            })
        }
    }

    fn raw_event(id: usize, score: f64) -> Event {
        Event {
            id: format!("A-{}", id),
            barcode: "A".into(),
            segments: vec![Segment {
                mean: score,
                std: None,
                duration: None,
            }],
        }
    }

    #[test]
    fn test_evaluate_fold_counts_every_method() {
        let held_out = vec![
            scored("A", &[(0.9, "A"), (0.8, "B"), (0.85, "B")]),
            scored("B", &[(0.95, "B")]),
            scored("C", &[(0.1, "C")]),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let result = evaluate_fold(&held_out, 0.5, 0, &mut rng);
        assert_eq!(result.qualifying, 2);

        let first = result.score(CallMethod::First);
        assert_relative_eq!(first.hard.unwrap(), 1.0);
        assert_relative_eq!(first.soft.unwrap(), (0.9 + 0.95) / 2.0, epsilon = 1e-12);

        let last = result.score(CallMethod::Last);
        assert_relative_eq!(last.hard.unwrap(), 0.5);

        let best = result.score(CallMethod::Best);
        assert_relative_eq!(best.hard.unwrap(), 1.0);

        // B wins the vote in the first event
        let independent = result.score(CallMethod::Independent);
        assert_relative_eq!(independent.hard.unwrap(), 0.5);
        assert_relative_eq!(
            independent.soft.unwrap(),
            (0.825 + 0.95) / 2.0,
            epsilon = 1e-12
        );

        // label mass A=0.9 vs B=1.65 in the first event
        let hmm = result.score(CallMethod::Hmm);
        assert_relative_eq!(hmm.hard.unwrap(), 0.5);

        let random = result.score(CallMethod::Random);
        assert!(random.hard.is_some());
    }

    #[test]
    fn test_empty_fold_is_no_data() {
        let held_out = vec![scored("A", &[(0.2, "A")])];
        let result = evaluate_fold(&held_out, 0.9, 4, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.qualifying, 0);
        for score in &result.scores {
            assert_eq!(score.hard, None);
            assert_ne!(score.hard, Some(0.0));
            assert_eq!(score.soft, None);
        }
    }

    #[test]
    fn test_all_wrong_fold_is_zero_not_no_data() {
        let held_out = vec![scored("A", &[(0.9, "B")])];
        let result = evaluate_fold(&held_out, 0.5, 0, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.score(CallMethod::Best).hard, Some(0.0));
    }

    #[test]
    fn test_missing_call_counts_against_qualifying() {
        let mut without_vector = scored("A", &[(0.9, "A")]);
        without_vector.label_vector = None;
        let held_out = vec![scored("A", &[(0.8, "A")]), without_vector];
        let result = evaluate_fold(&held_out, 0.5, 0, &mut StdRng::seed_from_u64(0));

        assert_eq!(result.qualifying, 2);
        let hmm = result.score(CallMethod::Hmm);
        assert_eq!(hmm.hard, Some(0.5));
        assert_relative_eq!(hmm.soft.unwrap(), 1.0);
        assert_eq!(result.score(CallMethod::Best).hard, Some(1.0));
    }

    #[test]
    fn test_results_matrix_layout() {
        let held_out = vec![scored("A", &[(0.9, "A")])];
        let row = evaluate_fold(&held_out, 0.5, 0, &mut StdRng::seed_from_u64(0));
        let matrix = ResultsMatrix {
            cutoff: 0.5,
            rows: vec![row.clone(), FoldResult { fold: 1, ..row }],
        };
        let header = ResultsMatrix::header();
        assert_eq!(header.len(), 12);
        assert_eq!(header[0], "first_hard");
        assert_eq!(header[7], "hmm_soft");
        assert_eq!(header[11], "independent_soft");

        let values = matrix.values();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|r| r.len() == 12));
        assert_eq!(values[0][0], Some(1.0));
        assert_eq!(values[0][1], Some(0.9));
        assert_eq!(matrix.sample_size(), 1);
    }

    #[test]
    fn test_sample_size_is_floored_mean() {
        let row = |q| FoldResult {
            fold: 0,
            qualifying: q,
            scores: vec![MethodScore::default(); 6],
        };
        let matrix = ResultsMatrix {
            cutoff: 0.9,
            rows: vec![row(46), row(45), row(46), row(46), row(46)],
        };
        assert_relative_eq!(matrix.mean_qualifying(), 45.8);
        assert_eq!(matrix.sample_size(), 45);
    }

    #[test]
    fn test_cross_validate_end_to_end() {
        let events = (0..10)
            .map(|i| raw_event(i, i as f64 / 10.0))
            .collect_vec();
        let params = CrossValidationParams {
            folds: 5,
            cutoffs: vec![0.9, 0.5, 0.1],
            seed: 42,
        };
        let matrices = cross_validate(&CountingModel::default(), &events, &params).unwrap();
        assert_eq!(matrices.len(), 3);
        assert_eq!(matrices[0].cutoff, 0.9);
        assert!(matrices.iter().all(|m| m.rows.len() == 5));

        let totals = matrices
            .iter()
            .map(|m| m.rows.iter().map(|r| r.qualifying).sum::<usize>())
            .collect_vec();
        // scores 0.0..0.9; 1, 5 and 9 events reach the cutoffs
        assert_eq!(totals, vec![1, 5, 9]);

        for matrix in &matrices {
            for row in &matrix.rows {
                let hard = row.score(CallMethod::Best).hard;
                match row.qualifying {
                    0 => assert_eq!(hard, None),
                    _ => assert_eq!(hard, Some(1.0)),
                }
            }
        }
    }

    #[test]
    fn test_cross_validate_is_reproducible() {
        let events = (0..20)
            .map(|i| raw_event(i, (i % 7) as f64 / 7.0))
            .collect_vec();
        let params = CrossValidationParams {
            folds: 4,
            cutoffs: vec![0.5],
            seed: 7,
        };
        let a = cross_validate(&CountingModel::default(), &events, &params).unwrap();
        let b = cross_validate(&CountingModel::default(), &events, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_failure_is_fatal() {
        let events = (0..6).map(|i| raw_event(i, 0.5)).collect_vec();
        let params = CrossValidationParams {
            folds: 3,
            cutoffs: vec![0.5],
            seed: 1,
        };
        let model = CountingModel {
            trained_on: 0,
            fail: true,
        };
        let err = cross_validate(&model, &events, &params).unwrap_err();
        assert!(err.contains("Training failed"));
    }

    #[test]
    fn test_cell_rng_streams_differ() {
        let draw = |c, f| cell_rng(42, c, f).random::<u64>();
        assert_eq!(draw(0, 0), draw(0, 0));
        assert_ne!(draw(0, 0), draw(0, 1));
        assert_ne!(draw(0, 1), draw(1, 0));
    }
}
