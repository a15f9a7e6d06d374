mod chunks;
mod crossval;
mod event;
mod folds;
mod smoothing;
mod sweep;
mod writers;

pub use chunks::{barcode_from_id, Chunk, LabelVector, Regime, ScoredEvent};
pub use crossval::{
    cell_rng, cross_validate, evaluate_fold, train_and_score, CrossValidationParams, EventModel,
    FoldResult, MethodScore, ResultsMatrix,
};
pub use event::{Event, Segment};
pub use folds::{split_folds, training_indices};
pub use smoothing::{rolling_average, Smoothed};
pub use sweep::{evaluate_cutoff, run_sweep, sweep_cutoffs, SweepParams, SweepPoint, SweepSeries};
pub use writers::{results_suffix, write_results_matrix, SweepWriter};
